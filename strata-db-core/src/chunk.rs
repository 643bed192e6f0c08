//! Chunks: the unit of storage, transfer, and cache.
//!
//! A [`Chunk`] pairs an opaque immutable byte payload with its content
//! address. The invariant `chunk.address == Address::of(chunk.data)` holds
//! for every chunk produced by [`Chunk::new`]; chunks received from an
//! untrusted source should be checked with [`Chunk::verify`].

use crate::error::{Error, Result};
use crate::hash::Address;
use bytes::Bytes;

/// An immutable byte payload addressed by its content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    address: Address,
    data: Bytes,
}

impl Chunk {
    /// Create a chunk, computing its address from `data`.
    pub fn new(data: impl Into<Bytes>) -> Chunk {
        let data = data.into();
        let address = Address::of(&data);
        Chunk { address, data }
    }

    /// Create a chunk with a caller-supplied address.
    ///
    /// Used on read paths where the address is already known (the store key).
    /// The caller is responsible for calling [`Chunk::verify`] if the bytes
    /// came from an untrusted medium.
    pub fn with_address(data: impl Into<Bytes>, address: Address) -> Chunk {
        Chunk {
            address,
            data: data.into(),
        }
    }

    /// The chunk's content address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The chunk's payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True iff the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Re-hash the payload and check it against the stored address.
    pub fn verify(&self) -> Result<()> {
        let actual = Address::of(&self.data);
        if actual != self.address {
            return Err(Error::corrupt(format!(
                "chunk hash mismatch: keyed {}, content hashes to {}",
                self.address, actual
            )));
        }
        Ok(())
    }

    /// Consume the chunk, returning its payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_address_matches_content() {
        let c = Chunk::new(Bytes::from_static(b"payload"));
        assert_eq!(c.address(), Address::of(b"payload"));
        c.verify().unwrap();
    }

    #[test]
    fn verify_catches_mismatch() {
        let c = Chunk::with_address(Bytes::from_static(b"payload"), Address::of(b"other"));
        assert!(matches!(c.verify(), Err(Error::Corrupt(_))));
    }

    #[test]
    fn empty_chunk() {
        let c = Chunk::new(Bytes::new());
        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
        c.verify().unwrap();
    }
}
