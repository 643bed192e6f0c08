//! Content addresses.
//!
//! An [`Address`] is the 20-byte content hash of a chunk (SHA-512 truncated
//! to 20 bytes). The canonical string form is 32 characters of lowercase
//! base32 over the alphabet `0123456789abcdefghijklmnopqrstuv` — 160 bits
//! pack exactly into 32 five-bit characters, so the encoding is fixed-length
//! and reversible with no padding.
//!
//! The first byte of an address doubles as a shard discriminator for
//! in-memory caches and on-disk fan-out directories.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;
use std::str::FromStr;

/// Number of bytes in an address.
pub const ADDRESS_LEN: usize = 20;

/// Number of characters in the canonical string form.
pub const ADDRESS_STR_LEN: usize = 32;

const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Set of addresses with a fast, non-cryptographic hasher.
///
/// Address bytes are already uniformly distributed, so SipHash buys nothing.
pub type AddressSet = rustc_hash::FxHashSet<Address>;

/// Map keyed by address, same hasher rationale as [`AddressSet`].
pub type AddressMapOf<V> = rustc_hash::FxHashMap<Address, V>;

/// 20-byte content address with a fixed-length base32 string form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero sentinel, used as the root of an empty store.
    pub const EMPTY: Address = Address([0u8; ADDRESS_LEN]);

    /// Hash `data` into an address (SHA-512, first 20 bytes).
    pub fn of(data: &[u8]) -> Address {
        let digest = Sha512::digest(data);
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Address(bytes)
    }

    /// Construct from raw bytes.
    pub fn new(bytes: [u8; ADDRESS_LEN]) -> Address {
        Address(bytes)
    }

    /// Construct from a byte slice, which must be exactly [`ADDRESS_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Address> {
        let arr: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| Error::corrupt(format!("address must be {ADDRESS_LEN} bytes, got {}", bytes.len())))?;
        Ok(Address(arr))
    }

    /// Parse the canonical 32-character string form.
    pub fn parse(s: &str) -> Result<Address> {
        Address::maybe_parse(s)
            .ok_or_else(|| Error::corrupt(format!("invalid address string: {s:?}")))
    }

    /// Parse, returning `None` instead of an error on malformed input.
    pub fn maybe_parse(s: &str) -> Option<Address> {
        let s = s.as_bytes();
        if s.len() != ADDRESS_STR_LEN {
            return None;
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        let mut acc: u32 = 0;
        let mut bits: u32 = 0;
        let mut out = 0;
        for &c in s {
            let v = decode_char(c)?;
            acc = (acc << 5) | v as u32;
            bits += 5;
            if bits >= 8 {
                bits -= 8;
                bytes[out] = (acc >> bits) as u8;
                out += 1;
            }
        }
        debug_assert_eq!(out, ADDRESS_LEN);
        Some(Address(bytes))
    }

    /// Raw bytes of this address.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// True iff this is the all-zero sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Address::EMPTY
    }

    /// Shard discriminator: the first byte of the address.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }
}

fn decode_char(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'v' => Some(c - b'a' + 10),
        _ => None,
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 160 bits -> 32 five-bit groups, big-endian
        let mut acc: u32 = 0;
        let mut bits: u32 = 0;
        for &b in &self.0 {
            acc = (acc << 8) | b as u32;
            bits += 8;
            while bits >= 5 {
                bits -= 5;
                let idx = ((acc >> bits) & 0x1f) as usize;
                write!(f, "{}", ALPHABET[idx] as char)?;
            }
        }
        debug_assert_eq!(bits, 0);
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Address> {
        Address::parse(s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> String {
        a.to_string()
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(s: String) -> Result<Address> {
        Address::parse(&s)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_form_round_trips() {
        let a = Address::of(b"hello prolly");
        let s = a.to_string();
        assert_eq!(s.len(), ADDRESS_STR_LEN);
        assert_eq!(Address::parse(&s).unwrap(), a);
        assert_eq!(Address::maybe_parse(&s), Some(a));
    }

    #[test]
    fn empty_sentinel_is_all_zeros() {
        assert!(Address::EMPTY.is_empty());
        assert_eq!(Address::EMPTY.to_string(), "0".repeat(ADDRESS_STR_LEN));
        assert!(!Address::of(b"x").is_empty());
    }

    #[test]
    fn maybe_parse_rejects_malformed() {
        assert_eq!(Address::maybe_parse(""), None);
        assert_eq!(Address::maybe_parse("zzzz"), None);
        // 'w' is outside the alphabet
        let bad = "w".repeat(ADDRESS_STR_LEN);
        assert_eq!(Address::maybe_parse(&bad), None);
        // wrong length
        let short = "0".repeat(ADDRESS_STR_LEN - 1);
        assert_eq!(Address::maybe_parse(&short), None);
    }

    #[test]
    fn parse_surfaces_error() {
        let err = Address::parse("not-an-address").unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }

    #[test]
    fn distinct_content_distinct_address() {
        assert_ne!(Address::of(b"a"), Address::of(b"b"));
        assert_eq!(Address::of(b"a"), Address::of(b"a"));
    }

    #[test]
    fn serde_uses_string_form() {
        let a = Address::of(b"roundtrip");
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{a}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
