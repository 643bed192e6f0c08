//! Chunk store traits and the in-memory implementation.
//!
//! A [`ChunkStore`] is write-once, read-many storage of content-addressed
//! chunks plus a single mutable cell: the root address. The root advances
//! only through [`ChunkStore::commit`], an optimistic compare-and-swap, so
//! concurrent writers serialize on it and retry on conflict.
//!
//! Implementations must be safe for concurrent readers and a concurrent
//! single writer. `put` is idempotent — storing the same chunk twice is a
//! no-op.

use crate::chunk::Chunk;
use crate::error::{Error, Result};
use crate::hash::{Address, AddressSet};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Write-once, read-many storage of addressed chunks with a CAS root.
#[async_trait]
pub trait ChunkStore: Debug + Send + Sync {
    /// Fetch a chunk by address. `Ok(None)` when absent.
    async fn get(&self, addr: Address) -> Result<Option<Chunk>>;

    /// True iff the store holds a chunk at `addr`.
    async fn has(&self, addr: Address) -> Result<bool> {
        Ok(self.get(addr).await?.is_some())
    }

    /// Batch presence check. Returns the subset of `addrs` NOT present.
    async fn has_many(&self, addrs: &[Address]) -> Result<AddressSet> {
        let mut absent = AddressSet::default();
        for &addr in addrs {
            if !self.has(addr).await? {
                absent.insert(addr);
            }
        }
        Ok(absent)
    }

    /// Store a chunk. Idempotent; rejects chunks whose address does not
    /// match their content.
    async fn put(&self, chunk: Chunk) -> Result<()>;

    /// Current root address ([`Address::EMPTY`] for a fresh store).
    async fn root(&self) -> Result<Address>;

    /// Advance the root from `expected` to `new`.
    ///
    /// Returns `false` when the current root is not `expected` — the caller
    /// lost a race and should re-read the root and retry.
    async fn commit(&self, new: Address, expected: Address) -> Result<bool>;

    /// Release resources. Further operations may fail.
    async fn close(&self) -> Result<()>;
}

// ============================================================================
// MemoryChunkStore
// ============================================================================

/// In-memory chunk store for tests and ephemeral databases.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<Address, Chunk>>,
    root: Mutex<Address>,
}

impl MemoryChunkStore {
    /// Create an empty store with an [`Address::EMPTY`] root.
    pub fn new() -> Arc<MemoryChunkStore> {
        Arc::new(MemoryChunkStore::default())
    }

    /// Number of chunks stored.
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    /// True iff no chunks are stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn get(&self, addr: Address) -> Result<Option<Chunk>> {
        Ok(self.chunks.read().get(&addr).cloned())
    }

    async fn has(&self, addr: Address) -> Result<bool> {
        Ok(self.chunks.read().contains_key(&addr))
    }

    async fn has_many(&self, addrs: &[Address]) -> Result<AddressSet> {
        let chunks = self.chunks.read();
        Ok(addrs
            .iter()
            .copied()
            .filter(|a| !chunks.contains_key(a))
            .collect())
    }

    async fn put(&self, chunk: Chunk) -> Result<()> {
        chunk.verify()?;
        self.chunks.write().entry(chunk.address()).or_insert(chunk);
        Ok(())
    }

    async fn root(&self) -> Result<Address> {
        Ok(*self.root.lock())
    }

    async fn commit(&self, new: Address, expected: Address) -> Result<bool> {
        if !new.is_empty() && !self.chunks.read().contains_key(&new) {
            return Err(Error::invariant(format!(
                "commit of root {new} which is not stored"
            )));
        }
        let mut root = self.root.lock();
        if *root != expected {
            return Ok(false);
        }
        *root = new;
        tracing::debug!(root = %new, "advanced memory store root");
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
