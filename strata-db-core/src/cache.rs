//! Client-side chunk cache for a remote chunk store.
//!
//! The remote client batches uploads: chunks land here as they are produced,
//! and the uploader periodically drains the pending set with
//! [`MapChunkCache::get_and_clear_chunks_to_flush`]. A chunk joins the
//! pending set exactly once — re-inserting a cached chunk never re-queues it.
//!
//! The cache is sharded by [`Address::first_byte`] so concurrent producers
//! rarely contend on one lock.

use crate::chunk::Chunk;
use crate::hash::{Address, AddressMapOf, AddressSet};
use parking_lot::Mutex;

const SHARD_COUNT: usize = 16;

#[derive(Debug, Default)]
struct Shard {
    chunks: AddressMapOf<Chunk>,
    to_flush: AddressMapOf<Chunk>,
}

/// In-memory chunk cache with a pending-flush set.
#[derive(Debug)]
pub struct MapChunkCache {
    shards: Vec<Mutex<Shard>>,
}

impl Default for MapChunkCache {
    fn default() -> MapChunkCache {
        MapChunkCache {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(Shard::default())).collect(),
        }
    }
}

impl MapChunkCache {
    /// Create an empty cache.
    pub fn new() -> MapChunkCache {
        MapChunkCache::default()
    }

    fn shard(&self, addr: Address) -> &Mutex<Shard> {
        &self.shards[addr.first_byte() as usize % SHARD_COUNT]
    }

    /// Insert many chunks. Newly inserted chunks are queued for flush.
    pub fn put(&self, chunks: &[Chunk]) {
        for chunk in chunks {
            self.put_chunk(chunk);
        }
    }

    /// Insert one chunk. Returns `true` iff the chunk was new, in which case
    /// it was also queued for flush.
    pub fn put_chunk(&self, chunk: &Chunk) -> bool {
        let addr = chunk.address();
        let mut shard = self.shard(addr).lock();
        if shard.chunks.contains_key(&addr) {
            return false;
        }
        shard.chunks.insert(addr, chunk.clone());
        shard.to_flush.insert(addr, chunk.clone());
        true
    }

    /// Return the subset of `addrs` present in the cache.
    pub fn get(&self, addrs: &[Address]) -> AddressMapOf<Chunk> {
        let mut found = AddressMapOf::default();
        for &addr in addrs {
            if let Some(chunk) = self.shard(addr).lock().chunks.get(&addr) {
                found.insert(addr, chunk.clone());
            }
        }
        found
    }

    /// Return the subset of `addrs` NOT present — the exact complement of
    /// what [`MapChunkCache::get`] would find.
    pub fn has(&self, addrs: &[Address]) -> AddressSet {
        addrs
            .iter()
            .copied()
            .filter(|&addr| !self.shard(addr).lock().chunks.contains_key(&addr))
            .collect()
    }

    /// Drain the pending-flush set, atomically clearing it per shard.
    pub fn get_and_clear_chunks_to_flush(&self) -> AddressMapOf<Chunk> {
        let mut pending = AddressMapOf::default();
        for shard in &self.shards {
            pending.extend(std::mem::take(&mut shard.lock().to_flush));
        }
        pending
    }
}
