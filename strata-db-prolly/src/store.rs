//! Node store: parsed-node reads and writes over a [`ChunkStore`].
//!
//! Reads go through an LRU of parsed nodes so hot paths (upper tree levels)
//! rarely touch the chunk store or re-parse. Writes are write-through. The
//! store also owns the shared [`BufferPool`] handed to node builders, and the
//! binary format identifier that gates mutation of legacy trees.

use crate::format::Node;
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use strata_db_core::{Address, BufferPool, Chunk, ChunkStore, Error, Result};

/// Identifier of the node binary format a tree was written with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatId {
    /// Pre-prolly map encoding: readable stores may hold it, the prolly
    /// engine refuses to operate on it.
    Legacy,
    /// Current prolly encoding.
    Prolly,
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatId::Legacy => write!(f, "legacy"),
            FormatId::Prolly => write!(f, "prolly"),
        }
    }
}

/// Configuration for [`NodeStore`].
#[derive(Clone, Debug)]
pub struct NodeStoreConfig {
    /// Parsed-node LRU capacity, in nodes.
    pub cache_capacity: usize,
}

impl Default for NodeStoreConfig {
    fn default() -> NodeStoreConfig {
        NodeStoreConfig {
            cache_capacity: 4096,
        }
    }
}

struct Inner {
    chunks: Arc<dyn ChunkStore>,
    cache: Mutex<LruCache<Address, Node>>,
    pool: BufferPool,
    format: FormatId,
}

/// Shared handle to node storage. Cheap to clone.
#[derive(Clone)]
pub struct NodeStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeStore")
            .field("format", &self.inner.format)
            .finish_non_exhaustive()
    }
}

impl NodeStore {
    /// Create a store over `chunks` with default config and the current format.
    pub fn new(chunks: Arc<dyn ChunkStore>) -> NodeStore {
        NodeStore::with_config(chunks, NodeStoreConfig::default(), FormatId::Prolly)
    }

    /// Create a store with explicit config and format.
    pub fn with_config(
        chunks: Arc<dyn ChunkStore>,
        config: NodeStoreConfig,
        format: FormatId,
    ) -> NodeStore {
        let capacity = NonZeroUsize::new(config.cache_capacity.max(1)).unwrap();
        NodeStore {
            inner: Arc::new(Inner {
                chunks,
                cache: Mutex::new(LruCache::new(capacity)),
                pool: BufferPool::new(),
                format,
            }),
        }
    }

    /// Read and parse the node at `addr`.
    ///
    /// `Error::NotFound` when the chunk is absent; `Error::Corrupt` when the
    /// chunk bytes do not parse as a node.
    pub async fn read(&self, addr: Address) -> Result<Node> {
        if let Some(node) = self.inner.cache.lock().get(&addr) {
            return Ok(node.clone());
        }
        let chunk = self
            .inner
            .chunks
            .get(addr)
            .await?
            .ok_or_else(|| Error::not_found(format!("node {addr}")))?;
        let node = Node::parse(chunk.into_data())?;
        tracing::trace!(addr = %addr, level = node.level(), count = node.count(), "read node");
        self.inner.cache.lock().put(addr, node.clone());
        Ok(node)
    }

    /// Write a node's bytes as a chunk and cache the parsed form.
    pub async fn write(&self, node: &Node) -> Result<Address> {
        let addr = node.address();
        let chunk = Chunk::with_address(node.bytes().clone(), addr);
        self.inner.chunks.put(chunk).await?;
        self.inner.cache.lock().put(addr, node.clone());
        Ok(addr)
    }

    /// The shared buffer pool for node builders.
    pub fn pool(&self) -> &BufferPool {
        &self.inner.pool
    }

    /// The binary format this store's trees were written with.
    pub fn format(&self) -> FormatId {
        self.inner.format
    }

    /// The underlying chunk store.
    pub fn chunk_store(&self) -> &Arc<dyn ChunkStore> {
        &self.inner.chunks
    }
}
