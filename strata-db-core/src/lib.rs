//! # Strata DB Core
//!
//! Content-addressed storage primitives for Strata DB:
//!
//! - [`Address`]: 20-byte content hash with a canonical base32 string form
//! - [`Chunk`]: immutable byte payload paired with its address
//! - [`ChunkStore`]: write-once storage with an optimistic CAS root
//! - [`BufferPool`]: shared arena for node serialization
//! - [`MapChunkCache`]: client-side cache with a pending-flush set
//! - [`ChunkRelations`]: disjoint sets of compression-related chunks
//!
//! ## Design Principles
//!
//! 1. **Async at the I/O seam only**: storage traits are async; everything
//!    already in memory is synchronous.
//! 2. **Immutability**: chunks never change after `put`; the only mutable
//!    cell is the store root, advanced by compare-and-swap.
//! 3. **No globals**: the buffer pool is passed into constructors so tests
//!    stay hermetic.

pub mod cache;
pub mod chunk;
pub mod error;
pub mod fs;
pub mod hash;
pub mod pool;
pub mod relations;
pub mod store;

pub use cache::MapChunkCache;
pub use chunk::Chunk;
pub use error::{Error, Result};
pub use fs::{FileChunkStore, FileStoreConfig};
pub use hash::{Address, AddressMapOf, AddressSet, ADDRESS_LEN, ADDRESS_STR_LEN};
pub use pool::BufferPool;
pub use relations::ChunkRelations;
pub use store::{ChunkStore, MemoryChunkStore};
