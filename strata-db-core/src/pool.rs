//! Shared buffer pool for node serialization.
//!
//! Node builders serialize into scratch buffers at a high rate during a
//! flush; the pool recycles those allocations across builders and levels.
//! The pool is an explicit constructor parameter everywhere it is used —
//! there is no process-global instance, which keeps tests hermetic.

use parking_lot::Mutex;
use std::sync::Arc;

/// Default capacity reserved in a fresh buffer.
const DEFAULT_BUFFER_CAPACITY: usize = 16 * 1024;

/// Buffers larger than this are dropped instead of pooled.
const MAX_POOLED_CAPACITY: usize = 256 * 1024;

/// Maximum number of idle buffers retained.
const MAX_IDLE_BUFFERS: usize = 32;

/// A shared arena of reusable byte buffers.
///
/// Cloning is cheap; all clones share the same freelist.
#[derive(Clone, Debug, Default)]
pub struct BufferPool {
    idle: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    /// Create an empty pool.
    pub fn new() -> BufferPool {
        BufferPool::default()
    }

    /// Take a cleared buffer from the pool, allocating if none is idle.
    pub fn take(&self) -> Vec<u8> {
        match self.idle.lock().pop() {
            Some(mut buf) => {
                buf.clear();
                buf
            }
            None => Vec::with_capacity(DEFAULT_BUFFER_CAPACITY),
        }
    }

    /// Return a buffer to the pool.
    ///
    /// Oversized buffers are dropped so one huge node cannot pin memory for
    /// the life of the process; the freelist itself is bounded the same way.
    pub fn give(&self, buf: Vec<u8>) {
        if buf.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE_BUFFERS {
            idle.push(buf);
        }
    }

    /// Number of idle buffers currently pooled.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_give_recycles() {
        let pool = BufferPool::new();
        let mut buf = pool.take();
        buf.extend_from_slice(b"scratch");
        let cap = buf.capacity();
        pool.give(buf);
        assert_eq!(pool.idle_count(), 1);

        let buf = pool.take();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), cap);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn oversized_buffers_are_dropped() {
        let pool = BufferPool::new();
        pool.give(Vec::with_capacity(MAX_POOLED_CAPACITY + 1));
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn clones_share_the_freelist() {
        let pool = BufferPool::new();
        let clone = pool.clone();
        clone.give(Vec::with_capacity(64));
        assert_eq!(pool.idle_count(), 1);
    }
}
