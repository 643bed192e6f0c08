//! Content-defined node boundaries.
//!
//! The chunker decides where one node ends and the next begins. The decision
//! is a pure function of the entry bytes, the tree level, and the amount
//! accumulated since the last boundary — never of how edits were batched —
//! which is what makes tree shape history-independent: the same entry
//! sequence always chunks the same way.
//!
//! The boundary function is part of the external format. Changing any
//! constant below changes every root hash.
//!
//! ## Criteria
//!
//! - **Level 0** sizes nodes in bytes: no boundary below [`LEAF_MIN_BYTES`],
//!   forced boundary at [`LEAF_MAX_BYTES`], otherwise a boundary when the low
//!   [`LEAF_BOUNDARY_BITS`] bits of the entry hash are all ones (~4 KiB
//!   expected nodes).
//! - **Levels ≥ 1** size nodes in entries with a rarer criterion
//!   ([`BRANCH_BOUNDARY_BITS`]), so fan-out grows toward the root.

/// Minimum serialized bytes before a leaf boundary may fire.
pub const LEAF_MIN_BYTES: usize = 1 << 10;

/// Hard ceiling on leaf bytes; a boundary always fires here.
pub const LEAF_MAX_BYTES: usize = 1 << 14;

/// A leaf boundary fires when this many low hash bits are ones.
pub const LEAF_BOUNDARY_BITS: u32 = 4;

/// Minimum entries before an internal-node boundary may fire.
pub const BRANCH_MIN_ENTRIES: usize = 4;

/// Hard ceiling on internal-node entries.
pub const BRANCH_MAX_ENTRIES: usize = 1 << 10;

/// An internal boundary fires when this many low hash bits are ones.
pub const BRANCH_BOUNDARY_BITS: u32 = 6;

/// Fixed per-entry serialization overhead charged to the byte budget.
const PAIR_OVERHEAD: usize = 4;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Weyl increment used to derive one seed per level.
const LEVEL_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

fn level_seed(level: u8) -> u64 {
    FNV_OFFSET ^ LEVEL_SALT.wrapping_mul(level as u64 + 1)
}

fn fnv1a(mut h: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Rolling boundary decision for one builder level.
#[derive(Debug)]
pub struct Chunker {
    level: u8,
    bytes_since: usize,
    entries_since: usize,
}

impl Chunker {
    /// Create a chunker for `level` with fresh (post-boundary) state.
    pub fn new(level: u8) -> Chunker {
        Chunker {
            level,
            bytes_since: 0,
            entries_since: 0,
        }
    }

    /// Observe one appended `(key, value)` pair. Returns `true` iff a node
    /// boundary falls immediately after this pair.
    pub fn observe(&mut self, key: &[u8], value: &[u8]) -> bool {
        self.bytes_since += key.len() + value.len() + PAIR_OVERHEAD;
        self.entries_since += 1;

        let (min_ok, force) = if self.level == 0 {
            (
                self.bytes_since >= LEAF_MIN_BYTES,
                self.bytes_since >= LEAF_MAX_BYTES,
            )
        } else {
            (
                self.entries_since >= BRANCH_MIN_ENTRIES,
                self.entries_since >= BRANCH_MAX_ENTRIES,
            )
        };

        if force {
            self.reset();
            return true;
        }
        if !min_ok {
            return false;
        }

        let bits = if self.level == 0 {
            LEAF_BOUNDARY_BITS
        } else {
            BRANCH_BOUNDARY_BITS
        };
        let mask = (1u64 << bits) - 1;
        let h = fnv1a(fnv1a(level_seed(self.level), key), value);
        if h & mask == mask {
            self.reset();
            return true;
        }
        false
    }

    /// Clear accumulated state, as after a forced boundary.
    pub fn reset(&mut self) {
        self.bytes_since = 0;
        self.entries_since = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(n: usize, seed: u8) -> Vec<(Vec<u8>, Vec<u8>)> {
        (0..n)
            .map(|i| {
                (
                    format!("key-{seed}-{i:08}").into_bytes(),
                    format!("value-{seed}-{i}").into_bytes(),
                )
            })
            .collect()
    }

    fn boundaries(level: u8, pairs: &[(Vec<u8>, Vec<u8>)]) -> Vec<usize> {
        let mut c = Chunker::new(level);
        pairs
            .iter()
            .enumerate()
            .filter_map(|(i, (k, v))| c.observe(k, v).then_some(i))
            .collect()
    }

    #[test]
    fn decisions_are_deterministic() {
        let ps = pairs(5_000, 1);
        assert_eq!(boundaries(0, &ps), boundaries(0, &ps));
        assert_eq!(boundaries(1, &ps), boundaries(1, &ps));
    }

    #[test]
    fn leaf_boundaries_respect_byte_bounds() {
        let ps = pairs(20_000, 2);
        let bs = boundaries(0, &ps);
        assert!(!bs.is_empty(), "no boundary in 20k entries");

        let mut acc = 0usize;
        for (i, (k, v)) in ps.iter().enumerate() {
            acc += k.len() + v.len() + PAIR_OVERHEAD;
            if bs.contains(&i) {
                assert!(acc >= LEAF_MIN_BYTES, "boundary at {i} below min size");
                assert!(acc <= LEAF_MAX_BYTES, "boundary at {i} above max size");
                acc = 0;
            }
        }
    }

    #[test]
    fn branch_boundaries_respect_entry_bounds() {
        let ps = pairs(50_000, 3);
        let bs = boundaries(1, &ps);
        assert!(!bs.is_empty());

        let mut last = None::<usize>;
        for &b in &bs {
            let run = match last {
                Some(prev) => b - prev,
                None => b + 1,
            };
            assert!(run >= BRANCH_MIN_ENTRIES);
            assert!(run <= BRANCH_MAX_ENTRIES);
            last = Some(b);
        }
    }

    #[test]
    fn levels_chunk_independently() {
        let ps = pairs(10_000, 4);
        // same stream, different level seeds: boundary sets should differ
        assert_ne!(boundaries(1, &ps), boundaries(2, &ps));
    }

    #[test]
    fn replay_of_a_prefix_fires_no_early_boundary() {
        // Seeding a builder with the prefix of an existing node must not
        // split inside the prefix: replaying the same pairs from fresh state
        // reproduces the original (boundary-free) run.
        let ps = pairs(8_000, 5);
        let bs = boundaries(0, &ps);
        let first = *bs.first().unwrap();

        let mut c = Chunker::new(0);
        for (k, v) in &ps[..first] {
            assert!(!c.observe(k, v));
        }
        assert!(c.observe(&ps[first].0, &ps[first].1));
    }
}
