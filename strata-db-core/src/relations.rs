//! Disjoint-set forest over chunk addresses.
//!
//! The archive build pass discovers pairs of chunks that are structurally
//! related across table versions; [`ChunkRelations`] groups them so the
//! compression dictionary trainer can treat each group as one corpus.

use crate::hash::{Address, AddressMapOf};

/// Union-find keyed by chunk address, with path halving and union by size.
#[derive(Debug, Default)]
pub struct ChunkRelations {
    parent: AddressMapOf<Address>,
    size: AddressMapOf<u32>,
}

impl ChunkRelations {
    /// Create an empty relation.
    pub fn new() -> ChunkRelations {
        ChunkRelations::default()
    }

    /// Relate `a` and `b`, merging their groups.
    pub fn add(&mut self, a: Address, b: Address) {
        self.ensure(a);
        self.ensure(b);
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[&ra] >= self.size[&rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        let merged = self.size[&ra] + self.size[&rb];
        self.parent.insert(small, big);
        self.size.insert(big, merged);
    }

    /// Total number of related addresses across all groups.
    pub fn count(&self) -> usize {
        self.parent.len()
    }

    /// True iff `a` and `b` are in the same group.
    pub fn related(&mut self, a: Address, b: Address) -> bool {
        if !self.parent.contains_key(&a) || !self.parent.contains_key(&b) {
            return false;
        }
        self.find(a) == self.find(b)
    }

    /// All groups, each sorted, ordered by their smallest member.
    ///
    /// Deterministic so the dictionary trainer sees a stable corpus order.
    pub fn groups(&mut self) -> Vec<Vec<Address>> {
        let members: Vec<Address> = self.parent.keys().copied().collect();
        let mut by_root: AddressMapOf<Vec<Address>> = AddressMapOf::default();
        for addr in members {
            let root = self.find(addr);
            by_root.entry(root).or_default().push(addr);
        }
        let mut groups: Vec<Vec<Address>> = by_root.into_values().collect();
        for group in &mut groups {
            group.sort();
        }
        groups.sort_by(|a, b| a[0].cmp(&b[0]));
        groups
    }

    fn ensure(&mut self, a: Address) {
        if !self.parent.contains_key(&a) {
            self.parent.insert(a, a);
            self.size.insert(a, 1);
        }
    }

    fn find(&mut self, mut a: Address) -> Address {
        loop {
            let p = self.parent[&a];
            if p == a {
                return a;
            }
            // path halving
            let gp = self.parent[&p];
            self.parent.insert(a, gp);
            a = gp;
        }
    }
}
