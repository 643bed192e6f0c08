//! Generic ordered tree over content-addressed prolly nodes.
//!
//! [`StaticMap`] is an immutable snapshot: a root node, a node store, and a
//! key ordering. All leaves sit at level 0 at equal depth; internal nodes
//! route by last-key-wins (child `i` owns every key ≤ `keys[i]`). Structure
//! is fully determined by the entry set (see [`crate::chunker`]), so two
//! snapshots holding the same entries share one root address.
//!
//! Mutation happens through [`Editor`](editor::Editor), which produces a new
//! snapshot and leaves the old one untouched.

pub mod cursor;
pub mod diff;
pub mod editor;

use crate::format::{Node, NodeBuilder};
use crate::store::NodeStore;
use bytes::Bytes;
use std::cmp::Ordering;
use strata_db_core::{Address, Result};

/// Total ordering over encoded keys.
pub trait KeyOrder: Clone + Send + Sync {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

/// Plain byte-wise ordering, used by [`crate::address_map::AddressMap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Lexicographic;

impl KeyOrder for Lexicographic {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

/// Smallest index whose key is ≥ `key`; `node.count()` when none is.
///
/// The compare-to-one-key predicate is monotone over a sorted node, so a
/// binary search is sound here — unlike the multi-column range predicates,
/// which are searched linearly (see [`crate::range`]).
pub(crate) fn lower_bound<O: KeyOrder>(node: &Node, key: &[u8], order: &O) -> usize {
    let mut lo = 0usize;
    let mut hi = node.count();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if order.compare(node.key(mid), key) == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Index of the entry whose key equals `key`, if present.
pub(crate) fn find_exact<O: KeyOrder>(node: &Node, key: &[u8], order: &O) -> Option<usize> {
    let i = lower_bound(node, key, order);
    if i < node.count() && order.compare(node.key(i), key) == Ordering::Equal {
        Some(i)
    } else {
        None
    }
}

/// Immutable ordered-map snapshot.
#[derive(Clone, Debug)]
pub struct StaticMap<O: KeyOrder> {
    pub(crate) root: Node,
    pub(crate) store: NodeStore,
    pub(crate) order: O,
}

impl<O: KeyOrder> StaticMap<O> {
    /// An empty tree. `addr_values` selects the leaf value encoding
    /// (20-byte addresses vs. inline bytes) and is part of the root hash.
    pub fn empty(store: NodeStore, order: O, addr_values: bool) -> Result<StaticMap<O>> {
        let root = NodeBuilder::new(0, addr_values).build(store.pool())?;
        Ok(StaticMap { root, store, order })
    }

    /// Open a snapshot at a known root address.
    pub async fn load(store: NodeStore, root: Address, order: O) -> Result<StaticMap<O>> {
        let root = store.read(root).await?;
        Ok(StaticMap { root, store, order })
    }

    /// Wrap an already-materialized root.
    pub fn new(root: Node, store: NodeStore, order: O) -> StaticMap<O> {
        StaticMap { root, store, order }
    }

    /// Number of leaf entries.
    pub fn count(&self) -> u64 {
        self.root.tree_count()
    }

    /// Tree height: 1 for a lone leaf, `root.level() + 1` in general.
    pub fn height(&self) -> usize {
        self.root.level() as usize + 1
    }

    /// The root's content address.
    pub fn hash_of(&self) -> Address {
        self.root.address()
    }

    /// The binary format of the backing store.
    pub fn format(&self) -> crate::store::FormatId {
        self.store.format()
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The node store this snapshot reads through.
    pub fn node_store(&self) -> &NodeStore {
        &self.store
    }

    /// Look up `key`, returning its value.
    pub async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let mut node = self.root.clone();
        loop {
            if node.is_leaf() {
                return Ok(find_exact(&node, key, &self.order).map(|i| node.value_bytes(i)));
            }
            let idx = lower_bound(&node, key, &self.order);
            if idx == node.count() {
                // beyond the greatest key in the tree
                return Ok(None);
            }
            node = self.store.read(node.child_address(idx)).await?;
        }
    }

    /// True iff `key` is present.
    pub async fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Visit every entry in ascending key order.
    pub async fn iter_all<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        let mut cur = cursor::Cursor::seek_to_start(self.store.clone(), self.root.clone()).await?;
        while cur.valid() {
            f(cur.key(), cur.value())?;
            cur.advance().await?;
        }
        Ok(())
    }

    /// Visit every address reachable from the root: the root itself, every
    /// child address, and leaf value addresses in address-valued trees.
    pub async fn walk_addresses<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(Address) -> Result<()>,
    {
        f(self.root.address())?;
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                if node.has_address_values() {
                    for i in 0..node.count() {
                        f(node.child_address(i))?;
                    }
                }
                continue;
            }
            for i in 0..node.count() {
                let child = node.child_address(i);
                f(child)?;
                stack.push(self.store.read(child).await?);
            }
        }
        Ok(())
    }

    /// Visit every node reachable from the root, root first.
    pub async fn walk_nodes<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Node) -> Result<()>,
    {
        let mut stack = vec![self.root.clone()];
        while let Some(node) = stack.pop() {
            f(&node)?;
            if !node.is_leaf() {
                // push in reverse so children visit left-to-right
                for i in (0..node.count()).rev() {
                    stack.push(self.store.read(node.child_address(i)).await?);
                }
            }
        }
        Ok(())
    }

    /// Begin a batch of edits against this snapshot.
    pub fn editor(&self) -> editor::Editor<O> {
        editor::Editor::new(self.clone())
    }
}
