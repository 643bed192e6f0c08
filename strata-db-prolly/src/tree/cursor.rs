//! Tree cursor: a mutable pointer into an immutable snapshot.
//!
//! A cursor is a root-to-leaf stack of `(node, index)` frames; the frame at
//! depth `d` points at the child of the frame above it. Off-end states are
//! represented by a leaf index of `-1` (before the first entry) or `count`
//! (past the last), matching the directions [`Cursor::retreat`] and
//! [`Cursor::advance`] fall off.
//!
//! Cursors are single-threaded and must not outlive the snapshot they were
//! opened on; frames hold their nodes, so reads never dangle.

use crate::format::Node;
use crate::store::NodeStore;
use crate::tree::{lower_bound, KeyOrder};
use strata_db_core::Result;

#[derive(Clone, Debug)]
pub(crate) struct Frame {
    pub node: Node,
    pub idx: isize,
}

/// Ordered traversal state over one tree snapshot.
#[derive(Debug)]
pub struct Cursor {
    store: NodeStore,
    stack: Vec<Frame>,
}

impl Cursor {
    /// Open a cursor on the first entry of the tree.
    pub async fn seek_to_start(store: NodeStore, root: Node) -> Result<Cursor> {
        let mut stack = vec![Frame { node: root, idx: 0 }];
        loop {
            let top = stack.last().unwrap();
            if top.node.is_leaf() || top.node.is_empty() {
                break;
            }
            let child = store.read(top.node.child_address(0)).await?;
            stack.push(Frame {
                node: child,
                idx: 0,
            });
        }
        Ok(Cursor { store, stack })
    }

    /// Open a cursor at the smallest entry whose key is ≥ `key`.
    ///
    /// Internal descent clamps to the last child, so a key greater than
    /// everything in the tree lands past the end of the last leaf.
    pub async fn seek<O: KeyOrder>(
        store: NodeStore,
        root: Node,
        key: &[u8],
        order: &O,
    ) -> Result<Cursor> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut node = root;
        loop {
            let idx = lower_bound(&node, key, order);
            if node.is_leaf() || node.is_empty() {
                stack.push(Frame {
                    node,
                    idx: idx as isize,
                });
                return Ok(Cursor { store, stack });
            }
            let clamped = idx.min(node.count() - 1);
            let child = store.read(node.child_address(clamped)).await?;
            stack.push(Frame {
                node,
                idx: clamped as isize,
            });
            node = child;
        }
    }

    fn leaf(&self) -> &Frame {
        self.stack.last().expect("cursor stack is never empty")
    }

    /// True iff the cursor points at an entry.
    pub fn valid(&self) -> bool {
        let f = self.leaf();
        f.idx >= 0 && (f.idx as usize) < f.node.count()
    }

    /// Key at the current position. Caller must check [`Cursor::valid`].
    pub fn key(&self) -> &[u8] {
        let f = self.leaf();
        f.node.key(f.idx as usize)
    }

    /// Value at the current position. Caller must check [`Cursor::valid`].
    pub fn value(&self) -> &[u8] {
        let f = self.leaf();
        f.node.value(f.idx as usize)
    }

    /// Current `(key, value)`, or `None` when off the ends.
    pub fn current(&self) -> Option<(&[u8], &[u8])> {
        if self.valid() {
            Some((self.key(), self.value()))
        } else {
            None
        }
    }

    /// Step forward. Returns `false` once the cursor passes the last entry.
    pub async fn advance(&mut self) -> Result<bool> {
        let depth = self.stack.len() - 1;
        {
            let f = &mut self.stack[depth];
            if f.idx + 1 < f.node.count() as isize {
                f.idx += 1;
                return Ok(true);
            }
        }
        // leaf exhausted: find the deepest ancestor with a next sibling
        let mut d = depth;
        loop {
            if d == 0 {
                // past the end of the tree
                let f = &mut self.stack[depth];
                f.idx = f.node.count() as isize;
                return Ok(false);
            }
            d -= 1;
            let f = &self.stack[d];
            if f.idx + 1 < f.node.count() as isize {
                break;
            }
        }
        self.stack[d].idx += 1;
        self.stack.truncate(d + 1);
        // re-descend along the leftmost edge of the new subtree
        loop {
            let top = self.stack.last().unwrap();
            if top.node.is_leaf() {
                break;
            }
            let child = self
                .store
                .read(top.node.child_address(top.idx as usize))
                .await?;
            self.stack.push(Frame {
                node: child,
                idx: 0,
            });
        }
        Ok(true)
    }

    /// Step backward. Returns `false` once the cursor passes the first entry.
    pub async fn retreat(&mut self) -> Result<bool> {
        let depth = self.stack.len() - 1;
        {
            let f = &mut self.stack[depth];
            if f.idx > 0 {
                f.idx -= 1;
                return Ok(true);
            }
        }
        let mut d = depth;
        loop {
            if d == 0 {
                let f = &mut self.stack[depth];
                f.idx = -1;
                return Ok(false);
            }
            d -= 1;
            if self.stack[d].idx > 0 {
                break;
            }
        }
        self.stack[d].idx -= 1;
        self.stack.truncate(d + 1);
        // re-descend along the rightmost edge of the new subtree
        loop {
            let top = self.stack.last().unwrap();
            if top.node.is_leaf() {
                break;
            }
            let child = self
                .store
                .read(top.node.child_address(top.idx as usize))
                .await?;
            let idx = child.count() as isize - 1;
            self.stack.push(Frame { node: child, idx });
        }
        Ok(true)
    }

    /// Assemble a cursor from an explicit root-to-leaf descent, as produced
    /// by the range engine's predicate searches.
    pub(crate) fn from_frames(store: NodeStore, frames: Vec<(Node, usize)>) -> Result<Cursor> {
        if frames.is_empty() {
            return Err(strata_db_core::Error::invariant(
                "cursor requires at least a root frame",
            ));
        }
        let stack = frames
            .into_iter()
            .map(|(node, idx)| Frame {
                node,
                idx: idx as isize,
            })
            .collect();
        Ok(Cursor { store, stack })
    }

    /// Reset the leaf frame to its first entry, keeping the path.
    pub(crate) fn rewind_leaf(&mut self) {
        let depth = self.stack.len() - 1;
        self.stack[depth].idx = 0;
    }

    /// The full frame path, root first.
    pub(crate) fn frames(&self) -> &[Frame] {
        &self.stack
    }
}
