//! Typed tuple map: the row-storage specialization of the ordered tree.
//!
//! A [`TupleMap`] keys on one [`TupleDesc`] and stores values described by
//! another. Leaf values are inline bytes (tuples are not content-addressed),
//! and range scans evaluate [`Range`] predicates during forward iteration.

use crate::range::{search_above_start, search_point, Range};
use crate::store::NodeStore;
use crate::tree::cursor::Cursor;
use crate::tree::editor::Editor;
use crate::tree::StaticMap;
use crate::tuple::{Tuple, TupleDesc};
use bytes::Bytes;
use strata_db_core::{Address, Error, Result};

/// Ordered map from key tuples to value tuples.
#[derive(Clone, Debug)]
pub struct TupleMap {
    tuples: StaticMap<TupleDesc>,
    value_desc: TupleDesc,
}

impl TupleMap {
    /// An empty map over `key_desc` / `value_desc`.
    pub fn empty(store: NodeStore, key_desc: TupleDesc, value_desc: TupleDesc) -> Result<TupleMap> {
        Ok(TupleMap {
            tuples: StaticMap::empty(store, key_desc, false)?,
            value_desc,
        })
    }

    /// Open a map at a known root address.
    pub async fn load(
        store: NodeStore,
        root: Address,
        key_desc: TupleDesc,
        value_desc: TupleDesc,
    ) -> Result<TupleMap> {
        let tuples = StaticMap::load(store, root, key_desc).await?;
        if tuples.root().has_address_values() {
            return Err(Error::corrupt("tuple map root stores address values"));
        }
        Ok(TupleMap { tuples, value_desc })
    }

    /// The key descriptor.
    pub fn key_desc(&self) -> &TupleDesc {
        &self.tuples.order
    }

    /// The value descriptor.
    pub fn value_desc(&self) -> &TupleDesc {
        &self.value_desc
    }

    /// Number of rows.
    pub fn count(&self) -> u64 {
        self.tuples.count()
    }

    /// Tree height.
    pub fn height(&self) -> usize {
        self.tuples.height()
    }

    /// Root address.
    pub fn hash_of(&self) -> Address {
        self.tuples.hash_of()
    }

    /// Binary format of the backing store.
    pub fn format(&self) -> crate::store::FormatId {
        self.tuples.format()
    }

    /// Look up one row.
    pub async fn get(&self, key: &Tuple) -> Result<Option<Tuple>> {
        Ok(self
            .tuples
            .get(key.as_bytes())
            .await?
            .map(Tuple::from_bytes))
    }

    /// True iff the key is present.
    pub async fn has(&self, key: &Tuple) -> Result<bool> {
        self.tuples.has(key.as_bytes()).await
    }

    /// Visit every row in key order.
    pub async fn iter_all<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        self.tuples.iter_all(&mut f).await
    }

    /// Visit every row admitted by `range`, in key order.
    ///
    /// The start cursor is placed by a per-node scan for the first key above
    /// the range's start (linear in general; binary for the monotone
    /// single-column point shape). Iteration then filters each key against
    /// both bounds and halts once the column-0 stop cut alone rules a key
    /// out — beyond that point the sort order guarantees no more members.
    pub async fn iter_range<F>(&self, range: &Range, mut f: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        if range.start.len() != self.key_desc().field_count()
            || range.stop.len() != self.key_desc().field_count()
        {
            return Err(Error::invariant(format!(
                "range binds {} start / {} stop columns against a {}-column key",
                range.start.len(),
                range.stop.len(),
                self.key_desc().field_count()
            )));
        }

        let mut cur = self.seek_range_start(range).await?;
        // a start past the current leaf needs one step to the next leaf
        if !cur.valid() {
            cur.advance().await?;
        }
        while cur.valid() {
            if !range.column_zero_in_stop(cur.key()) {
                break;
            }
            if range.above_start(cur.key()) && range.below_stop(cur.key()) {
                f(cur.key(), cur.value())?;
            }
            cur.advance().await?;
        }
        Ok(())
    }

    async fn seek_range_start(&self, range: &Range) -> Result<Cursor> {
        let store = self.tuples.store.clone();
        let point = range.is_single_column_point();
        let mut stack_node = self.tuples.root.clone();
        let mut frames = Vec::new();
        loop {
            let idx = if point {
                search_point(&stack_node, range)
            } else {
                search_above_start(&stack_node, range)
            };
            if stack_node.is_leaf() || stack_node.is_empty() {
                frames.push((stack_node, idx));
                break;
            }
            let clamped = idx.min(stack_node.count() - 1);
            let child = store.read(stack_node.child_address(clamped)).await?;
            frames.push((stack_node, clamped));
            stack_node = child;
        }
        Cursor::from_frames(store, frames)
    }

    /// Begin a batch of edits.
    pub fn editor(&self) -> TupleMapEditor {
        TupleMapEditor {
            editor: self.tuples.editor(),
            value_desc: self.value_desc.clone(),
        }
    }

    /// The underlying generic tree (used by the diff walk).
    pub fn inner(&self) -> &StaticMap<TupleDesc> {
        &self.tuples
    }

    /// Visit every address reachable from the root.
    pub async fn walk_addresses<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(Address) -> Result<()>,
    {
        self.tuples.walk_addresses(f).await
    }

    /// Visit every node, root first.
    pub async fn walk_nodes<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(&crate::format::Node) -> Result<()>,
    {
        self.tuples.walk_nodes(f).await
    }
}

/// Batched writer over a [`TupleMap`].
#[derive(Debug)]
pub struct TupleMapEditor {
    editor: Editor<TupleDesc>,
    value_desc: TupleDesc,
}

impl TupleMapEditor {
    /// Number of pending edits (one per distinct key).
    pub fn pending(&self) -> usize {
        self.editor.pending()
    }

    /// Record an insert or overwrite.
    pub fn put(&mut self, key: &Tuple, value: &Tuple) {
        self.editor
            .put(key.as_bytes().to_vec(), value.as_bytes().to_vec());
    }

    /// Record a deletion. Deleting an absent key is a no-op at flush.
    pub fn delete(&mut self, key: &Tuple) {
        self.editor.delete(key.as_bytes().to_vec());
    }

    /// Read through pending edits.
    pub async fn get(&self, key: &Tuple) -> Result<Option<Tuple>> {
        Ok(self
            .editor
            .get(key.as_bytes())
            .await?
            .map(|b: Bytes| Tuple::from_bytes(b)))
    }

    /// Apply pending edits, producing the successor map.
    pub async fn flush(self) -> Result<TupleMap> {
        Ok(TupleMap {
            tuples: self.editor.flush().await?,
            value_desc: self.value_desc,
        })
    }
}
