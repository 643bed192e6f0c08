//! Batched mutation: the editor and the bottom-up rebuild.
//!
//! An [`Editor`] buffers edits (sorted under the tree's comparator; `None`
//! marks a tombstone) over a base snapshot. [`Editor::flush`] produces the
//! successor snapshot in one pass:
//!
//! 1. Seek the base cursor to the smallest edited key and rewind to the
//!    start of that leaf. Everything left of the leaf is unchanged, so each
//!    internal path node's prefix entries are replayed into the builder for
//!    that level — the chunkers resume in exactly the state the original
//!    build left them in (replaying a node prefix never fires a boundary,
//!    because the same pairs fired none when the node was first built).
//! 2. Merge the base entry stream with the edit stream into the level-0
//!    builder; boundaries emit finished nodes and push
//!    `(last_key, address, tree_count)` entries one level up.
//! 3. After both streams drain, flush each level's tail upward; the topmost
//!    node is the new root, collapsing single-child internal chains.
//!
//! The base snapshot is never modified; a dropped or failed flush leaves no
//! partial state because nodes are written only when complete.

use crate::chunker::Chunker;
use crate::format::{Node, NodeBuilder};
use crate::store::{FormatId, NodeStore};
use crate::tree::cursor::Cursor;
use crate::tree::{KeyOrder, StaticMap};
use bytes::Bytes;
use std::cmp::Ordering;
use strata_db_core::{Error, Result};

/// A pending edit: new value, or `None` for a tombstone.
pub type Edit = (Vec<u8>, Option<Vec<u8>>);

/// Batched writer over a [`StaticMap`] snapshot.
#[derive(Debug)]
pub struct Editor<O: KeyOrder> {
    base: StaticMap<O>,
    edits: Vec<Edit>,
}

impl<O: KeyOrder> Editor<O> {
    /// Create an editor over `base`.
    pub fn new(base: StaticMap<O>) -> Editor<O> {
        Editor {
            base,
            edits: Vec::new(),
        }
    }

    /// Number of pending edits.
    pub fn pending(&self) -> usize {
        self.edits.len()
    }

    fn upsert(&mut self, key: Vec<u8>, value: Option<Vec<u8>>) {
        let order = self.base.order.clone();
        match self
            .edits
            .binary_search_by(|(k, _)| order.compare(k, &key))
        {
            Ok(i) => self.edits[i] = (key, value),
            Err(i) => self.edits.insert(i, (key, value)),
        }
    }

    /// Record an insert or overwrite.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.upsert(key.into(), Some(value.into()));
    }

    /// Record a deletion. Deleting an absent key is a no-op at flush.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.upsert(key.into(), None);
    }

    /// Record a batch of edits.
    pub fn apply<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = Edit>,
    {
        for (key, value) in batch {
            self.upsert(key, value);
        }
    }

    /// Read through the edit buffer, falling back to the base snapshot.
    pub async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let order = &self.base.order;
        if let Ok(i) = self.edits.binary_search_by(|(k, _)| order.compare(k, key)) {
            return Ok(self.edits[i].1.as_ref().map(|v| Bytes::from(v.clone())));
        }
        self.base.get(key).await
    }

    /// Apply all pending edits, producing the successor snapshot.
    pub async fn flush(self) -> Result<StaticMap<O>> {
        let Editor { base, edits } = self;
        if edits.is_empty() {
            return Ok(base);
        }
        if base.store.format() != FormatId::Prolly {
            return Err(Error::format_unsupported(format!(
                "cannot mutate a {} tree",
                base.store.format()
            )));
        }

        let store = base.store.clone();
        let order = base.order.clone();
        let addr_values = base.root.has_address_values();
        let mut chain = BuilderChain::new(store.clone(), addr_values);

        let mut cursor = if base.root.is_empty() {
            None
        } else {
            let first_key = &edits[0].0;
            let cur = Cursor::seek(store.clone(), base.root.clone(), first_key, &order).await?;

            // Replay unchanged prefixes of the internal path nodes.
            let frames = cur.frames();
            for frame in &frames[..frames.len() - 1] {
                let node = &frame.node;
                for i in 0..frame.idx as usize {
                    chain
                        .append(
                            node.level() as usize,
                            node.key(i),
                            node.value(i),
                            node.subtree_count(i),
                        )
                        .await?;
                }
            }

            let mut cur = cur;
            cur.rewind_leaf();
            Some(cur)
        };

        let mut edits = edits.into_iter().peekable();
        let mut dropped = 0u64;
        let mut written = 0u64;

        // Merge the base stream with the edit stream.
        if let Some(cur) = cursor.as_mut() {
            while cur.valid() {
                let Some((edit_key, _)) = edits.peek() else {
                    break;
                };
                match order.compare(cur.key(), edit_key) {
                    Ordering::Less => {
                        chain.append(0, cur.key(), cur.value(), 1).await?;
                        cur.advance().await?;
                    }
                    Ordering::Equal => {
                        let (key, value) = edits.next().unwrap();
                        match value {
                            Some(v) => {
                                chain.append(0, &key, &v, 1).await?;
                                written += 1;
                            }
                            None => dropped += 1,
                        }
                        cur.advance().await?;
                    }
                    Ordering::Greater => {
                        let (key, value) = edits.next().unwrap();
                        if let Some(v) = value {
                            chain.append(0, &key, &v, 1).await?;
                            written += 1;
                        }
                        // tombstone for an absent key: no-op
                    }
                }
            }
            // base entries past the last edit
            while cur.valid() {
                chain.append(0, cur.key(), cur.value(), 1).await?;
                cur.advance().await?;
            }
        }
        // edits past the last base entry
        for (key, value) in edits {
            if let Some(v) = value {
                chain.append(0, &key, &v, 1).await?;
                written += 1;
            }
        }

        let root = chain.finish().await?;
        tracing::debug!(
            root = %root.address(),
            entries = root.tree_count(),
            written,
            dropped,
            "flushed editor"
        );
        Ok(StaticMap {
            root,
            store,
            order,
        })
    }
}

// ============================================================================
// BuilderChain
// ============================================================================

#[derive(Debug)]
struct LevelState {
    builder: NodeBuilder,
    chunker: Chunker,
}

/// One builder+chunker per level, growing upward as boundaries emit nodes.
#[derive(Debug)]
struct BuilderChain {
    store: NodeStore,
    leaf_addr_values: bool,
    levels: Vec<LevelState>,
}

impl BuilderChain {
    fn new(store: NodeStore, leaf_addr_values: bool) -> BuilderChain {
        BuilderChain {
            store,
            leaf_addr_values,
            levels: Vec::new(),
        }
    }

    fn ensure_level(&mut self, level: usize) {
        while self.levels.len() <= level {
            let l = self.levels.len() as u8;
            let addr_values = l > 0 || self.leaf_addr_values;
            self.levels.push(LevelState {
                builder: NodeBuilder::new(l, addr_values),
                chunker: Chunker::new(l),
            });
        }
    }

    /// Append an entry at `level`, cascading boundary emissions upward.
    async fn append(&mut self, level: usize, key: &[u8], value: &[u8], subtree: u64) -> Result<()> {
        let mut pending: Vec<(usize, Vec<u8>, Vec<u8>, u64)> =
            vec![(level, key.to_vec(), value.to_vec(), subtree)];
        while let Some((lvl, k, v, s)) = pending.pop() {
            self.ensure_level(lvl);

            // an oversized pair forces a boundary before it
            if !self.levels[lvl].builder.has_capacity(&k, &v)
                && !self.levels[lvl].builder.is_empty()
            {
                let entry = self.flush_level(lvl).await?;
                pending.push((lvl, k, v, s));
                pending.push((lvl + 1, entry.0, entry.1, entry.2));
                continue;
            }

            let boundary = {
                let st = &mut self.levels[lvl];
                st.builder.append(&k, &v, s)?;
                st.chunker.observe(&k, &v)
            };
            if boundary {
                let entry = self.flush_level(lvl).await?;
                pending.push((lvl + 1, entry.0, entry.1, entry.2));
            }
        }
        Ok(())
    }

    /// Build and write the pending node at `level`, returning the parent entry.
    async fn flush_level(&mut self, level: usize) -> Result<(Vec<u8>, Vec<u8>, u64)> {
        let st = &mut self.levels[level];
        if st.builder.is_empty() {
            return Err(Error::invariant("flush of an empty node builder"));
        }
        let node = st.builder.build(self.store.pool())?;
        st.chunker.reset();
        let addr = self.store.write(&node).await?;
        let last_key = node
            .last_key()
            .ok_or_else(|| Error::invariant("built node has no last key"))?
            .to_vec();
        Ok((last_key, addr.as_bytes().to_vec(), node.tree_count()))
    }

    /// Flush every tail upward and return the new root.
    async fn finish(mut self) -> Result<Node> {
        self.ensure_level(0);

        let mut level = 0;
        while level + 1 < self.levels.len() {
            if !self.levels[level].builder.is_empty() {
                let (k, v, s) = self.flush_level(level).await?;
                self.append(level + 1, &k, &v, s).await?;
            }
            level += 1;
        }

        let top = self.levels.len() - 1;
        let node = self.levels[top].builder.build(self.store.pool())?;

        // an internal root with a single child is a redundant chain link
        let mut root = node;
        while root.level() > 0 && root.count() == 1 {
            root = self.store.read(root.child_address(0)).await?;
        }
        self.store.write(&root).await?;
        Ok(root)
    }
}
