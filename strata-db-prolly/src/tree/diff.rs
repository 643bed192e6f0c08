//! Structural chunk pairing between two versions of one tree.
//!
//! The archive pass compresses related chunks with a shared dictionary. Two
//! versions of the same table usually share most leaf chunks verbatim (same
//! address) and differ in a few; the differing leaves still hold mostly the
//! same rows, so they compress well together. This walk pairs up the
//! structurally corresponding level-0 chunks of two snapshots and reports
//! the pairs whose addresses differ.

use crate::tree::{KeyOrder, StaticMap};
use std::cmp::Ordering;
use strata_db_core::{Address, ChunkRelations, Result};

/// One tree's leaf chunks in key order: `(last_key, address)`.
async fn leaf_refs<O: KeyOrder>(map: &StaticMap<O>) -> Result<Vec<(Vec<u8>, Address)>> {
    let mut refs = Vec::new();
    let mut stack = vec![map.root.clone()];
    // depth-first, children pushed in reverse for left-to-right order
    while let Some(node) = stack.pop() {
        if node.is_leaf() {
            if let Some(last) = node.last_key() {
                refs.push((last.to_vec(), node.address()));
            }
            continue;
        }
        for i in (0..node.count()).rev() {
            stack.push(map.store.read(node.child_address(i)).await?);
        }
    }
    Ok(refs)
}

/// Walk two versions of a tree and report corresponding level-0 chunks whose
/// addresses differ, as `(from, to)` pairs.
///
/// Leaves with equal addresses are skipped — identical chunks need no
/// relation. Alignment advances by comparing leaf boundary keys under the
/// tree's ordering, so a leaf that was re-chunked into several (or vice
/// versa) pairs with each overlapping counterpart.
pub async fn chunk_address_diff<O, F>(
    from: &StaticMap<O>,
    to: &StaticMap<O>,
    mut f: F,
) -> Result<()>
where
    O: KeyOrder,
    F: FnMut(Address, Address) -> Result<()>,
{
    if from.hash_of() == to.hash_of() {
        return Ok(());
    }
    let order = &from.order;
    let from_leaves = leaf_refs(from).await?;
    let to_leaves = leaf_refs(to).await?;

    let (mut i, mut j) = (0, 0);
    while i < from_leaves.len() && j < to_leaves.len() {
        let (fk, fa) = &from_leaves[i];
        let (tk, ta) = &to_leaves[j];
        if fa != ta {
            f(*fa, *ta)?;
        }
        match order.compare(fk, tk) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    Ok(())
}

/// Union every differing chunk pair of two table versions into `relations`.
///
/// The archive builder calls this per table whose schema and primary key set
/// are unchanged but whose row data differs between a commit and its parent.
pub async fn relate_table_versions<O: KeyOrder>(
    relations: &mut ChunkRelations,
    from: &StaticMap<O>,
    to: &StaticMap<O>,
) -> Result<()> {
    chunk_address_diff(from, to, |a, b| {
        relations.add(a, b);
        Ok(())
    })
    .await
}
