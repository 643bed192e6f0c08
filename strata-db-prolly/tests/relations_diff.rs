//! Archive grouping: pairing structurally corresponding chunks between two
//! versions of a map and uniting them in the chunk relations.

mod common;

use common::{int_pair, int_pair_desc, node_store, text, text_desc};
use strata_db_core::ChunkRelations;
use strata_db_prolly::{relate_table_versions, TupleMap};

async fn versioned_maps(rows: i64, touch: &[i64]) -> (TupleMap, TupleMap) {
    let (_chunks, store) = node_store();
    let kd = int_pair_desc();
    let vd = text_desc();
    let map = TupleMap::empty(store, kd.clone(), vd.clone()).unwrap();

    let mut editor = map.editor();
    for i in 0..rows {
        editor.put(&int_pair(&kd, i, 0), &text(&vd, &format!("v1-{i}")));
    }
    let from = editor.flush().await.unwrap();

    let mut editor = from.editor();
    for &i in touch {
        editor.put(&int_pair(&kd, i, 0), &text(&vd, &format!("v2-{i}")));
    }
    let to = editor.flush().await.unwrap();
    (from, to)
}

#[tokio::test]
async fn touched_rows_relate_their_leaf_chunks() {
    let (from, to) = versioned_maps(6_000, &[17, 3_200, 5_990]).await;
    assert_ne!(from.hash_of(), to.hash_of());

    let mut relations = ChunkRelations::new();
    relate_table_versions(&mut relations, from.inner(), to.inner())
        .await
        .unwrap();

    assert!(relations.count() > 0, "changed leaves must be related");
    // far fewer related chunks than total leaves: unchanged chunks skipped
    let mut total_leaves = 0usize;
    from.walk_nodes(|n| {
        if n.is_leaf() {
            total_leaves += 1;
        }
        Ok(())
    })
    .await
    .unwrap();
    assert!(relations.count() < total_leaves);
}

#[tokio::test]
async fn identical_versions_relate_nothing() {
    let (from, _) = versioned_maps(2_000, &[]).await;
    let mut relations = ChunkRelations::new();
    relate_table_versions(&mut relations, from.inner(), from.inner())
        .await
        .unwrap();
    assert_eq!(relations.count(), 0);
}

#[tokio::test]
async fn groups_collect_across_multiple_versions() {
    let (from, mid) = versioned_maps(4_000, &[100]).await;
    let mut editor = mid.editor();
    let kd = int_pair_desc();
    let vd = text_desc();
    editor.put(&int_pair(&kd, 100, 0), &text(&vd, "v3"));
    let to = editor.flush().await.unwrap();

    let mut relations = ChunkRelations::new();
    relate_table_versions(&mut relations, from.inner(), mid.inner())
        .await
        .unwrap();
    relate_table_versions(&mut relations, mid.inner(), to.inner())
        .await
        .unwrap();

    // the same row rewritten in three versions chains its leaf's
    // incarnations into one group
    let groups = relations.groups();
    assert!(!groups.is_empty());
    assert!(groups.iter().any(|g| g.len() >= 3));
}
