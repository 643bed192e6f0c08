//! Structural invariants over built trees: leaf depth, subtree counts,
//! content addressing, and cursor traversal.

mod common;

use common::node_store;
use strata_db_core::{Address, AddressSet};
use strata_db_prolly::{AddressMap, Cursor, Node};

async fn build_map(n: usize) -> AddressMap {
    let (_chunks, store) = node_store();
    let map = AddressMap::empty(store).unwrap();
    let mut editor = map.editor();
    for i in 0..n {
        let name = format!("name/{i:06}");
        editor.add(&name, Address::of(name.as_bytes()));
    }
    editor.flush().await.unwrap()
}

#[tokio::test]
async fn root_hash_is_the_hash_of_the_root_bytes() {
    let map = build_map(1_500).await;
    let mut root: Option<Node> = None;
    map.walk_nodes(|node| {
        if root.is_none() {
            root = Some(node.clone());
        }
        Ok(())
    })
    .await
    .unwrap();
    let root = root.unwrap();
    assert_eq!(map.hash_of(), root.address());
    assert_eq!(map.hash_of(), Address::of(root.bytes()));
}

#[tokio::test]
async fn all_leaves_sit_one_level_apart_from_their_parents() {
    let map = build_map(5_000).await;
    let store = map.inner().node_store().clone();

    let mut stack = vec![map.inner().root().clone()];
    let mut leaf_count = 0u64;
    while let Some(node) = stack.pop() {
        if node.is_leaf() {
            leaf_count += node.count() as u64;
            continue;
        }
        let mut subtree_sum = 0u64;
        for i in 0..node.count() {
            let child = store.read(node.child_address(i)).await.unwrap();
            assert_eq!(
                child.level() + 1,
                node.level(),
                "child level must be parent level - 1"
            );
            assert_eq!(
                child.tree_count(),
                node.subtree_count(i),
                "stored subtree count must match the child"
            );
            assert_eq!(
                child.last_key().unwrap(),
                node.key(i),
                "routing key must be the child's greatest key"
            );
            subtree_sum += child.tree_count();
            stack.push(child);
        }
        assert_eq!(subtree_sum, node.tree_count());
    }
    assert_eq!(leaf_count, map.count());
}

#[tokio::test]
async fn walk_addresses_visits_every_node_and_value() {
    let map = build_map(1_200).await;

    let mut node_addrs = AddressSet::default();
    map.walk_nodes(|node| {
        node_addrs.insert(node.address());
        Ok(())
    })
    .await
    .unwrap();

    let mut walked = AddressSet::default();
    map.walk_addresses(|addr| {
        walked.insert(addr);
        Ok(())
    })
    .await
    .unwrap();

    // every node address appears among the walked addresses, and so does
    // every stored leaf value
    for addr in &node_addrs {
        assert!(walked.contains(addr), "node {addr} missed by walk_addresses");
    }
    map.iter_all(|_, value_addr| {
        assert!(walked.contains(&value_addr));
        Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn cursor_walks_forward_and_backward() {
    let map = build_map(2_500).await;
    let store = map.inner().node_store().clone();
    let root = map.inner().root().clone();

    let mut forward = Vec::new();
    let mut cur = Cursor::seek_to_start(store.clone(), root.clone()).await.unwrap();
    while cur.valid() {
        forward.push(cur.key().to_vec());
        cur.advance().await.unwrap();
    }
    assert_eq!(forward.len() as u64, map.count());
    assert!(forward.windows(2).all(|w| w[0] < w[1]));

    // retreat from past-the-end re-enters the last entry
    assert!(cur.retreat().await.unwrap());
    assert_eq!(cur.key(), forward.last().unwrap().as_slice());

    let mut backward = Vec::new();
    backward.push(cur.key().to_vec());
    while cur.retreat().await.unwrap() {
        backward.push(cur.key().to_vec());
    }
    backward.reverse();
    assert_eq!(forward, backward);
}

#[tokio::test]
async fn seek_lands_on_the_smallest_key_at_or_above() {
    let map = build_map(800).await;
    let store = map.inner().node_store().clone();
    let root = map.inner().root().clone();
    let order = strata_db_prolly::Lexicographic;

    // exact hit
    let cur = Cursor::seek(store.clone(), root.clone(), b"name/000500", &order)
        .await
        .unwrap();
    assert_eq!(cur.key(), b"name/000500");

    // between keys: lands on the successor
    let cur = Cursor::seek(store.clone(), root.clone(), b"name/000500x", &order)
        .await
        .unwrap();
    assert_eq!(cur.key(), b"name/000501");

    // beyond the last key: past the end
    let cur = Cursor::seek(store, root, b"zzzz", &order).await.unwrap();
    assert!(!cur.valid());
}
