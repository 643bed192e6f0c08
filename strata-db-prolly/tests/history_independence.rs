//! History independence: tree shape depends only on the entry set, never on
//! the order or batching of the edits that produced it.

mod common;

use common::node_store;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use strata_db_core::Address;
use strata_db_prolly::AddressMap;

fn random_entries(rng: &mut StdRng, n: usize) -> Vec<(String, Address)> {
    let mut entries = Vec::with_capacity(n);
    let mut seen = std::collections::HashSet::new();
    while entries.len() < n {
        let key: u64 = rng.gen();
        if !seen.insert(key) {
            continue;
        }
        let name = format!("k{key:016x}");
        let addr = Address::of(name.as_bytes());
        entries.push((name, addr));
    }
    entries
}

async fn build_in_batches(entries: &[(String, Address)], batch: usize) -> AddressMap {
    let (_chunks, store) = node_store();
    let mut map = AddressMap::empty(store).unwrap();
    for chunk in entries.chunks(batch) {
        let mut editor = map.editor();
        for (name, addr) in chunk {
            editor.add(name, *addr);
        }
        map = editor.flush().await.unwrap();
    }
    map
}

#[tokio::test]
async fn insertion_order_does_not_change_the_root() {
    const SEED: u64 = 8_675_309;
    let mut rng = StdRng::seed_from_u64(SEED);
    let entries = random_entries(&mut rng, 10_000);

    let mut order_a = entries.clone();
    order_a.shuffle(&mut rng);
    let mut order_b = entries.clone();
    order_b.shuffle(&mut rng);

    let whole = build_in_batches(&entries, entries.len()).await;
    let a = build_in_batches(&order_a, 1_000).await;
    let b = build_in_batches(&order_b, 777).await;

    assert_eq!(whole.hash_of(), a.hash_of(), "seed {SEED}");
    assert_eq!(a.hash_of(), b.hash_of(), "seed {SEED}");
    assert_eq!(a.count(), 10_000);
    assert!(a.height() >= 2);
}

#[tokio::test]
async fn deletion_converges_to_the_smaller_tree() {
    const SEED: u64 = 424_242;
    let mut rng = StdRng::seed_from_u64(SEED);
    let entries = random_entries(&mut rng, 3_000);

    let (keep, drop): (Vec<_>, Vec<_>) = entries
        .iter()
        .cloned()
        .enumerate()
        .partition(|(i, _)| i % 2 == 0);
    let keep: Vec<_> = keep.into_iter().map(|(_, e)| e).collect();
    let mut drop: Vec<_> = drop.into_iter().map(|(_, e)| e).collect();
    drop.shuffle(&mut rng);

    // build everything, then delete half in uneven batches
    let mut map = build_in_batches(&entries, 500).await;
    for chunk in drop.chunks(311) {
        let mut editor = map.editor();
        for (name, _) in chunk {
            editor.delete(name);
        }
        map = editor.flush().await.unwrap();
    }

    let direct = build_in_batches(&keep, keep.len()).await;
    assert_eq!(map.hash_of(), direct.hash_of(), "seed {SEED}");
    assert_eq!(map.count(), keep.len() as u64);
}

#[tokio::test]
async fn rewriting_identical_values_is_a_fixed_point() {
    const SEED: u64 = 77;
    let mut rng = StdRng::seed_from_u64(SEED);
    let entries = random_entries(&mut rng, 1_000);

    let map = build_in_batches(&entries, 250).await;
    let before = map.hash_of();

    let mut editor = map.editor();
    for (name, addr) in &entries[..100] {
        editor.update(name, *addr);
    }
    let map = editor.flush().await.unwrap();
    assert_eq!(map.hash_of(), before);
}

#[tokio::test]
async fn empty_trees_share_one_root() {
    let (_c1, s1) = node_store();
    let (_c2, s2) = node_store();
    let a = AddressMap::empty(s1).unwrap();
    let b = AddressMap::empty(s2).unwrap();
    assert_eq!(a.hash_of(), b.hash_of());

    // deleting absent names from an empty tree leaves it empty
    let mut editor = a.editor();
    editor.delete("ghost");
    let a = editor.flush().await.unwrap();
    assert_eq!(a.hash_of(), b.hash_of());
    assert_eq!(a.count(), 0);
}
