//! AddressMap end-to-end scenarios: directory round trips, reopening via a
//! committed root, and editor semantics.

mod common;

use common::node_store;
use strata_db_core::{Address, ChunkStore};
use strata_db_prolly::{AddressMap, NodeStore};

async fn flush_and_commit(
    chunks: &dyn ChunkStore,
    editor: strata_db_prolly::AddressMapEditor,
) -> AddressMap {
    let map = editor.flush().await.unwrap();
    let expected = chunks.root().await.unwrap();
    assert!(chunks.commit(map.hash_of(), expected).await.unwrap());
    map
}

#[tokio::test]
async fn round_trip_through_reopened_store() {
    let (chunks, store) = node_store();

    let addr_a = Address::new([0xAA; 20]);
    let addr_b = Address::new([0xBB; 20]);
    let addr_c = Address::new([0xCC; 20]);

    let map = AddressMap::empty(store).unwrap();
    let mut editor = map.editor();
    editor.add("dsA", addr_a);
    editor.add("dsB", addr_b);
    editor.add("dsC", addr_c);
    let map = flush_and_commit(chunks.as_ref(), editor).await;

    // reopen from the committed root through a fresh node store
    let root = chunks.root().await.unwrap();
    let reopened = AddressMap::load(
        NodeStore::new(std::sync::Arc::clone(&chunks) as _),
        root,
    )
    .await
    .unwrap();

    assert_eq!(reopened.count(), 3);
    assert_eq!(reopened.get("dsB").await.unwrap(), Some(addr_b));
    assert_eq!(reopened.get("missing").await.unwrap(), None);
    assert!(reopened.has("dsA").await.unwrap());

    let mut names = Vec::new();
    reopened
        .iter_all(|name, addr| {
            names.push((name.to_string(), addr));
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(
        names,
        vec![
            ("dsA".to_string(), addr_a),
            ("dsB".to_string(), addr_b),
            ("dsC".to_string(), addr_c),
        ]
    );
}

#[tokio::test]
async fn editor_update_and_delete() {
    let (_chunks, store) = node_store();
    let map = AddressMap::empty(store).unwrap();

    let v1 = Address::of(b"v1");
    let v2 = Address::of(b"v2");

    let mut editor = map.editor();
    editor.add("branch", v1);
    let map = editor.flush().await.unwrap();
    assert_eq!(map.get("branch").await.unwrap(), Some(v1));

    let mut editor = map.editor();
    editor.update("branch", v2);
    editor.delete("never-existed"); // no-op
    let map = editor.flush().await.unwrap();
    assert_eq!(map.get("branch").await.unwrap(), Some(v2));
    assert_eq!(map.count(), 1);

    let mut editor = map.editor();
    editor.delete("branch");
    let map = editor.flush().await.unwrap();
    assert!(!map.has("branch").await.unwrap());
    assert_eq!(map.count(), 0);
}

#[tokio::test]
async fn editor_reads_through_pending_edits() {
    let (_chunks, store) = node_store();
    let map = AddressMap::empty(store).unwrap();
    let addr = Address::of(b"pending");

    let mut editor = map.editor();
    editor.add("ds", addr);
    assert_eq!(editor.get("ds").await.unwrap(), Some(addr));
    assert_eq!(editor.get("absent").await.unwrap(), None);

    let map = editor.flush().await.unwrap();
    let mut editor = map.editor();
    editor.delete("ds");
    assert_eq!(editor.get("ds").await.unwrap(), None);
}

#[tokio::test]
async fn large_directory_stays_sorted_and_counted() {
    let (_chunks, store) = node_store();
    let map = AddressMap::empty(store).unwrap();

    const N: usize = 2_000;
    let mut editor = map.editor();
    for i in 0..N {
        let name = format!("dataset/{i:05}");
        editor.add(&name, Address::of(name.as_bytes()));
    }
    let map = editor.flush().await.unwrap();

    assert_eq!(map.count(), N as u64);
    assert!(map.height() >= 2, "expected a multi-level tree");

    let mut prev: Option<String> = None;
    let mut seen = 0u64;
    map.iter_all(|name, addr| {
        if let Some(p) = &prev {
            assert!(p.as_str() < name, "names out of order: {p} !< {name}");
        }
        assert_eq!(addr, Address::of(name.as_bytes()));
        prev = Some(name.to_string());
        seen += 1;
        Ok(())
    })
    .await
    .unwrap();
    assert_eq!(seen, N as u64);
}
