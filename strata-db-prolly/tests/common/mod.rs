//! Shared fixtures for prolly integration tests.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Arc;
use strata_db_core::{ChunkStore, MemoryChunkStore};
use strata_db_prolly::{
    FieldType, NodeStore, Tuple, TupleBuilder, TupleDesc, TupleMap, TypeTag,
};

/// A fresh node store over an in-memory chunk store.
pub fn node_store() -> (Arc<MemoryChunkStore>, NodeStore) {
    let chunks = MemoryChunkStore::new();
    let store = NodeStore::new(Arc::clone(&chunks) as Arc<dyn ChunkStore>);
    (chunks, store)
}

/// Key descriptor `(int64, int64)`.
pub fn int_pair_desc() -> TupleDesc {
    TupleDesc::new(vec![
        FieldType::new(TypeTag::Int64),
        FieldType::new(TypeTag::Int64),
    ])
}

/// Value descriptor with a single text column.
pub fn text_desc() -> TupleDesc {
    TupleDesc::new(vec![FieldType::new(TypeTag::Text)])
}

/// Build an `(int64, int64)` key tuple.
pub fn int_pair(desc: &TupleDesc, a: i64, b: i64) -> Tuple {
    let mut tb = TupleBuilder::new(desc.clone());
    tb.put_int64(0, a).put_int64(1, b);
    tb.build().unwrap()
}

/// Build a single-column text tuple.
pub fn text(desc: &TupleDesc, s: &str) -> Tuple {
    let mut tb = TupleBuilder::new(desc.clone());
    tb.put_text(0, s);
    tb.build().unwrap()
}

/// An empty `(int64, int64) -> (text)` map.
pub fn int_pair_map() -> TupleMap {
    let (_, store) = node_store();
    TupleMap::empty(store, int_pair_desc(), text_desc()).unwrap()
}
