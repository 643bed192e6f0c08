//! # Strata DB Prolly
//!
//! The content-addressed ordered tree index at the core of Strata DB: a
//! probabilistic B-tree whose node boundaries come from a content-defined
//! chunker, making tree shape a pure function of the entry set. Two
//! databases holding the same rows converge on the same root address, which
//! is what makes structural diff, sync, and dedup cheap.
//!
//! This crate owns:
//!
//! - the node wire format and its zero-copy parser ([`format`])
//! - the boundary chunker ([`chunker`])
//! - parsed-node storage over a chunk store ([`store`])
//! - the generic ordered tree, cursor, editor, and diff walk ([`tree`])
//! - typed tuples and their comparators ([`tuple`])
//! - the multi-column range engine ([`range`]) and Z-order spatial
//!   ranges ([`zorder`])
//! - the two public map flavors: [`AddressMap`] and [`TupleMap`]
//!
//! Storage I/O is async; traversal of in-memory nodes is synchronous.
//! Dropping any in-flight future cancels cleanly — nodes are written only
//! once complete, so a cancelled flush leaves the base tree untouched.

pub mod address_map;
pub mod chunker;
pub mod format;
pub mod map;
pub mod range;
pub mod store;
pub mod tree;
pub mod tuple;
pub mod zorder;

pub use address_map::{AddressMap, AddressMapEditor};
pub use format::{Node, NodeBuilder};
pub use map::{TupleMap, TupleMapEditor};
pub use range::{
    closed_range, greater_or_equal_range, greater_range, lesser_or_equal_range, lesser_range,
    merge_overlapping_ranges, open_range, open_start_range, open_stop_range, sort_ranges,
    split_nulls_from_range, split_nulls_from_ranges, Range, RangeCut,
};
pub use store::{FormatId, NodeStore, NodeStoreConfig};
pub use tree::cursor::Cursor;
pub use tree::diff::{chunk_address_diff, relate_table_versions};
pub use tree::editor::Editor;
pub use tree::{KeyOrder, Lexicographic, StaticMap};
pub use tuple::{FieldType, Tuple, TupleBuilder, TupleDesc, TypeTag};
pub use zorder::{spatial_ranges, split_z_ranges, z_mask, z_value, Cell, ZRange, CELL_LEN};
