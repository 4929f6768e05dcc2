//! The tree engine: ancestor-pointer maintenance, subtree deletion and tree
//! reconstruction over flat work-item rows.
//!
//! Every function here is written against [`crate::store::RecordStore`] or
//! against plain row slices, so the same code runs over SQLite and over the
//! in-memory store.

mod ancestors;
mod subtree;
mod tree;
mod update;
mod verify;

pub use ancestors::create_item;
pub use subtree::{DeleteReport, MAX_SCAN_PASSES, SubtreeScan, delete_subtree, find_strays, resolve_subtree};
pub use tree::{SortKey, SortOrder, TreeReport, build_tree, build_tree_report, flatten, sort_tree};
pub use update::update_item;
pub use verify::{Violation, verify_rows};
