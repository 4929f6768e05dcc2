//! Record store interface for flat work-item rows.
//!
//! The engine only needs five primitives from a store. Transactions are the
//! caller's business: [`crate::db::Database`] wraps each engine operation in
//! a SQLite transaction, and [`MemoryStore::atomically`] gives the in-memory
//! store the same all-or-nothing behavior.

mod memory;

pub use memory::{FailPoint, MemoryStore};

use crate::types::{ItemId, NewItem, ProjectId, RowPatch, WorkItem};
use std::collections::BTreeSet;

/// Failures raised by a record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] refinery::Error),

    #[error("encode column: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connection lock poisoned")]
    Poisoned,

    #[error("injected failure in {0}")]
    Injected(&'static str),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage primitives the tree engine is written against.
pub trait RecordStore {
    /// Fetch one row by id.
    fn get(&self, id: ItemId) -> StoreResult<Option<WorkItem>>;

    /// Every row of a project, in creation order.
    fn get_all_by_project(&self, project_id: ProjectId) -> StoreResult<Vec<WorkItem>>;

    /// Insert a row and return its newly assigned id.
    fn insert(&mut self, row: &NewItem) -> StoreResult<ItemId>;

    /// Patch a row in place. Returns `false` if the row does not exist.
    fn update(&mut self, id: ItemId, patch: &RowPatch) -> StoreResult<bool>;

    /// Remove every listed row in one operation, returning how many went away.
    fn bulk_delete(&mut self, ids: &BTreeSet<ItemId>) -> StoreResult<usize>;
}
