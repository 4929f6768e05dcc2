//! In-memory record store.

use super::{RecordStore, StoreError, StoreResult};
use crate::types::{ItemId, NewItem, ProjectId, RowPatch, WorkItem};
use std::collections::{BTreeMap, BTreeSet};

/// Operation that [`MemoryStore`] can be told to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Insert,
    Update,
    BulkDelete,
}

impl FailPoint {
    fn as_str(self) -> &'static str {
        match self {
            FailPoint::Insert => "insert",
            FailPoint::Update => "update",
            FailPoint::BulkDelete => "bulk_delete",
        }
    }
}

/// `BTreeMap`-backed store with sequential ids starting at 1.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    rows: BTreeMap<ItemId, WorkItem>,
    next_id: ItemId,
    fail_next: Option<FailPoint>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            fail_next: None,
        }
    }

    /// Make the next call of `point` fail with [`StoreError::Injected`].
    pub fn fail_next(&mut self, point: FailPoint) {
        self.fail_next = Some(point);
    }

    /// Put a row in verbatim, bypassing the engine. Used to seed data that
    /// predates (or violates) the ancestor-pointer invariant.
    pub fn insert_raw(&mut self, item: WorkItem) {
        self.next_id = self.next_id.max(item.id + 1);
        self.rows.insert(item.id, item);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> BTreeSet<ItemId> {
        self.rows.keys().copied().collect()
    }

    /// Run `f` against this store; on error, restore the state from before the
    /// call.
    pub fn atomically<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        let rows = self.rows.clone();
        let next_id = self.next_id;
        let result = f(self);
        if result.is_err() {
            self.rows = rows;
            self.next_id = next_id;
        }
        result
    }

    fn check(&mut self, point: FailPoint) -> StoreResult<()> {
        if self.fail_next == Some(point) {
            self.fail_next = None;
            return Err(StoreError::Injected(point.as_str()));
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: ItemId) -> StoreResult<Option<WorkItem>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn get_all_by_project(&self, project_id: ProjectId) -> StoreResult<Vec<WorkItem>> {
        Ok(self
            .rows
            .values()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    fn insert(&mut self, row: &NewItem) -> StoreResult<ItemId> {
        self.check(FailPoint::Insert)?;
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(
            id,
            WorkItem {
                id,
                project_id: row.project_id,
                parent_id: row.parent_id,
                depth: row.depth,
                ancestors: row.ancestors,
                payload: row.payload.clone(),
                estimate_prev: None,
                created_at: row.created_at,
                updated_at: row.created_at,
            },
        );
        Ok(id)
    }

    fn update(&mut self, id: ItemId, patch: &RowPatch) -> StoreResult<bool> {
        self.check(FailPoint::Update)?;
        match self.rows.get_mut(&id) {
            Some(item) => {
                patch.apply_to(item);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn bulk_delete(&mut self, ids: &BTreeSet<ItemId>) -> StoreResult<usize> {
        self.check(FailPoint::BulkDelete)?;
        let before = self.rows.len();
        self.rows.retain(|id, _| !ids.contains(id));
        Ok(before - self.rows.len())
    }
}
