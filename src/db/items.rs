//! SQLite record store and transactional engine entry points.

use super::Database;
use crate::engine::{self, DeleteReport, TreeReport, Violation};
use crate::error::EngineResult;
use crate::store::{RecordStore, StoreResult};
use crate::types::{
    Ancestors, Depth, ItemId, ItemPatch, ItemPayload, NewItem, ProjectId, RowPatch, WorkItem,
};
use chrono::NaiveDate;
use rusqlite::types::{FromSqlError, Type};
use rusqlite::{
    Connection, Row, Statement, ToSql, TransactionBehavior, params, params_from_iter,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Upper bound on ids per `DELETE ... IN (...)` statement.
const BULK_DELETE_CHUNK: usize = 500;

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Column `name` held a value that does not decode into its field type.
fn decode_failure<E>(row: &Row, name: &str, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let stmt: &Statement = row.as_ref();
    let idx = stmt.column_index(name).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn json_column<T: DeserializeOwned>(row: &Row, name: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(name)?;
    serde_json::from_str(&raw).map_err(|e| decode_failure(row, name, Type::Text, e))
}

pub fn parse_item_row(row: &Row) -> rusqlite::Result<WorkItem> {
    let id: ItemId = row.get("id")?;
    let project_id: ProjectId = row.get("project_id")?;
    let parent_id: i64 = row.get("parent_id")?;

    let depth_raw: i64 = row.get("depth")?;
    let depth = Depth::try_from(depth_raw).map_err(|_| {
        decode_failure(row, "depth", Type::Integer, FromSqlError::OutOfRange(depth_raw))
    })?;

    let ancestors = Ancestors::new([
        row.get("ancestor_1")?,
        row.get("ancestor_2")?,
        row.get("ancestor_3")?,
        row.get("ancestor_4")?,
    ]);

    let title: String = row.get("title")?;
    let description: Option<String> = row.get("description")?;
    let status: String = row.get("status")?;
    let priority: i32 = row.get("priority")?;
    let assignees: Vec<String> = json_column(row, "assignees")?;
    let estimate_hours: Option<f64> = row.get("estimate_hours")?;
    let estimate_prev: Option<f64> = row.get("estimate_prev")?;
    let due_date = row
        .get::<_, Option<String>>("due_date")?
        .map(|s| NaiveDate::parse_from_str(&s, DUE_DATE_FORMAT))
        .transpose()
        .map_err(|e| decode_failure(row, "due_date", Type::Text, e))?;
    let comments: Vec<String> = json_column(row, "comments")?;

    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;

    Ok(WorkItem {
        id,
        project_id,
        parent_id,
        depth,
        ancestors,
        payload: ItemPayload {
            title,
            description,
            status,
            priority,
            assignees,
            estimate_hours,
            due_date,
            comments,
        },
        estimate_prev,
        created_at,
        updated_at,
    })
}

fn format_due_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DUE_DATE_FORMAT).to_string())
}

/// [`RecordStore`] over a borrowed connection or transaction.
pub struct SqlStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqlStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Distinct project ids that own at least one row.
    pub fn project_ids(&self) -> StoreResult<Vec<ProjectId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT project_id FROM work_items ORDER BY project_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

impl RecordStore for SqlStore<'_> {
    fn get(&self, id: ItemId) -> StoreResult<Option<WorkItem>> {
        let mut stmt = self.conn.prepare("SELECT * FROM work_items WHERE id = ?1")?;

        match stmt.query_row(params![id], parse_item_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_all_by_project(&self, project_id: ProjectId) -> StoreResult<Vec<WorkItem>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM work_items WHERE project_id = ?1 ORDER BY id")?;
        let items = stmt
            .query_map(params![project_id], parse_item_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn insert(&mut self, row: &NewItem) -> StoreResult<ItemId> {
        let [a1, a2, a3, a4] = row.ancestors.slots();
        let p = &row.payload;

        self.conn.execute(
            "INSERT INTO work_items (
                project_id, parent_id, depth,
                ancestor_1, ancestor_2, ancestor_3, ancestor_4,
                title, description, status, priority, assignees,
                estimate_hours, due_date, comments, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
            params![
                row.project_id,
                row.parent_id,
                row.depth.as_i64(),
                a1,
                a2,
                a3,
                a4,
                p.title,
                p.description,
                p.status,
                p.priority,
                serde_json::to_string(&p.assignees)?,
                p.estimate_hours,
                format_due_date(p.due_date),
                serde_json::to_string(&p.comments)?,
                row.created_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update(&mut self, id: ItemId, patch: &RowPatch) -> StoreResult<bool> {
        // Only the columns the patch sets are written; everything else stays as stored.
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ancestors) = patch.ancestors {
            let [a1, a2, a3, a4] = ancestors.slots();
            sets.extend(["ancestor_1", "ancestor_2", "ancestor_3", "ancestor_4"]);
            values.extend([a1, a2, a3, a4].map(|a| Box::new(a) as Box<dyn ToSql>));
        }
        if let Some(ref p) = patch.payload {
            sets.extend([
                "title",
                "description",
                "status",
                "priority",
                "assignees",
                "estimate_hours",
                "due_date",
                "comments",
            ]);
            values.push(Box::new(p.title.clone()));
            values.push(Box::new(p.description.clone()));
            values.push(Box::new(p.status.clone()));
            values.push(Box::new(p.priority));
            values.push(Box::new(serde_json::to_string(&p.assignees)?));
            values.push(Box::new(p.estimate_hours));
            values.push(Box::new(format_due_date(p.due_date)));
            values.push(Box::new(serde_json::to_string(&p.comments)?));
        }
        if let Some(prev) = patch.estimate_prev {
            sets.push("estimate_prev");
            values.push(Box::new(prev));
        }
        if let Some(ts) = patch.updated_at {
            sets.push("updated_at");
            values.push(Box::new(ts));
        }

        if sets.is_empty() {
            return Ok(self.get(id)?.is_some());
        }

        let assignments: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ?{}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE work_items SET {} WHERE id = ?{}",
            assignments.join(", "),
            sets.len() + 1
        );
        values.push(Box::new(id));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
        Ok(changed > 0)
    }

    fn bulk_delete(&mut self, ids: &BTreeSet<ItemId>) -> StoreResult<usize> {
        let ids: Vec<ItemId> = ids.iter().copied().collect();
        let mut deleted = 0;

        // Chunks share the caller's transaction, so the delete stays all-or-nothing.
        for chunk in ids.chunks(BULK_DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            deleted += self.conn.execute(
                &format!("DELETE FROM work_items WHERE id IN ({placeholders})"),
                params_from_iter(chunk.iter()),
            )?;
        }

        Ok(deleted)
    }
}

impl Database {
    /// Create a work item. Insert and self-pointer patch share one transaction.
    pub fn create_item(
        &self,
        project_id: ProjectId,
        parent_id: ItemId,
        depth: i64,
        payload: ItemPayload,
    ) -> EngineResult<WorkItem> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let item = engine::create_item(
                &mut SqlStore::new(&tx),
                project_id,
                parent_id,
                depth,
                payload,
            )?;
            tx.commit()?;
            Ok(item)
        })
    }

    /// Delete an item and its subtree.
    ///
    /// The transaction is IMMEDIATE: the write lock is held from before the
    /// project scan until the bulk delete commits, so no descendant can be
    /// inserted in between.
    pub fn delete_subtree(&self, item_id: ItemId) -> EngineResult<DeleteReport> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let report = engine::delete_subtree(&mut SqlStore::new(&tx), item_id)?;
            tx.commit()?;
            info!(
                item_id,
                deleted_count = report.deleted_count,
                "deleted work item subtree"
            );
            Ok(report)
        })
    }

    /// Edit an item's business fields.
    pub fn update_item(&self, item_id: ItemId, patch: &ItemPatch) -> EngineResult<WorkItem> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let item = engine::update_item(&mut SqlStore::new(&tx), item_id, patch)?;
            tx.commit()?;
            Ok(item)
        })
    }

    /// Get an item by id.
    pub fn get_item(&self, item_id: ItemId) -> EngineResult<Option<WorkItem>> {
        self.with_conn(|conn| Ok(SqlStore::new(conn).get(item_id)?))
    }

    /// All rows of a project, flat, in creation order.
    pub fn list_items(&self, project_id: ProjectId) -> EngineResult<Vec<WorkItem>> {
        self.with_conn(|conn| Ok(SqlStore::new(conn).get_all_by_project(project_id)?))
    }

    /// Projects that currently own rows.
    pub fn project_ids(&self) -> EngineResult<Vec<ProjectId>> {
        self.with_conn(|conn| Ok(SqlStore::new(conn).project_ids()?))
    }

    /// Load a project and rebuild its tree.
    pub fn project_tree(&self, project_id: ProjectId) -> EngineResult<TreeReport> {
        let rows = self.list_items(project_id)?;
        let report = engine::build_tree_report(&rows);
        if !report.orphans.is_empty() {
            warn!(
                project_id,
                orphans = ?report.orphans,
                "rows dropped from tree: parent not found"
            );
        }
        Ok(report)
    }

    /// Check a project's rows against the ancestor-pointer invariant.
    pub fn verify_project(&self, project_id: ProjectId) -> EngineResult<Vec<Violation>> {
        let rows = self.list_items(project_id)?;
        Ok(engine::verify_rows(&rows))
    }
}
