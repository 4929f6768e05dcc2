//! Schema introspection for the work-item table.

use super::Database;
use crate::error::EngineResult;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

/// Table holding the flat work-item rows.
pub const WORK_ITEMS_TABLE: &str = "work_items";

/// Columns the tree engine reads and writes.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "id",
    "project_id",
    "parent_id",
    "depth",
    "ancestor_1",
    "ancestor_2",
    "ancestor_3",
    "ancestor_4",
];

/// Information about a table column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

/// Information about an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Shape of one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
}

impl TableInfo {
    /// Required engine columns absent from this table.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| !self.columns.iter().any(|c| c.name == *name))
            .collect()
    }
}

impl Database {
    /// Describe the work-item table.
    pub fn work_items_table(&self) -> EngineResult<TableInfo> {
        self.with_conn(|conn| Ok(describe_table(conn, WORK_ITEMS_TABLE)?))
    }

    /// SQLite library version, for diagnostics.
    pub fn sqlite_version(&self) -> EngineResult<String> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?))
    }
}

/// Read a table's shape through the `pragma_*` table-valued functions.
/// Only indexes created by `CREATE INDEX` are listed.
fn describe_table(conn: &Connection, table: &str) -> rusqlite::Result<TableInfo> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk
         FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let columns = stmt
        .query_map(params![table], |row| {
            Ok(ColumnInfo {
                name: row.get("name")?,
                data_type: row.get::<_, String>("type")?.to_uppercase(),
                nullable: !row.get::<_, bool>("notnull")?,
                default_value: row.get("dflt_value")?,
                primary_key: row.get::<_, i64>("pk")? > 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT name, \"unique\" FROM pragma_index_list(?1) WHERE origin = 'c' ORDER BY name",
    )?;
    let listed = stmt
        .query_map(params![table], |row| {
            Ok((row.get::<_, String>("name")?, row.get::<_, bool>("unique")?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut key_stmt = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
    let mut indexes = Vec::with_capacity(listed.len());
    for (name, unique) in listed {
        let columns = key_stmt
            .query_map(params![name], |row| row.get("name"))?
            .collect::<Result<Vec<String>, _>>()?;
        indexes.push(IndexInfo {
            name,
            unique,
            columns,
        });
    }

    Ok(TableInfo {
        name: table.to_string(),
        columns,
        indexes,
    })
}
