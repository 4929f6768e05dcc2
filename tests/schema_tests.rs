//! Tests for schema introspection functionality.

use task_tree::db::Database;
use task_tree::db::schema::{REQUIRED_COLUMNS, WORK_ITEMS_TABLE};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

#[test]
fn work_items_table_has_engine_columns() {
    let db = setup_db();

    let table = db.work_items_table().expect("Failed to describe table");

    assert_eq!(table.name, WORK_ITEMS_TABLE);
    assert!(
        table.missing_required().is_empty(),
        "missing columns: {:?}",
        table.missing_required()
    );
    assert!(table.columns.len() > REQUIRED_COLUMNS.len());

    let id = table.columns.iter().find(|c| c.name == "id").unwrap();
    assert!(id.primary_key);
    assert_eq!(id.data_type, "INTEGER");
}

#[test]
fn ancestor_columns_default_to_zero() {
    let db = setup_db();
    let table = db.work_items_table().unwrap();

    for name in ["ancestor_1", "ancestor_2", "ancestor_3", "ancestor_4"] {
        let column = table
            .columns
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("{name} should exist"));
        assert!(!column.nullable, "{name} should be NOT NULL");
        assert_eq!(column.default_value.as_deref(), Some("0"));
    }
}

#[test]
fn each_ancestor_column_is_indexed_with_project() {
    let db = setup_db();
    let table = db.work_items_table().unwrap();

    for depth in 1..=4 {
        let column = format!("ancestor_{depth}");
        assert!(
            table
                .indexes
                .iter()
                .any(|idx| idx.columns == vec!["project_id".to_string(), column.clone()]),
            "expected (project_id, {column}) index, got {:?}",
            table.indexes
        );
    }
}

#[test]
fn depth_outside_range_is_refused_by_sqlite() {
    let db = setup_db();

    let result = db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO work_items (project_id, parent_id, depth, title, created_at, updated_at)
             VALUES (1, 1, 5, 'bad', 0, 0)",
            [],
        )?;
        Ok(())
    });

    assert!(result.is_err());
}

#[test]
fn sqlite_version_is_reported() {
    let db = setup_db();
    let version = db.sqlite_version().unwrap();
    assert!(version.starts_with('3'));
}
