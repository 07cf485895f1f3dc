use docvault_core::db::migrations::latest_version;
use docvault_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "items");
    assert_table_exists(&conn, "item_tags");
    assert_table_exists(&conn, "revisions");
    assert_table_exists(&conn, "items_fts");
}

#[test]
fn foreign_keys_are_enabled_on_open() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn reopening_a_vault_file_keeps_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.sqlite3");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_table_exists(&second, "revisions");
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn revisions_enforce_unique_version_per_document() {
    let conn = open_db_in_memory().unwrap();
    let insert = "INSERT INTO revisions (id, document_id, content, is_markdown, version, saved_at, archived_at)
                  VALUES (?1, 'doc', 'x', 1, 1, 0, 0);";
    conn.execute(insert, ["r1"]).unwrap();
    assert!(conn.execute(insert, ["r2"]).is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
