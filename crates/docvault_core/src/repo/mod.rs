//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the item store and revision ledger contracts.
//! - Isolate SQLite query details from coordinator orchestration.
//!
//! # Invariants
//! - Item writes call `Item::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories hold no business rules beyond identity, uniqueness and
//!   version allocation; hierarchy rules live in the coordinator.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::{ItemId, ValidationError};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod item_store;
pub mod revision_ledger;

pub use item_store::{ItemStore, SqliteItemStore};
pub use revision_ledger::{RevisionLedger, SqliteRevisionLedger};

/// Result type shared by item store and revision ledger operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence error for item and revision storage.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Record failed model validation before write.
    Validation(ValidationError),
    /// Another writer already appended this version for the document.
    VersionConflict { document_id: ItemId, version: u32 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::VersionConflict {
                document_id,
                version,
            } => write!(
                f,
                "revision version {version} already exists for document {document_id}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "vault store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "vault store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted vault data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Verifies the connection was opened through `db::open_db*`.
pub fn ensure_store_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["items", "item_tags", "revisions"] {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
