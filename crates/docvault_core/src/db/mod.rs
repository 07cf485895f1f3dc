//! Vault database bootstrap.
//!
//! One vault file is shared by several independent connections (CLI runs,
//! embedders, test threads). None of them coordinates in process; SQLite's
//! file lock is the only arbiter between writers.
//!
//! # Responsibility
//! - Hand out connections that are safe to use against a shared vault file.
//! - Bring the schema to the newest embedded version before first use.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the number of applied migrations.
//! - A file written by a newer build is refused rather than downgraded.
//! - Migrations and coordinator writes begin `IMMEDIATE`, so a second writer
//!   queues on the lock for up to [`BUSY_TIMEOUT`] instead of failing
//!   mid-transaction.
//! - Readers never open a transaction and never take the write lock.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating a vault file.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "vault schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
