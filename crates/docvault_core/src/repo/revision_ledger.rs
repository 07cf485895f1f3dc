//! Revision ledger contract and SQLite implementation.
//!
//! # Responsibility
//! - Append-only history of superseded inline document content.
//! - Allocate per-document versions.
//!
//! # Invariants
//! - A new snapshot gets `latest_version(document_id) + 1`.
//! - `(document_id, version)` is unique; a second writer racing for the same
//!   version fails with `StoreError::VersionConflict` instead of duplicating.
//! - Listing is ordered by `version DESC` and never loads content bodies.

use crate::model::item::now_epoch_ms;
use crate::model::{ItemId, Revision, RevisionId, RevisionMeta};
use crate::repo::{bool_to_int, ensure_store_ready, parse_bool, parse_uuid};
use crate::repo::{StoreError, StoreResult};
use rusqlite::{params, Connection, ErrorCode, Row};
use uuid::Uuid;

/// Repository interface for document revision history.
pub trait RevisionLedger {
    /// Highest version recorded for the document, `0` when none exist.
    fn latest_version(&self, document_id: ItemId) -> StoreResult<u32>;
    /// Appends a snapshot of content that was current at `saved_at`.
    fn snapshot(
        &self,
        document_id: ItemId,
        content: &str,
        is_markdown: bool,
        saved_at: i64,
    ) -> StoreResult<Revision>;
    /// Lists revision metadata, newest version first.
    fn list(&self, document_id: ItemId) -> StoreResult<Vec<RevisionMeta>>;
    /// Loads one revision including its content.
    fn get(&self, revision_id: RevisionId) -> StoreResult<Option<Revision>>;
    /// Removes every revision owned by the given documents. Returns the count.
    fn delete_for_documents(&self, document_ids: &[ItemId]) -> StoreResult<usize>;
}

/// SQLite-backed revision ledger.
pub struct SqliteRevisionLedger<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRevisionLedger<'conn> {
    /// Creates a ledger from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_ready(conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn bind(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RevisionLedger for SqliteRevisionLedger<'_> {
    fn latest_version(&self, document_id: ItemId) -> StoreResult<u32> {
        let version: u32 = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0)
             FROM revisions
             WHERE document_id = ?1;",
            [document_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    fn snapshot(
        &self,
        document_id: ItemId,
        content: &str,
        is_markdown: bool,
        saved_at: i64,
    ) -> StoreResult<Revision> {
        let version = self.latest_version(document_id)? + 1;
        let revision = Revision {
            id: Uuid::new_v4(),
            document_id,
            content: content.to_string(),
            is_markdown,
            version,
            saved_at,
            archived_at: now_epoch_ms(),
        };

        let inserted = self.conn.execute(
            "INSERT INTO revisions (
                id,
                document_id,
                content,
                is_markdown,
                version,
                saved_at,
                archived_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                revision.id.to_string(),
                document_id.to_string(),
                revision.content.as_str(),
                bool_to_int(is_markdown),
                revision.version,
                revision.saved_at,
                revision.archived_at,
            ],
        );

        match inserted {
            Ok(_) => Ok(revision),
            Err(err) if is_unique_violation(&err) => Err(StoreError::VersionConflict {
                document_id,
                version,
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self, document_id: ItemId) -> StoreResult<Vec<RevisionMeta>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                document_id,
                is_markdown,
                version,
                saved_at,
                archived_at
             FROM revisions
             WHERE document_id = ?1
             ORDER BY version DESC;",
        )?;
        let mut rows = stmt.query([document_id.to_string()])?;
        let mut revisions = Vec::new();
        while let Some(row) = rows.next()? {
            revisions.push(parse_revision_meta_row(row)?);
        }
        Ok(revisions)
    }

    fn get(&self, revision_id: RevisionId) -> StoreResult<Option<Revision>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                document_id,
                content,
                is_markdown,
                version,
                saved_at,
                archived_at
             FROM revisions
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([revision_id.to_string()])?;
        if let Some(row) = rows.next()? {
            let meta = parse_revision_meta_row(row)?;
            return Ok(Some(Revision {
                id: meta.id,
                document_id: meta.document_id,
                content: row.get("content")?,
                is_markdown: meta.is_markdown,
                version: meta.version,
                saved_at: meta.saved_at,
                archived_at: meta.archived_at,
            }));
        }
        Ok(None)
    }

    fn delete_for_documents(&self, document_ids: &[ItemId]) -> StoreResult<usize> {
        let mut stmt = self
            .conn
            .prepare("DELETE FROM revisions WHERE document_id = ?1;")?;
        let mut removed = 0;
        for document_id in document_ids {
            removed += stmt.execute([document_id.to_string()])?;
        }
        Ok(removed)
    }
}

fn parse_revision_meta_row(row: &Row<'_>) -> StoreResult<RevisionMeta> {
    let id_text: String = row.get("id")?;
    let document_text: String = row.get("document_id")?;
    let version: u32 = row.get("version")?;
    if version == 0 {
        return Err(StoreError::InvalidData(format!(
            "revision {id_text} has non-positive version"
        )));
    }

    Ok(RevisionMeta {
        id: parse_uuid(&id_text, "revisions.id")?,
        document_id: parse_uuid(&document_text, "revisions.document_id")?,
        is_markdown: parse_bool(row.get("is_markdown")?, "revisions.is_markdown")?,
        version,
        saved_at: row.get("saved_at")?,
        archived_at: row.get("archived_at")?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => {
            inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
