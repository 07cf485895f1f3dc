//! Revision domain model.
//!
//! # Invariants
//! - Revisions are immutable once appended.
//! - `version` starts at 1 and strictly increases per `document_id`.
//! - `saved_at` is when the captured content was current, not when it was
//!   archived; `archived_at` records the latter.

use crate::model::item::ItemId;
use serde::{Deserialize, Serialize};

/// Stable identifier for one revision.
pub type RevisionId = uuid::Uuid;

/// Historical snapshot of a document's inline content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    /// Back-reference to the owning document.
    pub document_id: ItemId,
    pub content: String,
    pub is_markdown: bool,
    pub version: u32,
    /// Unix epoch milliseconds.
    pub saved_at: i64,
    /// Unix epoch milliseconds.
    pub archived_at: i64,
}

/// Revision listing entry without the content body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMeta {
    pub id: RevisionId,
    pub document_id: ItemId,
    pub is_markdown: bool,
    pub version: u32,
    pub saved_at: i64,
    pub archived_at: i64,
}

impl Revision {
    pub fn meta(&self) -> RevisionMeta {
        RevisionMeta {
            id: self.id,
            document_id: self.document_id,
            is_markdown: self.is_markdown,
            version: self.version,
            saved_at: self.saved_at,
            archived_at: self.archived_at,
        }
    }
}
