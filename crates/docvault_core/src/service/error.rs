//! Coordinator error taxonomy.

use crate::blob::BlobError;
use crate::db::DbError;
use crate::model::{ItemId, RevisionId, ValidationError};
use crate::repo::StoreError;
use crate::search::fts::SearchError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Boundary classification of a [`CoordinatorError`].
///
/// Request layers translate these into their own representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, rejected before any store access.
    Validation,
    /// Referenced item or revision does not exist.
    NotFound,
    /// Request contradicts hierarchy or history invariants.
    Conflict,
    /// Operation is not defined for the document's storage mode.
    UnsupportedOperation,
    /// Blob adapter failure.
    StorageBackend,
    /// Store or driver failure outside the named kinds.
    Internal,
}

/// Errors from coordinator operations.
#[derive(Debug)]
pub enum CoordinatorError {
    Validation(ValidationError),
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Requested parent does not exist.
    ParentNotFound(ItemId),
    /// Target does not exist or is not a document.
    DocumentNotFound(ItemId),
    RevisionNotFound(RevisionId),
    /// Requested parent exists but is a document.
    ParentMustBeCategory(ItemId),
    /// Reparenting would make the item its own ancestor.
    CycleDetected { item_id: ItemId, parent_id: ItemId },
    /// Target parent sits below more than `limit` ancestors.
    AncestorChainTooDeep { parent_id: ItemId, limit: usize },
    /// Revision belongs to a different document.
    RevisionMismatch {
        revision_id: RevisionId,
        document_id: ItemId,
    },
    /// Concurrent writer already appended this version.
    VersionConflict { document_id: ItemId, version: u32 },
    /// Content edits and reverts are undefined for external-blob documents.
    ExternalBlobDocument(ItemId),
    StorageBackend(BlobError),
    Store(StoreError),
    Search(SearchError),
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::ItemNotFound(_)
            | Self::ParentNotFound(_)
            | Self::DocumentNotFound(_)
            | Self::RevisionNotFound(_) => ErrorKind::NotFound,
            Self::ParentMustBeCategory(_)
            | Self::CycleDetected { .. }
            | Self::AncestorChainTooDeep { .. }
            | Self::RevisionMismatch { .. }
            | Self::VersionConflict { .. } => ErrorKind::Conflict,
            Self::ExternalBlobDocument(_) => ErrorKind::UnsupportedOperation,
            Self::StorageBackend(_) => ErrorKind::StorageBackend,
            Self::Search(SearchError::InvalidQuery { .. }) => ErrorKind::Validation,
            Self::Store(_) | Self::Search(_) => ErrorKind::Internal,
        }
    }
}

impl Display for CoordinatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent not found: {id}"),
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::RevisionNotFound(id) => write!(f, "revision not found: {id}"),
            Self::ParentMustBeCategory(id) => write!(f, "parent must be a category: {id}"),
            Self::CycleDetected { item_id, parent_id } => write!(
                f,
                "move would create cycle: item {item_id} under parent {parent_id}"
            ),
            Self::AncestorChainTooDeep { parent_id, limit } => write!(
                f,
                "parent {parent_id} is nested deeper than {limit} levels"
            ),
            Self::RevisionMismatch {
                revision_id,
                document_id,
            } => write!(
                f,
                "revision {revision_id} does not belong to document {document_id}"
            ),
            Self::VersionConflict {
                document_id,
                version,
            } => write!(
                f,
                "concurrent revision {version} already recorded for document {document_id}"
            ),
            Self::ExternalBlobDocument(id) => {
                write!(f, "document {id} is stored as an external blob")
            }
            Self::StorageBackend(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StorageBackend(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Search(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::VersionConflict {
                document_id,
                version,
            } => Self::VersionConflict {
                document_id,
                version,
            },
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

impl From<ValidationError> for CoordinatorError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<BlobError> for CoordinatorError {
    fn from(value: BlobError) -> Self {
        Self::StorageBackend(value)
    }
}

impl From<SearchError> for CoordinatorError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}

impl From<rusqlite::Error> for CoordinatorError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(StoreError::Db(DbError::Sqlite(value)))
    }
}
