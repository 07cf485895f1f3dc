//! Core domain logic for DocVault.
//!
//! A hierarchy of categories and documents persisted in SQLite, with an
//! append-only revision history for inline document content.

pub mod blob;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod tree;

pub use blob::{BlobAdapter, BlobError, BlobResult, FsBlobStore, MemoryBlobStore};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{
    parse_item_id, parse_revision_id, Document, DocumentContent, ExternalRef, Item, ItemBody,
    ItemId, ItemKind, Revision, RevisionId, RevisionMeta, StorageMode, ValidationError,
};
pub use repo::{
    ItemStore, RevisionLedger, SqliteItemStore, SqliteRevisionLedger, StoreError, StoreResult,
};
pub use search::fts::{search_documents, SearchError, SearchHit, SearchQuery, SEARCH_DEFAULT_LIMIT};
pub use service::{
    BlobReleaseFailure, ContentChange, CoordinatorError, CoordinatorResult, DeleteReport,
    ErrorKind, MutationCoordinator, NewDocumentContent, NewItem, MAX_ANCESTOR_DEPTH,
};
pub use tree::{build_forest, TreeNode};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
