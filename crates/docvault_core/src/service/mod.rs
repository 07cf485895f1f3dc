//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate item store and revision ledger calls into composite,
//!   transactional operations.
//! - Keep request layers decoupled from storage details.

pub mod coordinator;
pub mod error;

pub use coordinator::{
    BlobReleaseFailure, ContentChange, DeleteReport, MutationCoordinator, NewDocumentContent,
    NewItem, MAX_ANCESTOR_DEPTH,
};
pub use error::{CoordinatorError, CoordinatorResult, ErrorKind};
