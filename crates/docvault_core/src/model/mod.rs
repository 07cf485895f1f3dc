//! Domain model for the vault hierarchy and its revision history.
//!
//! # Responsibility
//! - Define canonical item/revision records used by core business logic.
//! - Own input normalization and identifier validation.
//!
//! # Invariants
//! - Every item and revision is identified by a stable UUID.
//! - A document's storage mode is encoded in its type and cannot change.
//! - Revisions only ever hold superseded inline content.

pub mod item;
pub mod revision;
pub mod validation;

pub use item::{
    Document, DocumentContent, ExternalRef, Item, ItemBody, ItemId, ItemKind, StorageMode,
};
pub use revision::{Revision, RevisionId, RevisionMeta};
pub use validation::{
    normalize_name, normalize_tags, parse_item_id, parse_revision_id, ValidationError,
};
