//! Full-text search entry points.
//!
//! # Responsibility
//! - Expose document queries backed by the `items_fts` FTS5 index.
//! - Keep result shaping inside core.
//!
//! Indexing needs no explicit call: migration triggers re-index an inline
//! document whenever its name or content is written.

pub mod fts;
