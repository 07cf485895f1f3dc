//! Derived hierarchy views.
//!
//! # Responsibility
//! - Turn a flat item snapshot into a nested, ordered forest on demand.
//!
//! # Invariants
//! - Builders are pure: no caching, no store access, no locking.

pub mod forest;

pub use forest::{build_forest, sibling_order, TreeNode};
