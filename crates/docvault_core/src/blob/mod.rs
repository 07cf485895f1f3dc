//! Blob adapter contract for binary document content.
//!
//! # Responsibility
//! - Define how the coordinator hands binary payloads to external storage.
//! - Provide a filesystem adapter and an in-process adapter.
//!
//! # Invariants
//! - Keys returned by `upload` are the only handle the core keeps; the core
//!   never inspects blob bytes after upload.
//! - Delete failures are reported to the caller, which decides whether they
//!   are fatal. Cascading item deletion treats them as non-fatal.

use crate::model::ExternalRef;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod fs;
pub mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Result type for blob adapter operations.
pub type BlobResult<T> = Result<T, BlobError>;

/// Storage backend failure.
#[derive(Debug)]
pub enum BlobError {
    /// I/O failure while reading or writing the backend.
    Io { key: String, source: std::io::Error },
    /// No blob stored under the key.
    NotFound(String),
    /// Backend refused the request.
    Rejected(String),
}

impl Display for BlobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { key, source } => write!(f, "blob storage I/O failed for `{key}`: {source}"),
            Self::NotFound(key) => write!(f, "blob not found: `{key}`"),
            Self::Rejected(message) => write!(f, "blob storage rejected request: {message}"),
        }
    }
}

impl Error for BlobError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// External storage for binary document content.
pub trait BlobAdapter {
    /// Stores `bytes` and returns the handle recorded on the document.
    fn upload(&self, bytes: &[u8], name: &str, mime_type: &str) -> BlobResult<ExternalRef>;
    /// Releases the blob stored under `key`.
    fn delete(&self, key: &str) -> BlobResult<()>;
}

impl<T: BlobAdapter + ?Sized> BlobAdapter for &T {
    fn upload(&self, bytes: &[u8], name: &str, mime_type: &str) -> BlobResult<ExternalRef> {
        (**self).upload(bytes, name, mime_type)
    }

    fn delete(&self, key: &str) -> BlobResult<()> {
        (**self).delete(key)
    }
}
