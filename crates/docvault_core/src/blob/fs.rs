//! Filesystem blob adapter.
//!
//! Each blob is one file directly under the store root, named by its key.

use crate::blob::{BlobAdapter, BlobError, BlobResult};
use crate::model::ExternalRef;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MAX_NAME_CHARS: usize = 96;

static UNSAFE_NAME_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid file name regex"));

/// Blob store backed by a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Opens (creating if needed) a blob directory.
    pub fn open(root: impl AsRef<Path>) -> BlobResult<Self> {
        let root = root.as_ref();
        let io_error = |source| BlobError::Io {
            key: root.display().to_string(),
            source,
        };
        std::fs::create_dir_all(root).map_err(io_error)?;
        let root = std::fs::canonicalize(root).map_err(io_error)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        if key.is_empty() || key.starts_with('.') || UNSAFE_NAME_CHARS_RE.is_match(key) {
            return Err(BlobError::Rejected(format!("invalid blob key `{key}`")));
        }
        Ok(self.root.join(key))
    }
}

impl BlobAdapter for FsBlobStore {
    fn upload(&self, bytes: &[u8], name: &str, mime_type: &str) -> BlobResult<ExternalRef> {
        let key = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(name));
        let path = self.path_for(&key)?;
        std::fs::write(&path, bytes).map_err(|source| BlobError::Io {
            key: key.clone(),
            source,
        })?;
        debug!(
            "event=blob_upload module=blob status=ok backend=fs size={}",
            bytes.len()
        );

        Ok(ExternalRef {
            url: format!("file://{}", path.display()),
            key,
            original_name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
        })
    }

    fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(BlobError::NotFound(key.to_string()))
            }
            Err(source) => Err(BlobError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Maps an uploaded file name onto a safe key suffix.
fn sanitize_file_name(name: &str) -> String {
    let replaced = UNSAFE_NAME_CHARS_RE.replace_all(name.trim(), "_");
    let trimmed = replaced.trim_start_matches('.');
    let limited: String = trimmed.chars().take(MAX_NAME_CHARS).collect();
    if limited.is_empty() {
        "blob".to_string()
    } else {
        limited
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_file_name, FsBlobStore};
    use crate::blob::{BlobAdapter, BlobError};

    #[test]
    fn sanitize_file_name_strips_path_and_unsafe_chars() {
        assert_eq!(sanitize_file_name("../etc/passwd"), "_etc_passwd");
        assert_eq!(sanitize_file_name("Quarterly report.pdf"), "Quarterly_report.pdf");
        assert_eq!(sanitize_file_name("..."), "blob");
        assert_eq!(sanitize_file_name("  "), "blob");
    }

    #[test]
    fn upload_writes_file_and_delete_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("blobs")).unwrap();

        let external = store
            .upload(b"%PDF-1.7", "report.pdf", "application/pdf")
            .unwrap();
        let path = store.root().join(&external.key);
        assert!(path.exists());
        assert_eq!(external.size, 8);
        assert_eq!(external.original_name, "report.pdf");
        assert_eq!(external.mime_type, "application/pdf");
        assert!(external.url.starts_with("file://"));
        assert!(external.key.ends_with("-report.pdf"));

        store.delete(&external.key).unwrap();
        assert!(!path.exists());

        let err = store.delete(&external.key).unwrap_err();
        assert!(matches!(err, BlobError::NotFound(_)));
    }

    #[test]
    fn delete_rejects_keys_escaping_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        let err = store.delete("../outside").unwrap_err();
        assert!(matches!(err, BlobError::Rejected(_)));
    }
}
