//! In-process blob adapter for tests and embedders without external storage.

use crate::blob::{BlobAdapter, BlobError, BlobResult};
use crate::model::ExternalRef;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Blob store keeping payloads in memory.
///
/// Uploads and deletes can be switched to fail to exercise best-effort paths.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs
            .lock()
            .map(|blobs| blobs.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobAdapter for MemoryBlobStore {
    fn upload(&self, bytes: &[u8], name: &str, mime_type: &str) -> BlobResult<ExternalRef> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BlobError::Rejected("uploads disabled".to_string()));
        }

        let key = Uuid::new_v4().to_string();
        self.blobs
            .lock()
            .map_err(|_| BlobError::Rejected("blob map poisoned".to_string()))?
            .insert(key.clone(), bytes.to_vec());

        Ok(ExternalRef {
            url: format!("memory://{key}"),
            key,
            original_name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
        })
    }

    fn delete(&self, key: &str) -> BlobResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Rejected(format!("deletes disabled for `{key}`")));
        }

        self.blobs
            .lock()
            .map_err(|_| BlobError::Rejected("blob map poisoned".to_string()))?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }
}
