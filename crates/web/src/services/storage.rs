//! Object storage for uploaded issue photos.
//!
//! Objects are addressed by a relative path such as `issues/<uuid>.jpg` and
//! exposed to browsers through [`ObjectStorage::public_url`].

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

/// URL prefix under which the local backend's files are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage backend for uploaded files.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` at `path`, replacing anything already there.
    async fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Browser-reachable URL of the object at `path`.
    fn public_url(&self, path: &str) -> String;
}

/// Reject absolute paths and any `..` or `.` segment.
fn validate_object_path(path: &str) -> Result<&Path, StorageError> {
    let candidate = Path::new(path);
    let is_clean = !path.is_empty()
        && candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if is_clean {
        Ok(candidate)
    } else {
        Err(StorageError::InvalidPath(path.to_owned()))
    }
}

/// Files under a directory on local disk, served at [`UPLOADS_URL_PREFIX`].
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
}

impl LocalObjectStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let target = self.root.join(validate_object_path(path)?);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, data).await?;

        tracing::debug!(path, content_type, bytes = data.len(), "Stored upload");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{UPLOADS_URL_PREFIX}/{path}")
    }
}

/// A stored object, as kept by [`MemoryObjectStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Process-local storage used by tests and the memory backend.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
    fail_uploads: AtomicBool,
}

impl MemoryObjectStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub async fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.read().await.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        validate_object_path(path)?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("upload rejected".to_owned()));
        }
        self.objects.write().await.insert(
            path.to_owned(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_owned(),
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{UPLOADS_URL_PREFIX}/{path}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_object_path() {
        assert!(validate_object_path("issues/a.jpg").is_ok());
        assert!(validate_object_path("").is_err());
        assert!(validate_object_path("../etc/passwd").is_err());
        assert!(validate_object_path("/abs/path.png").is_err());
        assert!(validate_object_path("issues/./a.png").is_ok());
    }

    #[tokio::test]
    async fn test_local_upload_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path());

        storage
            .upload("issues/photo.png", b"png-bytes", "image/png")
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("issues/photo.png")).unwrap();
        assert_eq!(written, b"png-bytes");
        assert_eq!(storage.public_url("issues/photo.png"), "/uploads/issues/photo.png");
    }

    #[tokio::test]
    async fn test_local_upload_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path());
        let err = storage.upload("../escape.png", b"x", "image/png").await;
        assert!(matches!(err, Err(StorageError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_memory_storage_can_fail() {
        let storage = MemoryObjectStorage::new();
        storage.upload("issues/a.gif", b"gif", "image/gif").await.unwrap();
        assert_eq!(storage.len().await, 1);

        storage.fail_uploads(true);
        assert!(storage.upload("issues/b.gif", b"gif", "image/gif").await.is_err());
        assert_eq!(storage.get("issues/a.gif").await.unwrap().content_type, "image/gif");
    }
}
