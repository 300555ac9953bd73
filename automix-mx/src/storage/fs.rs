//! Filesystem object-store driver
//!
//! Objects live under a root folder with the key as the relative path;
//! mime is recorded in a `.mime` sidecar so `get` can restore the
//! content type. Keys are validated against path traversal before any
//! filesystem access.

use super::{ObjectStore, StoredObject};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Store driver writing under a local root folder
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path under the root, rejecting traversal
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
        {
            return Err(Error::Storage(format!("invalid object key: {key:?}")));
        }
        Ok(self.root.join(rel))
    }

    fn mime_sidecar(path: &Path) -> PathBuf {
        let mut os = path.as_os_str().to_owned();
        os.push(".mime");
        PathBuf::from(os)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: &[u8], mime: &str) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("mkdir for {key}: {e}")))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::Storage(format!("write {key}: {e}")))?;
        tokio::fs::write(Self::mime_sidecar(&path), mime)
            .await
            .map_err(|e| Error::Storage(format!("write mime for {key}: {e}")))?;
        debug!(key, bytes = bytes.len(), mime, "stored object");
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<StoredObject> {
        let path = self.resolve(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("object {key}")))
            }
            Err(e) => return Err(Error::Storage(format!("read {key}: {e}"))),
        };
        let mime = tokio::fs::read_to_string(Self::mime_sidecar(&path))
            .await
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        Ok(StoredObject { bytes, mime })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Storage(format!("delete {key}: {e}"))),
        }
        let _ = tokio::fs::remove_file(Self::mime_sidecar(&path)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store
            .put("user1/123-song.mp3", b"mp3-bytes", "audio/mpeg")
            .await
            .unwrap();
        let object = store.get("user1/123-song.mp3").await.unwrap();
        assert_eq!(object.bytes, b"mp3-bytes");
        assert_eq!(object.mime, "audio/mpeg");
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(matches!(
            store.get("nope.mp3").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        store.put("a/b.bin", b"x", "application/octet-stream").await.unwrap();
        store.delete("a/b.bin").await.unwrap();
        store.delete("a/b.bin").await.unwrap();
        assert!(store.get("a/b.bin").await.is_err());
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(store.get("../outside").await.is_err());
        assert!(store.put("/abs/path", b"x", "text/plain").await.is_err());
    }
}
