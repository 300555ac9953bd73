//! Object store abstraction
//!
//! The service consumes an object store; it does not implement a
//! provider. `ObjectStore` is the capability seam - production deploys a
//! cloud driver behind it, development and tests use the filesystem
//! driver in [`fs`].

pub mod fs;
pub mod keys;

pub use fs::FsObjectStore;

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Stored object with its content type
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Blob storage capability
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under a key, returning the resolvable key
    async fn put(&self, key: &str, bytes: &[u8], mime: &str) -> Result<String>;

    /// Fetch bytes and mime for a key
    async fn get(&self, key: &str) -> Result<StoredObject>;

    /// Delete a key; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Shared handle to the configured store driver
pub type SharedStore = Arc<dyn ObjectStore>;

/// Retry attempts for store operations
const STORE_RETRIES: u32 = 3;

/// Base backoff between store retries
const STORE_BACKOFF: Duration = Duration::from_millis(200);

/// Put with short backoff retries
///
/// Transient store failures are retried a fixed number of times; the
/// last error is surfaced as a storage error.
pub async fn put_with_retry(
    store: &dyn ObjectStore,
    key: &str,
    bytes: &[u8],
    mime: &str,
) -> Result<String> {
    let mut last_err: Option<Error> = None;
    for attempt in 1..=STORE_RETRIES {
        match store.put(key, bytes, mime).await {
            Ok(url) => return Ok(url),
            Err(e) => {
                warn!(key, attempt, error = %e, "object store put failed");
                last_err = Some(e);
                if attempt < STORE_RETRIES {
                    tokio::time::sleep(STORE_BACKOFF * attempt).await;
                }
            }
        }
    }
    Err(Error::Storage(format!(
        "put {key} failed after {STORE_RETRIES} attempts: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Get with short backoff retries
pub async fn get_with_retry(store: &dyn ObjectStore, key: &str) -> Result<StoredObject> {
    let mut last_err: Option<Error> = None;
    for attempt in 1..=STORE_RETRIES {
        match store.get(key).await {
            Ok(object) => return Ok(object),
            Err(e @ Error::NotFound(_)) => return Err(e),
            Err(e) => {
                warn!(key, attempt, error = %e, "object store get failed");
                last_err = Some(e);
                if attempt < STORE_RETRIES {
                    tokio::time::sleep(STORE_BACKOFF * attempt).await;
                }
            }
        }
    }
    Err(Error::Storage(format!(
        "get {key} failed after {STORE_RETRIES} attempts: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}
