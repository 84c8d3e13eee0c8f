use std::{
    fmt,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use cacache::Integrity;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{ArtError, Result};

/// Root directory managed by `cacache` (index plus content blobs).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheRoot(PathBuf);

impl CacheRoot {
    /// Wrap a cache directory.
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    /// The cache directory.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for CacheRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheRoot").field(&self.0).finish()
    }
}

/// Namespaced cache key such as `icon:<sha256 of url>`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    /// Wrap an already-namespaced key.
    pub fn new(key: String) -> Self {
        Self(key)
    }

    /// Key for a downloaded asset: namespace plus the hex digest of the URL.
    pub fn for_url(namespace: &str, url: &str) -> Self {
        Self(format!("{namespace}:{}", sha256_hex(url)))
    }

    /// The raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlobKey").field(&self.0).finish()
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase hex SHA-256 of `text`.
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// What a write stored.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Subresource integrity of the written bytes.
    pub integrity: Integrity,
    /// Number of bytes written.
    pub byte_len: usize,
}

/// Index entry for a cached blob.
#[derive(Debug, Clone)]
pub struct BlobMeta {
    /// Subresource integrity of the cached bytes.
    pub integrity: Integrity,
    /// Stored size in bytes.
    pub byte_len: usize,
    /// When the entry was written.
    pub written_at: SystemTime,
}

/// Typed wrapper over `cacache` for downloaded artwork and API indexes.
#[derive(Clone, Debug)]
pub struct BlobStore {
    root: CacheRoot,
}

impl BlobStore {
    /// Store rooted at `root`.
    pub fn new(root: CacheRoot) -> Self {
        Self { root }
    }

    /// The cache directory.
    pub fn root(&self) -> &CacheRoot {
        &self.root
    }

    /// Index entry for `key`, if cached.
    pub async fn metadata(&self, key: &BlobKey) -> Result<Option<BlobMeta>> {
        let meta = cacache::metadata(self.root.as_path(), key.as_str())
            .await
            .map_err(|e| ArtError::Cache(format!("metadata failed: {e}")))?;

        Ok(meta.map(|m| {
            // `cacache` stores unix millis in `time`.
            let millis = u64::try_from(m.time).unwrap_or(u64::MAX);
            BlobMeta {
                integrity: m.integrity,
                byte_len: m.size,
                written_at: UNIX_EPOCH + Duration::from_millis(millis),
            }
        }))
    }

    /// Cached bytes for `key`. Missing entries are `None`; entries that fail
    /// their integrity check are evicted and also reported as `None`.
    pub async fn read(&self, key: &BlobKey) -> Result<Option<Vec<u8>>> {
        match cacache::read(self.root.as_path(), key.as_str()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(
                err @ (cacache::Error::IntegrityError(_)
                | cacache::Error::SizeMismatch(_, _)),
            ) => {
                warn!("[blob_store] evicting corrupt entry {}: {}", key, err);
                self.remove(key).await?;
                Ok(None)
            }
            Err(cacache::Error::IoError(err, msg)) => {
                // A dangling index entry whose content file vanished.
                if err.kind() == std::io::ErrorKind::NotFound {
                    self.remove(key).await?;
                    return Ok(None);
                }
                Err(ArtError::Cache(format!("read I/O error: {msg}")))
            }
            Err(cacache::Error::SerdeError(_, msg)) => {
                Err(ArtError::Cache(format!("read serde error: {msg}")))
            }
        }
    }

    /// Like [`BlobStore::read`] but ignores entries older than `max_age`.
    pub async fn read_fresh(
        &self,
        key: &BlobKey,
        max_age: Duration,
    ) -> Result<Option<Vec<u8>>> {
        let Some(meta) = self.metadata(key).await? else {
            return Ok(None);
        };
        let age = SystemTime::now()
            .duration_since(meta.written_at)
            .unwrap_or_default();
        if age > max_age {
            return Ok(None);
        }
        self.read(key).await
    }

    /// Store `bytes` under `key`, replacing any previous entry.
    pub async fn write(&self, key: &BlobKey, bytes: &[u8]) -> Result<StoredBlob> {
        let integrity = cacache::write(self.root.as_path(), key.as_str(), bytes)
            .await
            .map_err(|e| ArtError::Cache(format!("write failed: {e}")))?;
        Ok(StoredBlob {
            integrity,
            byte_len: bytes.len(),
        })
    }

    /// Drop the index entry and its content.
    pub async fn remove(&self, key: &BlobKey) -> Result<()> {
        cacache::index::RemoveOpts::new()
            .remove_fully(true)
            .remove(self.root.as_path(), key.as_str())
            .await
            .map_err(|e| ArtError::Cache(format!("remove failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_keys_are_namespaced_digests() {
        let key = BlobKey::for_url("icon", "https://example.com/a.png");
        let (ns, digest) = key.as_str().split_once(':').unwrap();
        assert_eq!(ns, "icon");
        assert_eq!(digest.len(), 64);
        assert_eq!(key, BlobKey::for_url("icon", "https://example.com/a.png"));
        assert_ne!(key, BlobKey::for_url("hero", "https://example.com/a.png"));
    }

    #[tokio::test]
    async fn write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(CacheRoot::new(dir.path().to_path_buf()));
        let key = BlobKey::new("index:test".into());

        assert!(store.read(&key).await.unwrap().is_none());
        store.write(&key, b"payload").await.unwrap();
        assert_eq!(store.read(&key).await.unwrap().as_deref(), Some(&b"payload"[..]));

        let fresh = store
            .read_fresh(&key, Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(fresh.is_some());

        store.remove(&key).await.unwrap();
        assert!(store.read(&key).await.unwrap().is_none());
    }
}
