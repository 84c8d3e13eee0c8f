//! On-disk caching of downloaded artwork and provider indexes.

/// `cacache` storage wrapper
pub mod blob_store;

use iisu_model::ArtworkKind;
use tracing::debug;

use crate::error::Result;
use crate::http::HttpFetcher;

pub use blob_store::{
    BlobKey, BlobMeta, BlobStore, CacheRoot, StoredBlob, sha256_hex,
};

/// Read-through download cache keyed by asset kind and URL.
#[derive(Clone, Debug)]
pub struct CachedDownloader {
    http: HttpFetcher,
    store: BlobStore,
}

impl CachedDownloader {
    /// Cache downloads from `http` in `store`.
    pub fn new(http: HttpFetcher, store: BlobStore) -> Self {
        Self { http, store }
    }

    /// The underlying fetcher.
    pub fn http(&self) -> &HttpFetcher {
        &self.http
    }

    /// The underlying store.
    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    /// Cached bytes for `url`, downloading and storing them on a miss.
    pub async fn fetch(&self, kind: ArtworkKind, url: &str) -> Result<Vec<u8>> {
        let key = BlobKey::for_url(kind.cache_namespace(), url);
        if let Some(bytes) = self.store.read(&key).await? {
            debug!("[cache] hit {} for {}", key, url);
            return Ok(bytes);
        }

        let bytes = self.http.get_bytes(url).await?;
        if !bytes.is_empty() {
            self.store.write(&key, &bytes).await?;
        }
        Ok(bytes)
    }
}
