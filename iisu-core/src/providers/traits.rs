use async_trait::async_trait;
use iisu_model::{ArtworkOption, PlatformKey, ProviderId};

use crate::error::ArtError;

/// Why a provider lookup failed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The API answered with an unexpected error.
    #[error("API error: {0}")]
    ApiError(String),

    /// The API has no such resource.
    #[error("Not found")]
    NotFound,

    /// The API asked us to slow down.
    #[error("Rate limited")]
    RateLimited,

    /// The key was rejected.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Transport failure.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response did not decode.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The download cache failed.
    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<ArtError> for ProviderError {
    fn from(err: ArtError) -> Self {
        match err {
            ArtError::Http(e) => ProviderError::NetworkError(e),
            ArtError::HttpStatus { status, url } => match status.as_u16() {
                401 | 403 => ProviderError::InvalidApiKey,
                404 => ProviderError::NotFound,
                429 => ProviderError::RateLimited,
                _ => ProviderError::ApiError(format!("HTTP {status} for {url}")),
            },
            ArtError::Json(e) => ProviderError::ParseError(e.to_string()),
            ArtError::Cache(msg) => ProviderError::Cache(msg),
            other => ProviderError::ApiError(other.to_string()),
        }
    }
}

/// What a provider is asked to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkRequest {
    /// Platform being scraped.
    pub platform: PlatformKey,
    /// Title as searched for.
    pub title: String,
    /// Lowercase platform names used to rank search hits.
    pub hints: Vec<String>,
}

impl ArtworkRequest {
    /// Request for `title` on `platform` with no hints.
    pub fn new(platform: PlatformKey, title: impl Into<String>) -> Self {
        Self {
            platform,
            title: title.into(),
            hints: Vec::new(),
        }
    }

    /// Replace the platform hints.
    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }
}

/// An artwork source. Only `fetch_icon` is required; the other slots
/// default to "nothing available".
#[async_trait]
pub trait ArtworkProvider: Send + Sync {
    /// Stable identifier used in config and logs.
    fn id(&self) -> ProviderId;

    /// The best single icon for `req`, if any.
    async fn fetch_icon(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError>;

    /// Up to `max` icon options. Defaults to the single best icon.
    async fn fetch_icon_options(
        &self,
        req: &ArtworkRequest,
        max: usize,
    ) -> Result<Vec<ArtworkOption>, ProviderError> {
        if max == 0 {
            return Ok(Vec::new());
        }
        Ok(self.fetch_icon(req).await?.into_iter().collect())
    }

    /// The title logo, if the provider has logos.
    async fn fetch_logo(
        &self,
        _req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        Ok(None)
    }

    /// Up to `count` hero banners.
    async fn fetch_heroes(
        &self,
        _req: &ArtworkRequest,
        _count: usize,
    ) -> Result<Vec<ArtworkOption>, ProviderError> {
        Ok(Vec::new())
    }

    /// Up to `count` screenshots.
    async fn fetch_screenshots(
        &self,
        _req: &ArtworkRequest,
        _count: usize,
    ) -> Result<Vec<ArtworkOption>, ProviderError> {
        Ok(Vec::new())
    }
}
