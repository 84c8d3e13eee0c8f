use std::time::Duration;

use async_trait::async_trait;
use iisu_model::{ArtworkKind, ArtworkOption, ProviderId, SourceTag};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::CachedDownloader;
use crate::titles::score_candidate;

use super::traits::{ArtworkProvider, ArtworkRequest, ProviderError};

/// Steam store root, used for search.
pub const DEFAULT_STORE_URL: &str = "https://store.steampowered.com";
/// Steam asset CDN root.
pub const DEFAULT_CDN_URL: &str = "https://shared.akamai.steamstatic.com/store_item_assets";

/// Endpoints for [`SteamStoreProvider`].
#[derive(Debug, Clone)]
pub struct SteamStoreSettings {
    /// Store root.
    pub store_url: String,
    /// Asset CDN root.
    pub cdn_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for SteamStoreSettings {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.to_string(),
            cdn_url: DEFAULT_CDN_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Value>,
}

/// Highest scoring store item's app id. Ties keep the earlier item.
pub fn best_app_id(title: &str, hints: &[String], items: &[Value]) -> Option<u64> {
    let mut best: Option<(u64, i64)> = None;
    for item in items {
        let Some(id) = item.get("id").and_then(Value::as_u64) else {
            continue;
        };
        let name = item.get("name").and_then(Value::as_str).unwrap_or_default();
        let score = score_candidate(title, name, item, hints);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Steam store capsule and library art.
#[derive(Debug, Clone)]
pub struct SteamStoreProvider {
    settings: SteamStoreSettings,
    downloader: CachedDownloader,
}

impl SteamStoreProvider {
    /// Provider using `settings`, downloading through `downloader`.
    pub fn new(settings: SteamStoreSettings, downloader: CachedDownloader) -> Self {
        Self {
            settings,
            downloader,
        }
    }

    /// CDN URL of `file` for `app_id`.
    pub fn asset_url(&self, app_id: u64, file: &str) -> String {
        format!(
            "{}/steam/apps/{app_id}/{file}",
            self.settings.cdn_url.trim_end_matches('/')
        )
    }

    async fn app_id(&self, req: &ArtworkRequest) -> Result<Option<u64>, ProviderError> {
        let url = format!(
            "{}/api/storesearch/",
            self.settings.store_url.trim_end_matches('/')
        );
        let response: SearchResponse = self
            .downloader
            .http()
            .get_json(|c| {
                c.get(&url)
                    .query(&[
                        ("term", req.title.as_str()),
                        ("l", "english"),
                        ("cc", "US"),
                    ])
                    .timeout(self.settings.timeout)
            })
            .await?;
        let id = best_app_id(&req.title, &req.hints, &response.items);
        debug!("[steam_store] '{}' -> {:?}", req.title, id);
        Ok(id)
    }

    async fn asset(
        &self,
        req: &ArtworkRequest,
        kind: ArtworkKind,
        file: &str,
        source: &str,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        let Some(app_id) = self.app_id(req).await? else {
            return Ok(None);
        };
        let url = self.asset_url(app_id, file);
        let bytes = self.downloader.fetch(kind, &url).await?;
        Ok(Some(
            ArtworkOption::new(ProviderId::SteamStore, SourceTag::new(source), kind, bytes)
                .with_url(url),
        ))
    }
}

#[async_trait]
impl ArtworkProvider for SteamStoreProvider {
    fn id(&self) -> ProviderId {
        ProviderId::SteamStore
    }

    async fn fetch_icon(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        self.asset(
            req,
            ArtworkKind::Icon,
            "library_600x900.jpg",
            SourceTag::STEAM_STORE_CAPSULE,
        )
        .await
    }

    async fn fetch_logo(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        self.asset(req, ArtworkKind::Title, "logo.png", "steam_store_logo")
            .await
    }

    async fn fetch_heroes(
        &self,
        req: &ArtworkRequest,
        count: usize,
    ) -> Result<Vec<ArtworkOption>, ProviderError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .asset(req, ArtworkKind::Hero, "library_hero.jpg", "steam_store_hero")
            .await?
            .into_iter()
            .collect())
    }
}
