use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use iisu_model::{
    ArtworkKind, ArtworkOption, ImageDimensions, ProviderId, SourceTag,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::CachedDownloader;
use crate::http::{polite_delay, quote_segment};
use crate::titles::{normalize_for_search, score_candidate, search_variants};

use super::traits::{ArtworkProvider, ArtworkRequest, ProviderError};

/// SteamGridDB API root.
pub const DEFAULT_BASE_URL: &str = "https://www.steamgriddb.com/api/v2";
const MAX_CANDIDATES: usize = 8;
const ENOUGH_RESULTS: usize = 5;

/// Key, endpoint and asset filters for [`SteamGridDbProvider`].
#[derive(Clone)]
pub struct SteamGridDbSettings {
    /// Bearer token.
    pub api_key: String,
    /// API root.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause between API calls.
    pub delay: Duration,
    /// Accept animated `.webp` assets.
    pub allow_animated: bool,
    /// Grid size requested, e.g. `1024x1024`.
    pub prefer_dim: String,
    /// Grid styles requested.
    pub square_styles: Vec<String>,
    /// Reject grids whose size differs from [`Self::prefer_dim`].
    pub square_only: bool,
    /// Hero sizes requested.
    pub hero_dimensions: Vec<String>,
    /// Hero styles requested.
    pub hero_styles: Vec<String>,
    /// Logo styles requested.
    pub logo_styles: Vec<String>,
}

impl fmt::Debug for SteamGridDbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SteamGridDbSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("prefer_dim", &self.prefer_dim)
            .field("square_only", &self.square_only)
            .finish()
    }
}

impl SteamGridDbSettings {
    /// Default endpoint and filters with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(40),
            delay: Duration::from_millis(250),
            allow_animated: false,
            prefer_dim: "1024x1024".to_string(),
            square_styles: ["alternate", "material", "white_logo", "blurred", "no_logo"]
                .map(String::from)
                .to_vec(),
            square_only: true,
            hero_dimensions: ["1920x620", "3840x1240"].map(String::from).to_vec(),
            hero_styles: ["alternate", "blurred", "material"]
                .map(String::from)
                .to_vec(),
            logo_styles: ["official", "white", "black"].map(String::from).to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
}

/// An autocomplete hit.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SgdbGame {
    /// SteamGridDB game id.
    pub id: Option<u64>,
    /// Game name.
    #[serde(default)]
    pub name: Option<String>,
}

/// A grid, hero or logo record.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct SgdbAsset {
    /// Asset id.
    #[serde(default)]
    pub id: u64,
    /// Download URL.
    #[serde(default)]
    pub url: String,
    /// Reported width.
    pub width: Option<u32>,
    /// Reported height.
    pub height: Option<u32>,
    /// Style name, e.g. `alternate`.
    #[serde(default)]
    pub style: Option<String>,
    /// MIME type.
    #[serde(default)]
    pub mime: Option<String>,
    /// Community score.
    #[serde(default)]
    pub score: i64,
    /// Upvote count.
    #[serde(default)]
    pub upvotes: i64,
}

impl SgdbAsset {
    fn is_animated(&self) -> bool {
        self.url.trim().to_lowercase().ends_with(".webp")
    }

    fn dims(&self) -> Option<ImageDimensions> {
        ImageDimensions::from_u32(self.width?, self.height?)
    }

    fn dim_string(&self) -> String {
        let show = |v: Option<u32>| v.map_or("None".to_string(), |v| v.to_string());
        format!("{}x{}", show(self.width), show(self.height))
    }
}

fn rank_desc(assets: &mut [SgdbAsset]) {
    assets.sort_by(|a, b| {
        (b.score, b.upvotes, b.id).cmp(&(a.score, a.upvotes, a.id))
    });
}

/// Best grid by (score, upvotes, id). With `square_only` only grids whose
/// reported size equals `prefer_dim` qualify.
pub fn pick_best_grid(
    grids: &[SgdbAsset],
    prefer_dim: &str,
    allow_animated: bool,
    square_only: bool,
) -> Option<SgdbAsset> {
    let mut usable: Vec<SgdbAsset> = grids
        .iter()
        .filter(|g| !g.url.trim().is_empty())
        .filter(|g| allow_animated || !g.is_animated())
        .filter(|g| !square_only || g.dim_string() == prefer_dim)
        .cloned()
        .collect();
    rank_desc(&mut usable);
    usable.into_iter().next()
}

/// Grids suitable for the option picker, ranked, at most `max`.
pub fn rank_option_grids(
    grids: &[SgdbAsset],
    allow_animated: bool,
    square_only: bool,
    max: usize,
) -> Vec<SgdbAsset> {
    let mut usable: Vec<SgdbAsset> = grids
        .iter()
        .filter(|g| {
            allow_animated
                || !g
                    .mime
                    .as_deref()
                    .is_some_and(|m| m.starts_with("image/webp"))
        })
        .filter(|g| !square_only || g.width == g.height)
        .cloned()
        .collect();
    rank_desc(&mut usable);
    usable.truncate(max);
    usable
}

/// Non-empty, non-animated assets ranked best first.
pub fn rank_assets(assets: &[SgdbAsset], allow_animated: bool) -> Vec<SgdbAsset> {
    let mut usable: Vec<SgdbAsset> = assets
        .iter()
        .filter(|a| !a.url.trim().is_empty())
        .filter(|a| allow_animated || !a.is_animated())
        .cloned()
        .collect();
    rank_desc(&mut usable);
    usable
}

/// SteamGridDB grids, heroes and logos, found by game search.
#[derive(Debug, Clone)]
pub struct SteamGridDbProvider {
    settings: SteamGridDbSettings,
    downloader: CachedDownloader,
}

impl SteamGridDbProvider {
    /// Provider using `settings`, downloading through `downloader`.
    pub fn new(settings: SteamGridDbSettings, downloader: CachedDownloader) -> Self {
        Self {
            settings,
            downloader,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let envelope: Envelope<T> = self
            .downloader
            .http()
            .get_json(|c| {
                c.get(&url)
                    .query(params)
                    .timeout(self.settings.timeout)
                    .bearer_auth(&self.settings.api_key)
                    .header(reqwest::header::ACCEPT, "application/json")
            })
            .await?;
        if !envelope.success {
            return Err(ProviderError::ApiError(format!(
                "steamgriddb reported failure for {path}"
            )));
        }
        envelope
            .data
            .ok_or_else(|| ProviderError::ParseError(format!("no data for {path}")))
    }

    /// Raw autocomplete hits for `term`.
    pub async fn search_autocomplete(
        &self,
        term: &str,
    ) -> Result<Vec<SgdbGame>, ProviderError> {
        let path = format!("search/autocomplete/{}", quote_segment(term));
        self.get(&path, &[]).await
    }

    /// Autocomplete over every spelling variant of `title`, de-duplicated by
    /// game id. Stops early once enough hits have been collected.
    pub async fn search_with_variants(&self, title: &str) -> Vec<SgdbGame> {
        let variants = search_variants(title);
        debug!("[steamgriddb] variants for '{}': {:?}", title, variants);

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for (idx, variant) in variants.iter().enumerate() {
            match self.search_autocomplete(variant).await {
                Ok(hits) => {
                    for hit in hits {
                        if let Some(id) = hit.id
                            && seen.insert(id)
                        {
                            results.push(hit);
                        }
                    }
                    if idx + 1 < variants.len() {
                        polite_delay(self.settings.delay).await;
                    }
                    if results.len() >= ENOUGH_RESULTS {
                        break;
                    }
                }
                Err(err) => {
                    debug!("[steamgriddb] variant '{}' failed: {}", variant, err);
                }
            }
        }
        debug!(
            "[steamgriddb] {} unique results across {} variants",
            results.len(),
            variants.len()
        );
        results
    }

    /// Full game record for `id`.
    pub async fn game_meta(&self, id: u64) -> Result<Value, ProviderError> {
        self.get(&format!("games/id/{id}"), &[]).await
    }

    /// Score the first few hits against `title` using their full records
    /// and return the winning id.
    pub async fn choose_best_game_id(
        &self,
        title: &str,
        hints: &[String],
        hits: &[SgdbGame],
    ) -> Option<u64> {
        let mut best: Option<(u64, i64)> = None;
        for hit in hits.iter().take(MAX_CANDIDATES) {
            let Some(id) = hit.id else { continue };
            let meta = match self.game_meta(id).await {
                Ok(meta) => {
                    polite_delay(self.settings.delay).await;
                    meta
                }
                Err(err) => {
                    debug!("[steamgriddb] meta for {} failed: {}", id, err);
                    Value::Object(Default::default())
                }
            };
            let name = hit
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .or_else(|| meta.get("name").and_then(Value::as_str).map(String::from))
                .unwrap_or_default();
            let score = score_candidate(title, &name, &meta, hints);
            debug!("[steamgriddb] candidate '{}' (id={}) score={}", name, id, score);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((id, score));
            }
        }
        best.map(|(id, _)| id)
    }

    fn join(values: &[String]) -> String {
        values.join(",")
    }

    /// Grids for `game_id` in the configured size and styles.
    pub async fn grids(&self, game_id: u64) -> Result<Vec<SgdbAsset>, ProviderError> {
        let mut params = vec![("dimensions", self.settings.prefer_dim.clone())];
        if !self.settings.square_styles.is_empty() {
            params.push(("styles", Self::join(&self.settings.square_styles)));
        }
        self.get(&format!("grids/game/{game_id}"), &params).await
    }

    /// Heroes for `game_id` in the configured sizes and styles.
    pub async fn heroes(&self, game_id: u64) -> Result<Vec<SgdbAsset>, ProviderError> {
        let mut params = Vec::new();
        if !self.settings.hero_dimensions.is_empty() {
            params.push(("dimensions", Self::join(&self.settings.hero_dimensions)));
        }
        if !self.settings.hero_styles.is_empty() {
            params.push(("styles", Self::join(&self.settings.hero_styles)));
        }
        self.get(&format!("heroes/game/{game_id}"), &params).await
    }

    /// Logos for `game_id` in the configured styles.
    pub async fn logos(&self, game_id: u64) -> Result<Vec<SgdbAsset>, ProviderError> {
        let mut params = Vec::new();
        if !self.settings.logo_styles.is_empty() {
            params.push(("styles", Self::join(&self.settings.logo_styles)));
        }
        self.get(&format!("logos/game/{game_id}"), &params).await
    }

    async fn icon_game_id(&self, req: &ArtworkRequest) -> Option<u64> {
        let hits = self.search_with_variants(&req.title).await;
        if hits.is_empty() {
            debug!("[steamgriddb] no results for '{}'", req.title);
            return None;
        }
        polite_delay(self.settings.delay).await;
        let normalized = normalize_for_search(&req.title);
        self.choose_best_game_id(&normalized, &req.hints, &hits).await
    }

    async fn plain_game_id(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<u64>, ProviderError> {
        let hits = self.search_autocomplete(&req.title).await?;
        if hits.is_empty() {
            return Ok(None);
        }
        polite_delay(self.settings.delay).await;
        Ok(self.choose_best_game_id(&req.title, &req.hints, &hits).await)
    }

    async fn download(
        &self,
        kind: ArtworkKind,
        asset: &SgdbAsset,
        source: SourceTag,
    ) -> Result<ArtworkOption, ProviderError> {
        let bytes = self.downloader.fetch(kind, &asset.url).await?;
        Ok(ArtworkOption::new(ProviderId::SteamGridDb, source, kind, bytes)
            .with_url(asset.url.clone())
            .with_dimensions(asset.dims())
            .with_score(asset.score))
    }
}

#[async_trait]
impl ArtworkProvider for SteamGridDbProvider {
    fn id(&self) -> ProviderId {
        ProviderId::SteamGridDb
    }

    async fn fetch_icon(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        let Some(game_id) = self.icon_game_id(req).await else {
            return Ok(None);
        };
        info!("[steamgriddb] selected game id {} for '{}'", game_id, req.title);

        let grids = self.grids(game_id).await?;
        polite_delay(self.settings.delay).await;
        let Some(best) = pick_best_grid(
            &grids,
            &self.settings.prefer_dim,
            self.settings.allow_animated,
            self.settings.square_only,
        ) else {
            debug!("[steamgriddb] no suitable grid for game id {}", game_id);
            return Ok(None);
        };

        let source = SourceTag::new(SourceTag::STEAMGRIDDB_SQUARE);
        Ok(Some(self.download(ArtworkKind::Icon, &best, source).await?))
    }

    async fn fetch_icon_options(
        &self,
        req: &ArtworkRequest,
        max: usize,
    ) -> Result<Vec<ArtworkOption>, ProviderError> {
        let Some(game_id) = self.icon_game_id(req).await else {
            return Ok(Vec::new());
        };
        let grids = self.grids(game_id).await?;
        polite_delay(self.settings.delay).await;

        let ranked = rank_option_grids(
            &grids,
            self.settings.allow_animated,
            self.settings.square_only,
            max,
        );
        let mut options = Vec::with_capacity(ranked.len());
        for grid in ranked.iter().filter(|g| !g.url.is_empty()) {
            let style = grid.style.as_deref().unwrap_or("unknown");
            let source = SourceTag::steamgriddb_style(style);
            match self.download(ArtworkKind::Icon, grid, source).await {
                Ok(option) => options.push(option),
                Err(err) => warn!("[steamgriddb] grid download failed: {}", err),
            }
        }
        Ok(options)
    }

    async fn fetch_logo(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        let Some(game_id) = self.plain_game_id(req).await? else {
            return Ok(None);
        };
        let logos = self.logos(game_id).await?;
        polite_delay(self.settings.delay).await;
        let Some(best) = rank_assets(&logos, self.settings.allow_animated)
            .into_iter()
            .next()
        else {
            debug!("[steamgriddb] no suitable logos for game id {}", game_id);
            return Ok(None);
        };
        let source = SourceTag::new("steamgriddb_logo");
        Ok(Some(self.download(ArtworkKind::Title, &best, source).await?))
    }

    async fn fetch_heroes(
        &self,
        req: &ArtworkRequest,
        count: usize,
    ) -> Result<Vec<ArtworkOption>, ProviderError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let Some(game_id) = self.plain_game_id(req).await? else {
            return Ok(Vec::new());
        };
        let heroes = self.heroes(game_id).await?;
        polite_delay(self.settings.delay).await;

        let mut out = Vec::new();
        for hero in rank_assets(&heroes, self.settings.allow_animated)
            .iter()
            .take(count)
        {
            let source = SourceTag::new("steamgriddb_hero");
            match self.download(ArtworkKind::Hero, hero, source).await {
                Ok(option) => out.push(option),
                Err(err) => warn!("[steamgriddb] hero download failed: {}", err),
            }
            polite_delay(self.settings.delay).await;
        }
        info!("[steamgriddb] retrieved {} hero images", out.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(id: u64, w: u32, h: u32, score: i64, upvotes: i64, url: &str) -> SgdbAsset {
        SgdbAsset {
            id,
            url: url.to_string(),
            width: Some(w),
            height: Some(h),
            style: Some("alternate".into()),
            mime: Some("image/png".into()),
            score,
            upvotes,
        }
    }

    #[test]
    fn best_grid_prefers_score_then_upvotes_then_id() {
        let grids = vec![
            grid(1, 1024, 1024, 5, 1, "https://x/1.png"),
            grid(2, 1024, 1024, 5, 3, "https://x/2.png"),
            grid(3, 1024, 1024, 5, 3, "https://x/3.png"),
            grid(4, 1024, 1024, 2, 9, "https://x/4.png"),
        ];
        let best = pick_best_grid(&grids, "1024x1024", false, true).unwrap();
        assert_eq!(best.id, 3);
    }

    #[test]
    fn square_only_requires_preferred_dimensions() {
        let grids = vec![
            grid(1, 512, 512, 10, 0, "https://x/1.png"),
            grid(2, 600, 900, 20, 0, "https://x/2.png"),
        ];
        assert!(pick_best_grid(&grids, "1024x1024", false, true).is_none());
        assert_eq!(
            pick_best_grid(&grids, "1024x1024", false, false).unwrap().id,
            2
        );
    }

    #[test]
    fn animated_and_empty_urls_are_dropped() {
        let grids = vec![
            grid(1, 1024, 1024, 50, 0, "https://x/1.WEBP"),
            grid(2, 1024, 1024, 1, 0, "  "),
            grid(3, 1024, 1024, 0, 0, "https://x/3.png"),
        ];
        assert_eq!(pick_best_grid(&grids, "1024x1024", false, true).unwrap().id, 3);
        assert_eq!(pick_best_grid(&grids, "1024x1024", true, true).unwrap().id, 1);
    }

    #[test]
    fn option_grids_filter_by_mime_and_shape() {
        let mut animated = grid(1, 1024, 1024, 99, 0, "https://x/1.webp");
        animated.mime = Some("image/webp".into());
        let grids = vec![
            animated,
            grid(2, 600, 900, 50, 0, "https://x/2.png"),
            grid(3, 512, 512, 10, 0, "https://x/3.png"),
            grid(4, 1024, 1024, 20, 0, "https://x/4.png"),
        ];
        let ranked = rank_option_grids(&grids, false, true, 5);
        let ids: Vec<u64> = ranked.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![4, 3]);
        assert_eq!(rank_option_grids(&grids, false, true, 1).len(), 1);
    }

    #[test]
    fn parses_api_envelopes() {
        let raw = r#"{"success":true,"data":[{"id":7,"name":"Zelda","types":["game"]}]}"#;
        let env: Envelope<Vec<SgdbGame>> = serde_json::from_str(raw).unwrap();
        assert!(env.success);
        assert_eq!(env.data.unwrap()[0].id, Some(7));

        let grid_raw = r#"{"id":1,"url":"https://x/1.png","width":1024,"height":1024,"style":"material","score":3,"upvotes":1,"downvotes":0,"mime":"image/png"}"#;
        let asset: SgdbAsset = serde_json::from_str(grid_raw).unwrap();
        assert_eq!(asset.dim_string(), "1024x1024");
        assert!(asset.dims().unwrap().is_square());
    }
}
