use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use iisu_model::{ArtworkKind, ArtworkOption, PlatformKey, ProviderId, SourceTag};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::CachedDownloader;
use crate::http::polite_delay;
use crate::titles::normalize_for_search;

use super::traits::{ArtworkProvider, ArtworkRequest, ProviderError};

/// IGDB API root.
pub const DEFAULT_BASE_URL: &str = "https://api.igdb.com/v4";
/// Twitch OAuth token endpoint.
pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
/// IGDB image CDN root.
pub const IMAGE_BASE_URL: &str = "https://images.igdb.com/igdb/image/upload";
const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(300);

/// IGDB platform ids.
pub const DEFAULT_PLATFORM_IDS: &[(&str, u32)] = &[
    ("NES", 18),
    ("SNES", 19),
    ("N64", 4),
    ("GAMECUBE", 21),
    ("WII", 5),
    ("WII_U", 41),
    ("SWITCH", 130),
    ("GAME_BOY", 33),
    ("GAME_BOY_COLOR", 22),
    ("GAME_BOY_ADVANCE", 24),
    ("NINTENDO_DS", 20),
    ("NINTENDO_3DS", 37),
    ("VIRTUAL_BOY", 87),
    ("PS1", 7),
    ("PS2", 8),
    ("PS3", 9),
    ("PS4", 48),
    ("PS5", 167),
    ("PSP", 38),
    ("PS_VITA", 46),
    ("XBOX", 11),
    ("XBOX_360", 12),
    ("MASTER_SYSTEM", 64),
    ("GENESIS", 29),
    ("SEGA_CD", 78),
    ("SEGA_32X", 30),
    ("SATURN", 32),
    ("DREAMCAST", 23),
    ("GAME_GEAR", 35),
    ("NEO_GEO_POCKET", 119),
    ("NEO_GEO_POCKET_COLOR", 120),
    ("ATARI_2600", 59),
    ("ATARI_7800", 60),
    ("ATARI_LYNX", 61),
    ("ATARI_JAGUAR", 62),
    ("TG16", 86),
    ("WONDERSWAN", 57),
    ("WONDERSWAN_COLOR", 123),
];

/// Credentials and endpoints for [`IgdbProvider`].
#[derive(Clone)]
pub struct IgdbSettings {
    /// Twitch application client id.
    pub client_id: String,
    /// Twitch application secret.
    pub client_secret: String,
    /// API root.
    pub base_url: String,
    /// Token endpoint.
    pub token_url: String,
    /// IGDB platform id per platform.
    pub platform_map: BTreeMap<PlatformKey, u32>,
    /// Image size name used for covers.
    pub cover_size: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause between API calls.
    pub delay: Duration,
}

impl fmt::Debug for IgdbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgdbSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("cover_size", &self.cover_size)
            .finish()
    }
}

impl IgdbSettings {
    /// Default endpoints and platform ids with the given credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            platform_map: DEFAULT_PLATFORM_IDS
                .iter()
                .map(|(k, id)| (PlatformKey::new(k), *id))
                .collect(),
            cover_size: "cover_big".to_string(),
            timeout: Duration::from_secs(30),
            delay: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    value: String,
    valid_until: Instant,
}

/// Image reference in a game record.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IgdbImage {
    /// Id used to build the image URL.
    pub image_id: String,
}

/// The fields read from a `/games` search hit.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IgdbGame {
    /// Game name.
    #[serde(default)]
    pub name: Option<String>,
    /// Cover image, when requested and present.
    #[serde(default)]
    pub cover: Option<IgdbImage>,
    /// Screenshots, when requested and present.
    #[serde(default)]
    pub screenshots: Option<Vec<IgdbImage>>,
}

/// Apicalypse body for a cover search on one platform.
pub fn cover_query(normalized_title: &str, platform_id: u32) -> String {
    format!(
        "search \"{}\"; fields name,cover.image_id,platforms; where platforms = ({platform_id}); limit 5;",
        normalized_title.replace('"', "")
    )
}

/// Apicalypse body for a screenshot search on one platform.
pub fn screenshot_query(normalized_title: &str, platform_id: u32) -> String {
    format!(
        "search \"{}\"; fields name,screenshots.image_id; where platforms = ({platform_id}); limit 1;",
        normalized_title.replace('"', "")
    )
}

/// CDN URL of `image_id` at `size`.
pub fn image_url(size: &str, image_id: &str) -> String {
    format!("{IMAGE_BASE_URL}/t_{size}/{image_id}.jpg")
}

/// IGDB covers and screenshots, authenticated through Twitch
/// client credentials.
pub struct IgdbProvider {
    settings: IgdbSettings,
    downloader: CachedDownloader,
    token: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for IgdbProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgdbProvider")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl IgdbProvider {
    /// Provider using `settings`, downloading through `downloader`.
    pub fn new(settings: IgdbSettings, downloader: CachedDownloader) -> Self {
        Self {
            settings,
            downloader,
            token: Mutex::new(None),
        }
    }

    /// A bearer token, refreshed five minutes before it expires.
    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref()
            && Instant::now() < cached.valid_until
        {
            return Ok(cached.value.clone());
        }

        let form = [
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let response: TokenResponse = self
            .downloader
            .http()
            .get_json(|c| {
                c.post(&self.settings.token_url)
                    .form(&form)
                    .timeout(self.settings.timeout)
            })
            .await?;
        if response.access_token.is_empty() {
            return Err(ProviderError::InvalidApiKey);
        }

        let lifetime = Duration::from_secs(response.expires_in)
            .saturating_sub(TOKEN_SAFETY_MARGIN);
        debug!("[igdb] token refreshed, valid for {:?}", lifetime);
        *guard = Some(CachedToken {
            value: response.access_token.clone(),
            valid_until: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    async fn query_games(&self, body: String) -> Result<Vec<IgdbGame>, ProviderError> {
        let token = self.access_token().await?;
        let url = format!("{}/games", self.settings.base_url.trim_end_matches('/'));
        let games = self
            .downloader
            .http()
            .get_json(|c| {
                c.post(&url)
                    .header("Client-ID", &self.settings.client_id)
                    .bearer_auth(&token)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .timeout(self.settings.timeout)
                    .body(body.clone())
            })
            .await?;
        polite_delay(self.settings.delay).await;
        Ok(games)
    }

    fn platform_id(&self, platform: &PlatformKey) -> Option<u32> {
        let id = self.settings.platform_map.get(platform).copied();
        if id.is_none() {
            debug!("[igdb] no platform mapping for {}", platform);
        }
        id
    }
}

#[async_trait]
impl ArtworkProvider for IgdbProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Igdb
    }

    async fn fetch_icon(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        let Some(pid) = self.platform_id(&req.platform) else {
            return Ok(None);
        };
        let normalized = normalize_for_search(&req.title);
        let games = self.query_games(cover_query(&normalized, pid)).await?;

        let Some(image_id) = games
            .first()
            .and_then(|g| g.cover.as_ref())
            .map(|c| c.image_id.clone())
        else {
            debug!("[igdb] no cover for '{}'", req.title);
            return Ok(None);
        };

        let url = image_url(&self.settings.cover_size, &image_id);
        let bytes = self.downloader.fetch(ArtworkKind::Icon, &url).await?;
        info!("[igdb] cover for '{}'", req.title);
        Ok(Some(
            ArtworkOption::new(
                ProviderId::Igdb,
                SourceTag::new(SourceTag::IGDB_COVER),
                ArtworkKind::Icon,
                bytes,
            )
            .with_url(url),
        ))
    }

    async fn fetch_screenshots(
        &self,
        req: &ArtworkRequest,
        count: usize,
    ) -> Result<Vec<ArtworkOption>, ProviderError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let Some(pid) = self.platform_id(&req.platform) else {
            return Ok(Vec::new());
        };
        let normalized = normalize_for_search(&req.title);
        let games = self.query_games(screenshot_query(&normalized, pid)).await?;

        let shots = games
            .into_iter()
            .next()
            .and_then(|g| g.screenshots)
            .unwrap_or_default();
        let mut out = Vec::new();
        for shot in shots.iter().take(count) {
            let url = image_url("720p", &shot.image_id);
            match self.downloader.fetch(ArtworkKind::Slide, &url).await {
                Ok(bytes) => out.push(
                    ArtworkOption::new(
                        ProviderId::Igdb,
                        SourceTag::new("igdb_screenshot"),
                        ArtworkKind::Slide,
                        bytes,
                    )
                    .with_url(url),
                ),
                Err(err) => warn!("[igdb] screenshot download failed: {}", err),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_apicalypse_queries() {
        assert_eq!(
            cover_query("Metroid Prime", 21),
            "search \"Metroid Prime\"; fields name,cover.image_id,platforms; where platforms = (21); limit 5;"
        );
        assert!(screenshot_query("Doom", 7).ends_with("limit 1;"));
        assert!(cover_query("Say \"Hi\"", 1).starts_with("search \"Say Hi\";"));
    }

    #[test]
    fn image_urls_use_size_prefix() {
        assert_eq!(
            image_url("cover_big", "co1abc"),
            "https://images.igdb.com/igdb/image/upload/t_cover_big/co1abc.jpg"
        );
        assert!(image_url("720p", "sc9").contains("/t_720p/"));
    }

    #[test]
    fn parses_game_rows() {
        let raw = r#"[{"id":1,"name":"Doom","cover":{"id":5,"image_id":"co2"},"platforms":[6]},
                      {"id":2,"name":"Doom II"}]"#;
        let games: Vec<IgdbGame> = serde_json::from_str(raw).unwrap();
        assert_eq!(games[0].cover.as_ref().unwrap().image_id, "co2");
        assert!(games[1].cover.is_none());
    }

    #[test]
    fn settings_debug_hides_secret() {
        let settings = IgdbSettings::new("id", "hunter2");
        assert!(!format!("{settings:?}").contains("hunter2"));
        assert_eq!(
            settings.platform_map.get(&PlatformKey::new("gamecube")),
            Some(&21)
        );
    }
}
