use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use iisu_model::{ArtworkKind, ArtworkOption, PlatformKey, ProviderId, SourceTag};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::CachedDownloader;
use crate::http::polite_delay;

use super::traits::{ArtworkProvider, ArtworkRequest, ProviderError};

/// TheGamesDB API root.
pub const DEFAULT_BASE_URL: &str = "https://api.thegamesdb.net/v1";

/// TheGamesDB platform ids, used for the `filter[platform]` parameter.
pub const DEFAULT_PLATFORM_IDS: &[(&str, u32)] = &[
    ("NES", 7),
    ("SNES", 6),
    ("N64", 3),
    ("GAMECUBE", 2),
    ("WII", 9),
    ("WII_U", 38),
    ("SWITCH", 4971),
    ("GAME_BOY", 4),
    ("GAME_BOY_COLOR", 41),
    ("GAME_BOY_ADVANCE", 5),
    ("NINTENDO_DS", 8),
    ("NINTENDO_3DS", 4912),
    ("VIRTUAL_BOY", 4918),
    ("PS1", 10),
    ("PS2", 11),
    ("PS3", 12),
    ("PSP", 13),
    ("PS_VITA", 39),
    ("XBOX", 14),
    ("XBOX_360", 15),
    ("MASTER_SYSTEM", 35),
    ("GENESIS", 18),
    ("SEGA_CD", 21),
    ("SEGA_32X", 33),
    ("SATURN", 17),
    ("DREAMCAST", 16),
    ("GAME_GEAR", 20),
    ("NEO_GEO", 24),
    ("NEO_GEO_POCKET", 4922),
    ("NEO_GEO_POCKET_COLOR", 4923),
    ("ATARI_2600", 22),
    ("ATARI_7800", 27),
    ("ATARI_JAGUAR", 28),
    ("ATARI_LYNX", 4924),
    ("COLECOVISION", 31),
    ("INTELLIVISION", 32),
    ("TG16", 34),
    ("WONDERSWAN", 4925),
    ("WONDERSWAN_COLOR", 4926),
];

/// Key, endpoint and platform ids for [`TheGamesDbProvider`].
#[derive(Clone)]
pub struct TheGamesDbSettings {
    /// Public API key.
    pub api_key: String,
    /// API root.
    pub base_url: String,
    /// TheGamesDB platform id per platform.
    pub platform_map: BTreeMap<PlatformKey, u32>,
    /// Image type tried first, e.g. `boxart`.
    pub prefer_image_type: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause between API calls.
    pub delay: Duration,
}

impl fmt::Debug for TheGamesDbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TheGamesDbSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("prefer_image_type", &self.prefer_image_type)
            .finish()
    }
}

impl TheGamesDbSettings {
    /// Default endpoint and platform ids with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            platform_map: DEFAULT_PLATFORM_IDS
                .iter()
                .map(|(k, id)| (PlatformKey::new(k), *id))
                .collect(),
            prefer_image_type: "boxart".to_string(),
            timeout: Duration::from_secs(30),
            delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct GamesData {
    #[serde(default)]
    games: Vec<TgdbGame>,
}

/// A `/Games/ByGameName` hit.
#[derive(Debug, Clone, Deserialize)]
pub struct TgdbGame {
    /// TheGamesDB game id.
    pub id: u64,
    /// Game title.
    #[serde(default)]
    pub game_title: Option<String>,
}

/// The `data` block of an `/Games/Images` response.
#[derive(Debug, Default, Deserialize)]
pub struct ImagesData {
    /// URL prefixes for image files.
    #[serde(default)]
    pub base_url: BaseUrls,
    /// Images per game id.
    #[serde(default)]
    pub images: HashMap<String, Vec<TgdbImage>>,
}

/// URL prefixes by image size.
#[derive(Debug, Default, Deserialize)]
pub struct BaseUrls {
    /// Prefix for full-size images.
    #[serde(default)]
    pub original: String,
}

/// One image record.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TgdbImage {
    /// Image id.
    #[serde(default)]
    pub id: u64,
    /// Image type, e.g. `boxart` or `screenshot`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// `front` or `back` for box art.
    #[serde(default)]
    pub side: Option<String>,
    /// Path below the base URL.
    #[serde(default)]
    pub filename: String,
}

/// Preferred type first, then any boxart, then whatever comes first.
/// Within a type, front covers win.
pub fn pick_image<'a>(images: &'a [TgdbImage], prefer_type: &str) -> Option<&'a TgdbImage> {
    fn of_type<'a>(images: &'a [TgdbImage], wanted: &str) -> Option<&'a TgdbImage> {
        images
            .iter()
            .find(|i| i.kind == wanted && i.side.as_deref() == Some("front"))
            .or_else(|| images.iter().find(|i| i.kind == wanted))
    }

    of_type(images, prefer_type)
        .or_else(|| of_type(images, "boxart"))
        .or_else(|| images.first())
}

/// Join a base URL and a file path with exactly one slash.
pub fn join_image_url(base: &str, filename: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        filename.trim_start_matches('/')
    )
}

/// TheGamesDB box art and screenshots, found by name and platform id.
#[derive(Debug, Clone)]
pub struct TheGamesDbProvider {
    settings: TheGamesDbSettings,
    downloader: CachedDownloader,
}

impl TheGamesDbProvider {
    /// Provider using `settings`, downloading through `downloader`.
    pub fn new(settings: TheGamesDbSettings, downloader: CachedDownloader) -> Self {
        Self {
            settings,
            downloader,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Best matching game id for `title` on `platform`.
    pub async fn find_game_id(
        &self,
        title: &str,
        platform: &PlatformKey,
    ) -> Result<Option<u64>, ProviderError> {
        let url = self.endpoint("Games/ByGameName");
        let mut params = vec![
            ("apikey", self.settings.api_key.clone()),
            ("name", title.to_string()),
        ];
        if let Some(pid) = self.settings.platform_map.get(platform) {
            params.push(("filter[platform]", pid.to_string()));
        }

        let envelope: Envelope<GamesData> = self
            .downloader
            .http()
            .get_json(|c| c.get(&url).query(&params).timeout(self.settings.timeout))
            .await?;
        polite_delay(self.settings.delay).await;
        Ok(envelope
            .data
            .and_then(|d| d.games.into_iter().next())
            .map(|g| g.id))
    }

    /// `(base_url, images)` for one game.
    pub async fn images(
        &self,
        game_id: u64,
        only_type: Option<&str>,
    ) -> Result<(String, Vec<TgdbImage>), ProviderError> {
        let url = self.endpoint("Games/Images");
        let mut params = vec![
            ("apikey", self.settings.api_key.clone()),
            ("games_id", game_id.to_string()),
        ];
        if let Some(kind) = only_type {
            params.push(("filter[type]", kind.to_string()));
        }

        let envelope: Envelope<ImagesData> = self
            .downloader
            .http()
            .get_json(|c| c.get(&url).query(&params).timeout(self.settings.timeout))
            .await?;
        polite_delay(self.settings.delay).await;
        let mut data = envelope.data.unwrap_or_default();
        let images = data.images.remove(&game_id.to_string()).unwrap_or_default();
        Ok((data.base_url.original, images))
    }
}

#[async_trait]
impl ArtworkProvider for TheGamesDbProvider {
    fn id(&self) -> ProviderId {
        ProviderId::TheGamesDb
    }

    async fn fetch_icon(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        let Some(game_id) = self.find_game_id(&req.title, &req.platform).await? else {
            debug!("[thegamesdb] no game for '{}'", req.title);
            return Ok(None);
        };
        let (base, images) = self.images(game_id, None).await?;
        let Some(image) = pick_image(&images, &self.settings.prefer_image_type) else {
            return Ok(None);
        };
        if base.is_empty() || image.filename.is_empty() {
            return Ok(None);
        }

        let url = join_image_url(&base, &image.filename);
        let bytes = self.downloader.fetch(ArtworkKind::Icon, &url).await?;
        Ok(Some(
            ArtworkOption::new(
                ProviderId::TheGamesDb,
                SourceTag::new(SourceTag::THEGAMESDB_BOXART),
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
        let Some(game_id) = self.find_game_id(&req.title, &req.platform).await? else {
            return Ok(Vec::new());
        };
        let (base, images) = self.images(game_id, Some("screenshot")).await?;
        if base.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for image in images
            .iter()
            .filter(|i| i.kind == "screenshot" && !i.filename.is_empty())
            .take(count)
        {
            let url = join_image_url(&base, &image.filename);
            match self.downloader.fetch(ArtworkKind::Slide, &url).await {
                Ok(bytes) => out.push(
                    ArtworkOption::new(
                        ProviderId::TheGamesDb,
                        SourceTag::new("thegamesdb_screenshot"),
                        ArtworkKind::Slide,
                        bytes,
                    )
                    .with_url(url),
                ),
                Err(err) => warn!("[thegamesdb] screenshot download failed: {}", err),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: u64, kind: &str, side: Option<&str>) -> TgdbImage {
        TgdbImage {
            id,
            kind: kind.to_string(),
            side: side.map(String::from),
            filename: format!("{kind}/{id}.jpg"),
        }
    }

    #[test]
    fn picks_preferred_type_then_boxart_then_first() {
        let images = vec![
            image(1, "fanart", None),
            image(2, "boxart", Some("back")),
            image(3, "boxart", Some("front")),
            image(4, "clearlogo", None),
        ];
        assert_eq!(pick_image(&images, "clearlogo").unwrap().id, 4);
        assert_eq!(pick_image(&images, "banner").unwrap().id, 3);

        let no_boxart = vec![image(7, "fanart", None), image(8, "screenshot", None)];
        assert_eq!(pick_image(&no_boxart, "boxart").unwrap().id, 7);
        assert!(pick_image(&[], "boxart").is_none());
    }

    #[test]
    fn parses_images_payload() {
        let raw = r#"{"code":200,"data":{"count":2,
            "base_url":{"original":"https://cdn.thegamesdb.net/images/original/"},
            "images":{"42":[{"id":1,"type":"boxart","side":"front","filename":"boxart/front/42-1.jpg","resolution":null}]}}}"#;
        let env: Envelope<ImagesData> = serde_json::from_str(raw).unwrap();
        let mut data = env.data.unwrap();
        let images = data.images.remove("42").unwrap();
        assert_eq!(
            join_image_url(&data.base_url.original, &images[0].filename),
            "https://cdn.thegamesdb.net/images/original/boxart/front/42-1.jpg"
        );
    }

    #[test]
    fn parses_game_search() {
        let raw = r#"{"data":{"count":1,"games":[{"id":140,"game_title":"Super Mario Bros.","platform":7}]}}"#;
        let env: Envelope<GamesData> = serde_json::from_str(raw).unwrap();
        assert_eq!(env.data.unwrap().games[0].id, 140);
    }
}
