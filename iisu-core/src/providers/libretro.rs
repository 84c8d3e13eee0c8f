use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use iisu_model::{ArtworkKind, ArtworkOption, PlatformKey, ProviderId, SourceTag};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::cache::{BlobKey, CachedDownloader};
use crate::error::ArtError;
use crate::http::quote_segment;
use crate::markup::unescape_html;
use crate::titles::{clean_game_title, normalize_for_search};

use super::traits::{ArtworkProvider, ArtworkRequest, ProviderError};

/// Libretro thumbnail server root.
pub const DEFAULT_BASE_URL: &str = "https://thumbnails.libretro.com";
/// Box art folder in each playlist.
pub const BOXARTS_DIR: &str = "Named_Boxarts";
/// In-game screenshot folder in each playlist.
pub const SNAPS_DIR: &str = "Named_Snaps";
/// Lowest [`score_match`] accepted from a directory index.
pub const INDEX_MATCH_THRESHOLD: i64 = 220;

const REGION_SUFFIXES: &[&str] = &[
    "World",
    "USA",
    "Europe",
    "Japan",
    "USA, Europe",
    "USA, Australia",
    "Europe, Australia",
    "Japan, USA",
    "Japan, Europe",
];

/// Libretro playlist (database) names per platform.
pub const DEFAULT_PLAYLISTS: &[(&str, &str)] = &[
    ("NES", "Nintendo - Nintendo Entertainment System"),
    ("SNES", "Nintendo - Super Nintendo Entertainment System"),
    ("N64", "Nintendo - Nintendo 64"),
    ("N64DD", "Nintendo - Nintendo 64DD"),
    ("GAMECUBE", "Nintendo - GameCube"),
    ("WII", "Nintendo - Wii"),
    ("GAME_BOY", "Nintendo - Game Boy"),
    ("GAME_BOY_COLOR", "Nintendo - Game Boy Color"),
    ("GAME_BOY_ADVANCE", "Nintendo - Game Boy Advance"),
    ("NINTENDO_DS", "Nintendo - Nintendo DS"),
    ("NINTENDO_3DS", "Nintendo - Nintendo 3DS"),
    ("VIRTUAL_BOY", "Nintendo - Virtual Boy"),
    ("PS1", "Sony - PlayStation"),
    ("PS2", "Sony - PlayStation 2"),
    ("PS3", "Sony - PlayStation 3"),
    ("PSP", "Sony - PlayStation Portable"),
    ("PS_VITA", "Sony - PlayStation Vita"),
    ("XBOX", "Microsoft - Xbox"),
    ("XBOX_360", "Microsoft - Xbox 360"),
    ("MASTER_SYSTEM", "Sega - Master System - Mark III"),
    ("GENESIS", "Sega - Mega Drive - Genesis"),
    ("SEGA_CD", "Sega - Mega-CD - Sega CD"),
    ("SEGA_32X", "Sega - 32X"),
    ("SATURN", "Sega - Saturn"),
    ("DREAMCAST", "Sega - Dreamcast"),
    ("GAME_GEAR", "Sega - Game Gear"),
    ("NEO_GEO_POCKET", "SNK - Neo Geo Pocket"),
    ("NEO_GEO_POCKET_COLOR", "SNK - Neo Geo Pocket Color"),
    ("ATARI_2600", "Atari - 2600"),
    ("ATARI_5200", "Atari - 5200"),
    ("ATARI_7800", "Atari - 7800"),
    ("ATARI_JAGUAR", "Atari - Jaguar"),
    ("ATARI_LYNX", "Atari - Lynx"),
    ("COLECOVISION", "Coleco - ColecoVision"),
    ("INTELLIVISION", "Mattel - Intellivision"),
    ("TG16", "NEC - PC Engine - TurboGrafx 16"),
    ("TG_CD", "NEC - PC Engine CD - TurboGrafx-CD"),
    ("WONDERSWAN", "Bandai - WonderSwan"),
    ("WONDERSWAN_COLOR", "Bandai - WonderSwan Color"),
    ("MAME", "MAME"),
    ("FBA", "FBNeo - Arcade Games"),
    ("SCUMMVM", "ScummVM"),
    ("DOS", "DOS"),
];

static PNG_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="([^"]+\.png)""#).expect("png href regex should compile")
});
static BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("bracket regex should compile"));
static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("non-alnum regex should compile"));

/// Endpoints and playlist names for [`LibretroProvider`].
#[derive(Debug, Clone)]
pub struct LibretroSettings {
    /// Thumbnail server root.
    pub base_url: String,
    /// Libretro playlist name per platform.
    pub playlist_names: BTreeMap<PlatformKey, String>,
    /// Fall back to the directory index when the guessed names miss.
    pub use_index_matching: bool,
    /// How long a fetched directory index stays fresh.
    pub index_cache_hours: u64,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for LibretroSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            playlist_names: DEFAULT_PLAYLISTS
                .iter()
                .map(|(k, v)| (PlatformKey::new(k), (*v).to_string()))
                .collect(),
            use_index_matching: true,
            index_cache_hours: 168,
            timeout: Duration::from_secs(40),
        }
    }
}

/// Libretro thumbnail names replace these characters with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if "&*/:<>?\\|\"".contains(c) { '_' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Thumbnail file stems worth a direct request, most likely first.
pub fn candidate_names(title: &str) -> Vec<String> {
    let clean = clean_game_title(title);
    let base = sanitize_filename(&clean);

    let mut raw = vec![base.clone(), sanitize_filename(&normalize_for_search(title))];
    raw.extend(REGION_SUFFIXES.iter().map(|r| format!("{base} ({r})")));
    raw.push(sanitize_filename(&clean.replace(": ", " - ")));
    raw.push(sanitize_filename(&clean.replace(" - ", ": ")));
    raw.push(sanitize_filename(&clean.replace(" - ", " ")));

    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_lowercase()))
        .collect()
}

/// File names listed in a thumbnail directory page.
pub fn parse_index(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PNG_HREF
        .captures_iter(html)
        .filter_map(|caps| {
            let href = caps.get(1)?.as_str();
            let decoded = urlencoding::decode(href)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| href.to_string());
            let name = unescape_html(decoded.rsplit('/').next().unwrap_or(&decoded));
            seen.insert(name.clone()).then_some(name)
        })
        .collect()
}

/// Lowercase `name` for index matching. Drops `.png` and `[...]` tags and
/// turns punctuation into single spaces.
pub fn norm_for_match(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let lower = lower.strip_suffix(".png").unwrap_or(&lower);
    let no_tags = BRACKETS.replace_all(lower, " ");
    let unwrapped = no_tags.replace(['(', ')'], " ");
    NON_ALNUM
        .replace_all(&unwrapped, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity between two `norm_for_match` strings; higher is better.
///
/// Prefix and substring bonuses apply in either direction and add up, so
/// an index name that is a shortened title still clears the threshold.
pub fn score_match(want: &str, have: &str) -> i64 {
    if want.is_empty() || have.is_empty() {
        return 0;
    }
    if want == have {
        return 500;
    }

    let mut score: i64 = 0;
    if have.starts_with(want) || want.starts_with(have) {
        score += 200;
    }
    if have.contains(want) || want.contains(have) {
        score += 120;
    }

    let a: HashSet<&str> = want.split(' ').collect();
    let b: HashSet<&str> = have.split(' ').collect();
    let union = a.union(&b).count().max(1);
    score += (300 * a.intersection(&b).count() / union) as i64;
    score += (have.len().min(180) / 6) as i64;
    score
}

/// Best index entry for `title`, if it clears the match threshold.
pub fn best_index_match(title: &str, entries: &[String]) -> Option<(String, i64)> {
    let want = norm_for_match(title);
    let mut best: Option<(&String, i64)> = None;
    for entry in entries {
        let score = score_match(&want, &norm_for_match(entry));
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((entry, score));
        }
    }
    best.filter(|(_, s)| *s >= INDEX_MATCH_THRESHOLD)
        .map(|(name, s)| (name.clone(), s))
}

/// Libretro box art and screenshots, found by file name.
#[derive(Debug, Clone)]
pub struct LibretroProvider {
    settings: LibretroSettings,
    downloader: CachedDownloader,
}

impl LibretroProvider {
    /// Provider using `settings`, downloading through `downloader`.
    pub fn new(settings: LibretroSettings, downloader: CachedDownloader) -> Self {
        Self {
            settings,
            downloader,
        }
    }

    fn playlist_for(&self, platform: &PlatformKey) -> Option<&str> {
        self.settings.playlist_names.get(platform).map(String::as_str)
    }

    fn dir_url(&self, playlist: &str, type_dir: &str) -> String {
        format!(
            "{}/{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            quote_segment(playlist),
            quote_segment(type_dir)
        )
    }

    /// URL of `stem.png` in a playlist folder.
    pub fn thumbnail_url(&self, playlist: &str, type_dir: &str, stem: &str) -> String {
        format!(
            "{}/{}",
            self.dir_url(playlist, type_dir),
            quote_segment(&format!("{stem}.png"))
        )
    }

    /// `None` on 404 or any other failure; the caller moves on.
    async fn try_download(&self, kind: ArtworkKind, url: &str) -> Option<Vec<u8>> {
        match self.downloader.fetch(kind, url).await {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(ArtError::HttpStatus { status, .. }) if status.as_u16() == 404 => None,
            Err(err) => {
                debug!("[libretro] {} failed: {}", url, err);
                None
            }
        }
    }

    /// Directory listing for one playlist/type, cached for
    /// `index_cache_hours`.
    pub async fn index(
        &self,
        playlist: &str,
        type_dir: &str,
    ) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/", self.dir_url(playlist, type_dir));
        let key = BlobKey::for_url("libretro_index", &url);
        let max_age = Duration::from_secs(self.settings.index_cache_hours * 3600);
        let store = self.downloader.store();

        if let Some(bytes) = store.read_fresh(&key, max_age).await? {
            let text = String::from_utf8_lossy(&bytes);
            let entries: Vec<String> = text
                .lines()
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
            if !entries.is_empty() {
                debug!("[libretro] index cache hit for {}/{}", playlist, type_dir);
                return Ok(entries);
            }
        }

        let response = self
            .downloader
            .http()
            .send(|c| c.get(&url).timeout(self.settings.timeout))
            .await?;
        let html = response.text().await?;
        let entries = parse_index(&html);
        info!(
            "[libretro] indexed {} thumbnails for {}/{}",
            entries.len(),
            playlist,
            type_dir
        );
        if !entries.is_empty() {
            store.write(&key, entries.join("\n").as_bytes()).await?;
        }
        Ok(entries)
    }

    async fn fetch_thumbnail(
        &self,
        req: &ArtworkRequest,
        type_dir: &str,
        kind: ArtworkKind,
        source: &str,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        let Some(playlist) = self.playlist_for(&req.platform) else {
            debug!("[libretro] no playlist for {}", req.platform);
            return Ok(None);
        };

        let option = |url: String, bytes: Vec<u8>| {
            ArtworkOption::new(ProviderId::Libretro, SourceTag::new(source), kind, bytes)
                .with_url(url)
        };

        for stem in candidate_names(&req.title) {
            let url = self.thumbnail_url(playlist, type_dir, &stem);
            if let Some(bytes) = self.try_download(kind, &url).await {
                debug!("[libretro] direct hit '{}'", stem);
                return Ok(Some(option(url, bytes)));
            }
        }

        if !self.settings.use_index_matching {
            return Ok(None);
        }

        let entries = self.index(playlist, type_dir).await?;
        let Some((name, score)) = best_index_match(&req.title, &entries) else {
            debug!("[libretro] no index match for '{}'", req.title);
            return Ok(None);
        };
        debug!("[libretro] index match '{}' (score={})", name, score);
        let stem = name.strip_suffix(".png").unwrap_or(&name);
        let url = self.thumbnail_url(playlist, type_dir, stem);
        Ok(self
            .try_download(kind, &url)
            .await
            .map(|bytes| option(url, bytes)))
    }
}

#[async_trait]
impl ArtworkProvider for LibretroProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Libretro
    }

    async fn fetch_icon(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        self.fetch_thumbnail(req, BOXARTS_DIR, ArtworkKind::Icon, SourceTag::LIBRETRO_BOXART)
            .await
    }

    async fn fetch_screenshots(
        &self,
        req: &ArtworkRequest,
        count: usize,
    ) -> Result<Vec<ArtworkOption>, ProviderError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .fetch_thumbnail(req, SNAPS_DIR, ArtworkKind::Slide, "libretro_snap")
            .await?
            .into_iter()
            .collect())
    }
}
