//! Per-platform title lists: a zipped JSON games database, with a
//! Wikipedia "List of games" page as fallback.

/// Wikipedia list-of-games fallback
pub mod wikipedia;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use iisu_model::PlatformKey;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::sha256_hex;
use crate::error::{ArtError, Result};
use crate::http::HttpFetcher;
use crate::titles::norm_key;

/// Archive of the games database repository.
pub const DEFAULT_REPO_ZIP_URL: &str =
    "https://github.com/PigSaint/EveryVideoGameEver/archive/refs/heads/main.zip";
/// Folder inside [`DEFAULT_REPO_ZIP_URL`] holding the platform files.
pub const DEFAULT_GAMESDB_SUBDIR: &str = "EveryVideoGameEver-main/GamesDB";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(180);
const PREFERRED_KEYS: &[&str] = &["name", "title", "game", "Game", "Title", "Name"];
const CONTAINER_KEYS: &[&str] = &["data", "games", "items", "list", "entries"];

/// Dataset file stem → titles, in file order.
pub type PlatformTitles = BTreeMap<String, Vec<String>>;

/// Downloads and unpacks dataset archives under a cache directory.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    cache_dir: PathBuf,
    http: HttpFetcher,
}

impl DatasetStore {
    /// Store archives under `cache_dir`, downloading through `http`.
    pub fn new(cache_dir: PathBuf, http: HttpFetcher) -> Self {
        Self { cache_dir, http }
    }

    /// Where archives and their unpacked trees live.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Extraction directory for `url`; the archive is fetched and unpacked
    /// on first use only.
    pub async fn ensure(&self, url: &str) -> Result<PathBuf> {
        let key = sha256_hex(url);
        let zip_path = self.cache_dir.join(format!("{key}.zip"));
        let extract_root = self.cache_dir.join(format!("{key}_extracted"));

        if tokio::fs::try_exists(&extract_root).await? {
            debug!("[dataset] using extracted {}", extract_root.display());
            return Ok(extract_root);
        }
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        if !tokio::fs::try_exists(&zip_path).await? {
            info!("[dataset] downloading {}", url);
            let response = self
                .http
                .send(|c| c.get(url).timeout(DOWNLOAD_TIMEOUT))
                .await?;
            let bytes = response.bytes().await?;
            tokio::fs::write(&zip_path, &bytes).await?;
        }

        info!("[dataset] extracting {}", zip_path.display());
        let staging = self.cache_dir.join(format!("{key}_extracting"));
        let target = extract_root.clone();
        tokio::task::spawn_blocking(move || extract_zip(&zip_path, &staging, &target))
            .await??;
        Ok(extract_root)
    }
}

/// Unpack into `staging`, then rename, so an interrupted extraction is
/// never mistaken for a finished one.
fn extract_zip(zip_path: &Path, staging: &Path, target: &Path) -> Result<()> {
    if staging.exists() {
        fs::remove_dir_all(staging)?;
    }
    fs::create_dir_all(staging)?;
    let mut archive = zip::ZipArchive::new(fs::File::open(zip_path)?)?;
    archive.extract(staging)?;
    fs::rename(staging, target)?;
    Ok(())
}

fn json_files_sorted(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

/// Read every `*.json` below `root/subdir` into a platform → titles map.
pub fn load_platform_titles(root: &Path, subdir: &str) -> Result<PlatformTitles> {
    let gamesdb = root.join(subdir);
    if !gamesdb.is_dir() {
        return Err(ArtError::NotFound(format!(
            "games database at {}",
            gamesdb.display()
        )));
    }

    let mut map = PlatformTitles::new();
    for path in json_files_sorted(&gamesdb) {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let value: Value = match fs::read(&path)
            .map_err(ArtError::from)
            .and_then(|bytes| Ok(serde_json::from_slice(&bytes)?))
        {
            Ok(value) => value,
            Err(err) => {
                warn!("[dataset] skipping {}: {}", path.display(), err);
                continue;
            }
        };
        let titles = extract_titles_from_json(&value);
        if !titles.is_empty() {
            map.entry(stem.to_string()).or_insert(titles);
        }
    }

    if map.is_empty() {
        return Err(ArtError::NotFound(format!(
            "no platform titles under {}",
            gamesdb.display()
        )));
    }
    info!("[dataset] loaded {} platforms", map.len());
    Ok(map)
}

fn title_of(item: &Value) -> Option<String> {
    let non_empty = |v: &Value| {
        v.as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    match item {
        Value::String(_) => non_empty(item),
        Value::Object(fields) => PREFERRED_KEYS
            .iter()
            .find_map(|k| fields.get(*k).and_then(non_empty))
            .or_else(|| fields.values().find_map(non_empty)),
        _ => None,
    }
}

fn dedupe_case_insensitive(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

/// Titles from one dataset JSON document. An object with a
/// `data|games|items|list|entries` array yields that array's titles; any
/// other object is a single entry.
pub fn extract_titles_from_json(value: &Value) -> Vec<String> {
    match value {
        Value::Object(fields) => {
            let container = CONTAINER_KEYS
                .iter()
                .find_map(|k| fields.get(*k).and_then(Value::as_array));
            match container {
                Some(items) => dedupe_case_insensitive(items.iter().filter_map(title_of)),
                None => title_of(value).into_iter().collect(),
            }
        }
        Value::Array(items) => dedupe_case_insensitive(items.iter().filter_map(title_of)),
        _ => Vec::new(),
    }
}

/// Dataset key for `platform` by `norm_key` equality against the platform
/// key and its aliases. Prefixes never match, so `DS` cannot pick up `3DS`.
pub fn match_dataset_key<'a>(
    map: &'a PlatformTitles,
    aliases: &[String],
    platform: &PlatformKey,
) -> Option<&'a str> {
    let wanted: Vec<String> = aliases
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(platform.as_str()))
        .map(norm_key)
        .filter(|k| !k.is_empty())
        .collect();
    map.keys()
        .find(|key| wanted.contains(&norm_key(key)))
        .map(String::as_str)
}

/// Titles for `platform` from the dataset, else from the Wikipedia list.
/// Returns the source label with the titles.
pub async fn resolve_platform_titles(
    map: &PlatformTitles,
    aliases: &[String],
    platform: &PlatformKey,
    wikipedia_url: Option<&str>,
    http: &HttpFetcher,
) -> Result<(String, Vec<String>)> {
    if let Some(key) = match_dataset_key(map, aliases, platform)
        && let Some(titles) = map.get(key)
    {
        return Ok((key.to_string(), titles.clone()));
    }

    if let Some(url) = wikipedia_url.filter(|u| !u.trim().is_empty()) {
        info!("[dataset] {} not in dataset, trying Wikipedia", platform);
        let titles = wikipedia::fetch_game_list(http, url).await?;
        if !titles.is_empty() {
            return Ok((format!("Wikipedia ({platform})"), titles));
        }
    }

    Err(ArtError::NotFound(format!(
        "no dataset titles for platform {platform}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn map(entries: &[(&str, &[&str])]) -> PlatformTitles {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn extracts_from_containers_and_lists() {
        let doc = json!({ "games": [
            { "id": 1, "name": "Metroid" },
            { "Title": "Kid Icarus" },
            { "id": 3, "label": "Zelda II" },
            "metroid",
            42
        ]});
        assert_eq!(
            extract_titles_from_json(&doc),
            vec!["Metroid", "Kid Icarus", "Zelda II"]
        );

        let list = json!(["Tetris", " Dr. Mario ", ""]);
        assert_eq!(extract_titles_from_json(&list), vec!["Tetris", "Dr. Mario"]);

        let single = json!({ "title": "Solo" });
        assert_eq!(extract_titles_from_json(&single), vec!["Solo"]);
        assert!(extract_titles_from_json(&json!(7)).is_empty());
    }

    #[test]
    fn preferred_keys_win_over_other_strings() {
        let doc = json!([{ "developer": "Nintendo", "game": "Excitebike" }]);
        assert_eq!(extract_titles_from_json(&doc), vec!["Excitebike"]);
    }

    #[test]
    fn dataset_keys_match_exactly_not_by_prefix() {
        let m = map(&[
            ("Nintendo 3DS", &["Pilotwings Resort"]),
            ("Nintendo DS", &["Nintendogs"]),
        ]);
        let key = match_dataset_key(
            &m,
            &["Nintendo DS".to_string()],
            &PlatformKey::new("NINTENDO_DS"),
        );
        assert_eq!(key, Some("Nintendo DS"));

        let none = match_dataset_key(&m, &["DS".to_string()], &PlatformKey::new("DS"));
        assert_eq!(none, None);
    }

    #[test]
    fn loads_sorted_json_files_and_skips_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("GamesDB/sub");
        fs::create_dir_all(&db).unwrap();
        fs::write(db.join("Nintendo Entertainment System.json"), r#"["Metroid"]"#).unwrap();
        fs::write(db.join("Broken.json"), "{not json").unwrap();
        fs::write(db.join("Empty.json"), "[]").unwrap();
        fs::write(db.join("notes.txt"), "ignored").unwrap();

        let titles = load_platform_titles(dir.path(), "GamesDB").unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles["Nintendo Entertainment System"], vec!["Metroid"]);

        let missing = load_platform_titles(dir.path(), "Nope").unwrap_err();
        assert!(matches!(missing, ArtError::NotFound(_)));
    }

    #[test]
    fn empty_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("GamesDB")).unwrap();
        assert!(load_platform_titles(dir.path(), "GamesDB").is_err());
    }

    #[tokio::test]
    async fn ensure_reuses_a_cached_archive() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://example.invalid/games.zip";
        let key = sha256_hex(url);

        // Pre-seed the archive so no download happens.
        let zip_path = dir.path().join(format!("{key}.zip"));
        {
            let file = fs::File::create(&zip_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer
                .start_file(
                    "repo/GamesDB/Sega Genesis.json",
                    zip::write::SimpleFileOptions::default(),
                )
                .unwrap();
            writer.write_all(br#"["Sonic the Hedgehog"]"#).unwrap();
            writer.finish().unwrap();
        }

        let http = HttpFetcher::new(Default::default()).unwrap();
        let store = DatasetStore::new(dir.path().to_path_buf(), http);
        let root = store.ensure(url).await.unwrap();
        assert_eq!(root, dir.path().join(format!("{key}_extracted")));

        let titles = load_platform_titles(&root, "repo/GamesDB").unwrap();
        assert_eq!(titles["Sega Genesis"], vec!["Sonic the Hedgehog"]);

        // Second call short-circuits on the extracted directory.
        fs::remove_file(&zip_path).unwrap();
        assert_eq!(store.ensure(url).await.unwrap(), root);
    }

    #[tokio::test]
    async fn unresolved_platform_without_fallback_is_not_found() {
        let http = HttpFetcher::new(Default::default()).unwrap();
        let m = map(&[("Sega Genesis", &["Sonic"])]);
        let err = resolve_platform_titles(&m, &[], &PlatformKey::new("NES"), None, &http)
            .await
            .unwrap_err();
        assert!(matches!(err, ArtError::NotFound(_)));

        let (source, titles) = resolve_platform_titles(
            &m,
            &["Sega Genesis".to_string()],
            &PlatformKey::new("GENESIS"),
            None,
            &http,
        )
        .await
        .unwrap();
        assert_eq!(source, "Sega Genesis");
        assert_eq!(titles, vec!["Sonic"]);
    }
}
