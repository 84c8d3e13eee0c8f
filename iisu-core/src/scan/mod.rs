//! ROM library scanning: platform folder detection, game discovery and
//! region tags.

/// Region detection from file names and ROM headers
pub mod region;
/// ROM and archive extension checks
pub mod roms;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use iisu_model::{PlatformKey, Region};
use tracing::{debug, info};

use crate::titles::{clean_game_title, normalize_for_search};

pub use region::{
    detect_region, detect_region_from_filename, detect_region_from_header,
    region_from_header_bytes,
};
pub use roms::{
    is_archive_file, is_non_rom_file, is_platform_rom, is_rom_file, is_systeminfo_only_folder,
};

/// Folder names commonly used for an iiSU ROM root.
pub const IISU_ROOT_NAMES: &[&str] =
    &["iiSU", "iisu", "IISU", "Roms", "ROMs", "roms", "Games", "games"];

/// Shortest folder alias allowed to match inside a longer folder name.
const MIN_PARTIAL_ALIAS: usize = 3;

/// One game found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomEntry {
    /// Title cleaned from the file or folder name.
    pub title: String,
    /// Path of the ROM file or folder.
    pub path: PathBuf,
    /// Region from the name, else from the header.
    pub region: Region,
}

/// Games per platform.
pub type RomLibrary = BTreeMap<PlatformKey, Vec<RomEntry>>;

/// Platform for an on-disk folder name: an exact alias or platform key,
/// then the longest known alias contained in the name.
pub fn detect_platform_from_folder(name: &str) -> Option<PlatformKey> {
    if let Some(key) = PlatformKey::from_folder_exact(name) {
        return Some(key);
    }
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    if let Some(key) = PlatformKey::known().find(|k| k.as_str().eq_ignore_ascii_case(&wanted)) {
        return Some(key);
    }

    PlatformKey::known()
        .flat_map(|key| {
            key.folder_aliases()
                .iter()
                .map(move |alias| (key.clone(), alias.to_lowercase()))
        })
        .filter(|(_, alias)| alias.len() >= MIN_PARTIAL_ALIAS && wanted.contains(alias.as_str()))
        .max_by_key(|(_, alias)| alias.len())
        .map(|(key, _)| key)
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(err) => {
            debug!("[scan] cannot read {}: {}", dir.display(), err);
            Vec::new()
        }
    };
    paths.sort();
    paths
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// A game folder holds ROMs directly, or sub-folders (multi-disc sets and
/// extracted disc layouts).
fn is_game_folder(dir: &Path, platform: &PlatformKey) -> bool {
    sorted_entries(dir)
        .iter()
        .any(|p| p.is_dir() || (p.is_file() && is_platform_rom(p, platform)))
}

fn sort_and_dedupe(entries: &mut Vec<RomEntry>) {
    entries.sort_by_key(|e| e.title.to_lowercase());
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.title.to_lowercase()));
}

/// Games in one platform folder: loose ROM files plus per-game folders.
pub fn scan_platform_folder(dir: &Path, platform: &PlatformKey) -> Vec<RomEntry> {
    let mut games = Vec::new();
    for path in sorted_entries(dir) {
        let name = file_name(&path);
        if path.is_dir() {
            if name.starts_with('.')
                || roms::is_non_rom_name(name)
                || is_systeminfo_only_folder(&path)
                || !is_game_folder(&path, platform)
            {
                continue;
            }
            let title = clean_game_title(name);
            if !title.is_empty() {
                games.push(RomEntry {
                    region: detect_region_from_filename(name),
                    title,
                    path,
                });
            }
        } else if path.is_file() && is_platform_rom(&path, platform) {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            let title = clean_game_title(stem);
            if !title.is_empty() {
                games.push(RomEntry {
                    region: detect_region(name, Some(&path), Some(platform)),
                    title,
                    path,
                });
            }
        }
    }
    sort_and_dedupe(&mut games);
    games
}

/// Scan every recognised platform folder under `root`.
pub fn scan_iisu_directory(root: &Path) -> RomLibrary {
    let mut library = RomLibrary::new();
    if !root.is_dir() {
        return library;
    }
    for dir in sorted_entries(root).into_iter().filter(|p| p.is_dir()) {
        if is_systeminfo_only_folder(&dir) {
            continue;
        }
        let Some(platform) = detect_platform_from_folder(file_name(&dir)) else {
            debug!("[scan] unrecognised folder {}", dir.display());
            continue;
        };
        let games = scan_platform_folder(&dir, &platform);
        library.entry(platform).or_default().extend(games);
    }
    for games in library.values_mut() {
        sort_and_dedupe(games);
    }
    info!(
        "[scan] {} platforms, {} games under {}",
        library.len(),
        library.values().map(Vec::len).sum::<usize>(),
        root.display()
    );
    library
}

/// First `IISU_ROOT_NAMES` folder below one of `search_paths` that contains
/// at least one platform folder.
pub fn find_iisu_directory(search_paths: &[PathBuf]) -> Option<PathBuf> {
    search_paths
        .iter()
        .filter(|p| p.is_dir())
        .flat_map(|p| sorted_entries(p))
        .filter(|p| p.is_dir() && IISU_ROOT_NAMES.contains(&file_name(p)))
        .find(|candidate| {
            sorted_entries(candidate)
                .iter()
                .any(|sub| sub.is_dir() && detect_platform_from_folder(file_name(sub)).is_some())
        })
}

/// Caches the last scan of a ROM root.
#[derive(Debug, Default)]
pub struct RomScanner {
    root: Option<PathBuf>,
    library: Option<RomLibrary>,
}

impl RomScanner {
    /// Scanner for the ROM root at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            library: None,
        }
    }

    /// Scan unless a cached result exists; `force` rescans.
    pub fn scan(&mut self, force: bool) -> &RomLibrary {
        if force || self.library.is_none() {
            let library = self
                .root
                .as_deref()
                .map(scan_iisu_directory)
                .unwrap_or_default();
            self.library = Some(library);
        }
        self.library.get_or_insert_default()
    }

    /// Platforms found under the root.
    pub fn platforms(&mut self) -> Vec<PlatformKey> {
        self.scan(false).keys().cloned().collect()
    }

    /// Games found for `platform`.
    pub fn games(&mut self, platform: &PlatformKey) -> &[RomEntry] {
        self.scan(false)
            .get(platform)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Games across every platform.
    pub fn total_game_count(&mut self) -> usize {
        self.scan(false).values().map(Vec::len).sum()
    }

    /// Case-insensitive substring search over clean and normalized titles.
    pub fn search(
        &mut self,
        query: &str,
        platform: Option<&PlatformKey>,
    ) -> Vec<(PlatformKey, RomEntry)> {
        let needle = query.trim().to_lowercase();
        let needle_norm = normalize_for_search(query).to_lowercase();
        let library = self.scan(false);
        library
            .iter()
            .filter(|(key, _)| platform.is_none_or(|p| p == *key))
            .flat_map(|(key, games)| games.iter().map(move |g| (key, g)))
            .filter(|(_, game)| {
                game.title.to_lowercase().contains(&needle)
                    || (!needle_norm.is_empty()
                        && normalize_for_search(&game.title)
                            .to_lowercase()
                            .contains(&needle_norm))
            })
            .map(|(key, game)| (key.clone(), game.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_detection() {
        let cases = [
            ("NES", Some("NES")),
            ("snes", Some("SNES")),
            ("Nintendo - Game Boy Advance", Some("GAME_BOY_ADVANCE")),
            ("PlayStation 2 Games", Some("PS2")),
            ("game_boy_color", Some("GAME_BOY_COLOR")),
            ("Random Stuff", None),
        ];
        for (folder, want) in cases {
            assert_eq!(
                detect_platform_from_folder(folder),
                want.map(PlatformKey::new),
                "{folder}"
            );
        }
    }
}
