//! Inventory of what is already generated under the output directory.

use std::path::{Path, PathBuf};

use iisu_model::{ArtworkKind, PlatformKey};
use tracing::debug;

use crate::scan::detect_platform_from_folder;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Assets found in one `{platform}/{game}` folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameAssets {
    /// Output subfolder name, e.g. `NES`.
    pub platform_folder: String,
    /// Platform the folder name resolves to, if any.
    pub platform: Option<PlatformKey>,
    /// Game folder name (a title slug).
    pub game: String,
    /// Full path of the game folder.
    pub dir: PathBuf,
    /// `icon.*`, when present.
    pub icon: Option<PathBuf>,
    /// `title.*`, when present.
    pub title: Option<PathBuf>,
    /// Number of `hero_N.*` files.
    pub hero_count: usize,
    /// Number of `slide_N.*` files.
    pub slide_count: usize,
}

impl GameAssets {
    /// Whether at least one file of `kind` exists.
    pub fn has(&self, kind: ArtworkKind) -> bool {
        match kind {
            ArtworkKind::Icon => self.icon.is_some(),
            ArtworkKind::Title => self.title.is_some(),
            ArtworkKind::Hero => self.hero_count > 0,
            ArtworkKind::Slide => self.slide_count > 0,
        }
    }
}

/// Folder name to platform: the iiSU shorthand first, then the alias table.
pub fn platform_for_folder(folder: &str) -> Option<PlatformKey> {
    PlatformKey::known()
        .find(|key| key.iisu_folder().eq_ignore_ascii_case(folder))
        .or_else(|| detect_platform_from_folder(folder))
}

fn sorted_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| entries.flatten().map(|e| e.path()).filter(|p| p.is_dir()).collect())
        .unwrap_or_default();
    dirs.retain(|p| {
        p.file_name()
            .is_some_and(|n| !n.to_string_lossy().starts_with('.'))
    });
    dirs.sort();
    dirs
}

fn is_numbered(stem: &str, prefix: &str) -> bool {
    stem.strip_prefix(prefix)
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn inspect_game(platform_folder: &str, platform: Option<&PlatformKey>, dir: PathBuf) -> GameAssets {
    let mut assets = GameAssets {
        platform_folder: platform_folder.to_string(),
        platform: platform.cloned(),
        game: dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        icon: None,
        title: None,
        hero_count: 0,
        slide_count: 0,
        dir,
    };

    let mut files: Vec<PathBuf> = std::fs::read_dir(&assets.dir)
        .map(|entries| entries.flatten().map(|e| e.path()).filter(|p| p.is_file()).collect())
        .unwrap_or_default();
    files.sort();

    for file in files {
        let is_image = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        let Some(stem) = file.file_stem().and_then(|s| s.to_str()).map(str::to_ascii_lowercase)
        else {
            continue;
        };
        if !is_image {
            continue;
        }
        match stem.as_str() {
            "icon" => {
                assets.icon.get_or_insert(file);
            }
            "title" => {
                assets.title.get_or_insert(file);
            }
            s if is_numbered(s, "hero_") => assets.hero_count += 1,
            s if is_numbered(s, "slide_") => assets.slide_count += 1,
            _ => {}
        }
    }
    assets
}

/// Every game folder under `output_dir`, sorted by platform folder then game.
pub fn scan_output(output_dir: &Path) -> Vec<GameAssets> {
    let mut games = Vec::new();
    for platform_dir in sorted_dirs(output_dir) {
        let folder = platform_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let platform = platform_for_folder(&folder);
        if platform.is_none() {
            debug!("[assets] unknown platform folder {}", folder);
        }
        for game_dir in sorted_dirs(&platform_dir) {
            games.push(inspect_game(&folder, platform.as_ref(), game_dir));
        }
    }
    games
}

/// Games lacking `kind`.
pub fn missing(games: &[GameAssets], kind: ArtworkKind) -> Vec<&GameAssets> {
    games.iter().filter(|g| !g.has(kind)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"img").unwrap();
    }

    #[test]
    fn inventories_games_and_counts_numbered_assets() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        touch(&out.join("nes/Metroid/icon.jpg"));
        touch(&out.join("nes/Metroid/title.png"));
        touch(&out.join("nes/Metroid/hero_1.jpg"));
        touch(&out.join("nes/Metroid/slide_1.jpg"));
        touch(&out.join("nes/Metroid/slide_2.jpg"));
        touch(&out.join("nes/Metroid/notes.txt"));
        touch(&out.join("nes/Zelda/title.jpg"));
        touch(&out.join("qqq/Thing/icon.png"));

        let games = scan_output(out);
        assert_eq!(games.len(), 3);

        let metroid = &games[0];
        assert_eq!(metroid.game, "Metroid");
        assert_eq!(metroid.platform, Some(PlatformKey::new("NES")));
        assert!(metroid.icon.is_some());
        assert_eq!((metroid.hero_count, metroid.slide_count), (1, 2));

        assert_eq!(games[2].platform_folder, "qqq");
        assert_eq!(games[2].platform, None);

        let no_icon = missing(&games, ArtworkKind::Icon);
        assert_eq!(no_icon.len(), 1);
        assert_eq!(no_icon[0].game, "Zelda");
        assert_eq!(missing(&games, ArtworkKind::Hero).len(), 2);
    }

    #[test]
    fn missing_output_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_output(&dir.path().join("nope")).is_empty());
    }
}
