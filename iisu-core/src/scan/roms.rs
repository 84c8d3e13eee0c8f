use std::path::Path;

use iisu_model::{ARCHIVE_EXTENSIONS, PlatformKey, all_rom_extensions};

/// Stems that are never games.
const NON_ROM_NAMES: &[&str] = &[
    "systeminfo", "thumbs.db", "desktop.ini", ".ds_store", "icon.ico", "readme", "readme.txt",
    "readme.md", "info.txt", "nfo", "info", "save", "saves", "savegame", "savedata", "battery",
    "config", "settings", "options", "preferences", "cue", "m3u", "playlist", "cheats", "cheat",
    "cht", "patch", "ips", "bps", "ups", "screenshot", "screenshots", "boxart", "cover", "manual",
    "artwork", "retroarch", "core", "cores", "system", "bios",
];

const NON_ROM_EXTENSIONS: &[&str] = &[
    ".txt", ".nfo", ".diz", ".doc", ".docx", ".pdf", ".htm", ".html", ".jpg", ".jpeg", ".png",
    ".gif", ".bmp", ".webp", ".ico", ".svg", ".xml", ".json", ".yaml", ".yml", ".ini", ".cfg",
    ".conf", ".config", ".log", ".dat", ".db", ".sqlite", ".sav", ".srm", ".sta", ".state",
    ".m3u", ".cue", ".sfv", ".md5", ".sha1", ".par", ".par2", ".exe", ".dll", ".bat", ".sh",
    ".cmd", ".ps1", ".ips", ".bps", ".ups", ".xdelta", ".cht", ".mp3", ".ogg", ".wav", ".flac",
    ".mp4", ".avi", ".mkv",
];

const NON_ROM_PREFIXES: &[&str] = &["readme", "info", "nfo", "cheats", "manual", "cover", "boxart"];

/// Files whose presence alone does not make a folder a game.
const METADATA_FILES: &[&str] = &[
    "systeminfo.txt", "systeminfo", "info.txt", "readme.txt", ".nomedia", "thumbs.db",
    "desktop.ini", ".ds_store",
];

/// Lowercase extension with the leading dot, or `""`.
pub(crate) fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

pub(crate) fn lower_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

pub(crate) fn is_non_rom_name(name: &str) -> bool {
    NON_ROM_NAMES.contains(&name.to_lowercase().as_str())
}

/// Whether the file extension is a known ROM extension.
pub fn is_rom_file(path: &Path) -> bool {
    let ext = dotted_extension(path);
    !ext.is_empty() && all_rom_extensions().contains(&ext.as_str())
}

/// Whether the file is a `.zip`, `.7z` or similar archive.
pub fn is_archive_file(path: &Path) -> bool {
    ARCHIVE_EXTENSIONS.contains(&dotted_extension(path).as_str())
}

/// Metadata, saves, media and tool files that sit next to ROMs.
pub fn is_non_rom_file(path: &Path) -> bool {
    if NON_ROM_EXTENSIONS.contains(&dotted_extension(path).as_str()) {
        return true;
    }
    let stem = lower_stem(path);
    NON_ROM_NAMES.contains(&stem.as_str())
        || NON_ROM_PREFIXES.iter().any(|p| stem.starts_with(p))
}

/// True for a ROM of `platform`, or any known ROM when the platform has no
/// extension table. Archives always count.
pub fn is_platform_rom(path: &Path, platform: &PlatformKey) -> bool {
    if is_non_rom_file(path) {
        return false;
    }
    if is_archive_file(path) {
        return true;
    }
    let ext = dotted_extension(path);
    match platform.rom_extensions() {
        Some(exts) => exts.contains(&ext.as_str()),
        None => is_rom_file(path),
    }
}

fn is_metadata_name(name: &str) -> bool {
    METADATA_FILES.contains(&name.to_lowercase().as_str())
}

/// True when the folder holds files and every one is metadata.
pub fn is_systeminfo_only_folder(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    let mut any_file = false;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            return false;
        }
        any_file = true;
        let name = entry.file_name();
        if !is_metadata_name(&name.to_string_lossy()) {
            return false;
        }
    }
    any_file
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classifies_files() {
        assert!(is_rom_file(Path::new("Zelda.NES")));
        assert!(is_rom_file(Path::new("game.gba")));
        assert!(!is_rom_file(Path::new("notes")));
        assert!(is_archive_file(Path::new("Zelda.7z")));
        assert!(!is_archive_file(Path::new("Zelda.nes")));

        for meta in ["systeminfo.txt", "gamelist.xml", "cover.png", "Zelda.srm", "Zelda.state", "retroarch.cfg", "README"] {
            assert!(is_non_rom_file(Path::new(meta)), "{meta}");
        }
        assert!(!is_non_rom_file(Path::new("Zelda.nes")));
    }

    #[test]
    fn platform_roms_respect_extension_tables() {
        let gba = PlatformKey::new("GAME_BOY_ADVANCE");
        assert!(is_platform_rom(&PathBuf::from("Golden Sun.gba"), &gba));
        assert!(is_platform_rom(&PathBuf::from("Golden Sun.zip"), &gba));
        assert!(!is_platform_rom(&PathBuf::from("Golden Sun.nes"), &gba));
        assert!(is_platform_rom(
            &PathBuf::from("Thing.nes"),
            &PlatformKey::new("UNLISTED")
        ));
    }

    #[test]
    fn metadata_only_folders() {
        let dir = tempfile::tempdir().unwrap();
        let meta = dir.path().join("meta");
        std::fs::create_dir(&meta).unwrap();
        std::fs::write(meta.join("systeminfo.txt"), "x").unwrap();
        assert!(is_systeminfo_only_folder(&meta));

        std::fs::write(meta.join("game.iso"), "x").unwrap();
        assert!(!is_systeminfo_only_folder(&meta));

        let empty = dir.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(!is_systeminfo_only_folder(&empty));
    }
}
