//! ROM library discovery over a temp directory tree.

use std::fs;
use std::path::Path;

use iisu_core::scan::{RomScanner, find_iisu_directory, scan_iisu_directory, scan_platform_folder};
use iisu_model::{PlatformKey, Region};
use tempfile::TempDir;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, b"rom").expect("write");
}

fn seed(root: &Path) {
    touch(&root.join("NES/Metroid (USA).nes"));
    touch(&root.join("NES/Zelda II - The Adventure of Link (Europe).nes"));
    touch(&root.join("NES/Metroid (USA) (Rev 1).nes"));
    touch(&root.join("NES/readme.txt"));
    touch(&root.join("NES/Tetris (World).zip"));
    touch(&root.join("NES/saves/Metroid.sav"));
    touch(&root.join("Mega Drive/Sonic the Hedgehog (Japan).zip"));
    touch(&root.join("Random Stuff/notes.nes"));
}

#[test]
fn platform_folder_lists_clean_titles_with_regions() {
    let dir = TempDir::new().expect("tempdir");
    seed(dir.path());

    let games = scan_platform_folder(&dir.path().join("NES"), &PlatformKey::new("NES"));
    let titles: Vec<&str> = games.iter().map(|g| g.title.as_str()).collect();
    assert_eq!(titles, ["Metroid", "Tetris", "Zelda II - The Adventure of Link"]);
    assert_eq!(games[0].region, Region::Usa);
    assert_eq!(games[1].region, Region::World);
    assert_eq!(games[2].region, Region::Eur);
}

#[test]
fn directory_scan_groups_by_detected_platform() {
    let dir = TempDir::new().expect("tempdir");
    seed(dir.path());

    let library = scan_iisu_directory(dir.path());
    assert_eq!(
        library.keys().cloned().collect::<Vec<_>>(),
        vec![PlatformKey::new("GENESIS"), PlatformKey::new("NES")]
    );
    assert_eq!(library[&PlatformKey::new("GENESIS")][0].region, Region::Jpn);
}

#[test]
fn scanner_caches_until_forced() {
    let dir = TempDir::new().expect("tempdir");
    seed(dir.path());

    let mut scanner = RomScanner::new(dir.path());
    assert_eq!(scanner.total_game_count(), 4);

    touch(&dir.path().join("NES/Excitebike (USA).nes"));
    assert_eq!(scanner.total_game_count(), 4);
    scanner.scan(true);
    assert_eq!(scanner.total_game_count(), 5);

    let hits = scanner.search("metroid", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, PlatformKey::new("NES"));
    assert!(scanner.search("sonic", Some(&PlatformKey::new("NES"))).is_empty());
    assert_eq!(scanner.games(&PlatformKey::new("GENESIS")).len(), 1);
}

#[test]
fn finds_rom_root_by_folder_name() {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("Documents")).expect("mkdir");
    seed(&dir.path().join("Roms"));

    assert_eq!(
        find_iisu_directory(&[dir.path().to_path_buf()]),
        Some(dir.path().join("Roms"))
    );
    assert_eq!(find_iisu_directory(&[dir.path().join("Documents")]), None);
}
