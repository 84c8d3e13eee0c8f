use std::fs::File;
use std::io::Read;
use std::path::Path;

use iisu_model::{PlatformKey, Region};
use once_cell::sync::Lazy;
use regex::Regex;

use super::roms::is_archive_file;

static PAREN_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^)]+)\)").expect("paren regex should compile"));
static BRACKET_CODES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[([UEJAFGISK!phTabo]+)\]").expect("bracket regex should compile")
});

const N64_MAGIC: [[u8; 4]; 4] = [
    [0x80, 0x37, 0x12, 0x40],
    [0x37, 0x80, 0x40, 0x12],
    [0x40, 0x12, 0x37, 0x80],
    [0x12, 0x40, 0x80, 0x37],
];

fn from_paren(content: &str) -> Option<Region> {
    let content = content.trim().to_lowercase();
    if content.contains(',') {
        let parts: Vec<Region> = content
            .split(',')
            .filter_map(|p| Region::from_code(p.trim()))
            .collect();
        if let Some(region) = Region::combine(&parts) {
            return Some(region);
        }
    }
    if let Some(region) = Region::from_code(&content) {
        return Some(region);
    }
    // "(USA Rev 1)", "(Europe) (En,Fr)"; single letters only count alone.
    content
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .filter(|word| word.len() >= 2)
        .and_then(Region::from_code)
}

fn from_brackets(content: &str) -> Option<Region> {
    let content = content.to_lowercase();
    if let Some(region) = Region::from_code(&content) {
        return Some(region);
    }
    if content.len() > 4 {
        return None;
    }
    let letters: Vec<Region> = content
        .chars()
        .filter_map(|c| Region::from_code(c.encode_utf8(&mut [0; 4])))
        .collect();
    Region::combine(&letters)
}

/// Region from `(USA)`, `(USA, Europe)`, `[U]` or `[JUE]` style tags.
pub fn detect_region_from_filename(filename: &str) -> Region {
    for caps in PAREN_GROUP.captures_iter(filename) {
        if let Some(region) = from_paren(&caps[1]) {
            return region;
        }
    }
    BRACKET_CODES
        .captures_iter(filename)
        .find_map(|caps| from_brackets(&caps[1]))
        .unwrap_or(Region::Unknown)
}

/// Region byte from a cartridge header. Only GBA, DS/3DS and N64 images
/// carry one we can read.
pub fn region_from_header_bytes(header: &[u8], platform: &PlatformKey) -> Option<Region> {
    let code_at = |offset: usize| header.get(offset).map(|b| b.to_ascii_uppercase());
    match platform.as_str() {
        "GAME_BOY_ADVANCE" => match code_at(0xAC + 3)? {
            b'J' => Some(Region::Jpn),
            b'E' => Some(Region::Usa),
            b'P' => Some(Region::Eur),
            b'D' => Some(Region::Ger),
            b'F' => Some(Region::Fra),
            b'I' => Some(Region::Ita),
            b'S' => Some(Region::Spa),
            _ => None,
        },
        "NINTENDO_DS" | "NINTENDO_3DS" => match code_at(0x0C + 3)? {
            b'J' => Some(Region::Jpn),
            b'E' => Some(Region::Usa),
            b'U' if platform.as_str() == "NINTENDO_DS" => Some(Region::Usa),
            b'P' => Some(Region::Eur),
            b'K' => Some(Region::Kor),
            b'C' => Some(Region::Chn),
            b'W' => Some(Region::World),
            _ => None,
        },
        "N64" => {
            let magic: [u8; 4] = header.get(..4)?.try_into().ok()?;
            if !N64_MAGIC.contains(&magic) {
                return None;
            }
            match code_at(0x3E)? {
                b'E' => Some(Region::Usa),
                b'J' => Some(Region::Jpn),
                b'P' => Some(Region::Eur),
                b'D' => Some(Region::Ger),
                b'F' => Some(Region::Fra),
                b'U' => Some(Region::Aus),
                b'C' => Some(Region::Chn),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Read the first 512 bytes of a ROM and look for a header region.
/// Archives and unreadable files yield `None`.
pub fn detect_region_from_header(path: &Path, platform: &PlatformKey) -> Option<Region> {
    if !path.is_file() || is_archive_file(path) {
        return None;
    }
    let mut header = Vec::with_capacity(512);
    File::open(path)
        .ok()?
        .take(512)
        .read_to_end(&mut header)
        .ok()?;
    region_from_header_bytes(&header, platform)
}

/// Filename tags first, header bytes as fallback.
pub fn detect_region(filename: &str, path: Option<&Path>, platform: Option<&PlatformKey>) -> Region {
    let region = detect_region_from_filename(filename);
    if region != Region::Unknown {
        return region;
    }
    match (path, platform) {
        (Some(path), Some(platform)) => {
            detect_region_from_header(path, platform).unwrap_or(Region::Unknown)
        }
        _ => Region::Unknown,
    }
}
