use std::borrow::Borrow;
use std::fmt::{self, Display};

/// Upper-case platform identifier such as `NES` or `GAMECUBE`.
///
/// Configuration files, dataset aliases and the launcher folder tables all
/// key on this form. Construction normalizes case and trims whitespace so
/// `"gamecube"` and `" GameCube "` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub struct PlatformKey(String);

impl PlatformKey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Folder name the iiSU launcher uses on device for this platform.
    pub fn iisu_folder(&self) -> String {
        IISU_FOLDERS
            .iter()
            .find(|(key, _)| *key == self.0)
            .map(|(_, folder)| (*folder).to_string())
            .unwrap_or_else(|| self.0.to_ascii_lowercase())
    }

    /// Known ROM extensions (lowercase, with leading dot) for this platform.
    pub fn rom_extensions(&self) -> Option<&'static [&'static str]> {
        ROM_EXTENSIONS
            .iter()
            .find(|(key, _)| *key == self.0)
            .map(|(_, exts)| *exts)
    }

    /// Folder names (any case) that identify this platform on disk.
    pub fn folder_aliases(&self) -> &'static [&'static str] {
        PLATFORM_FOLDER_ALIASES
            .iter()
            .find(|(key, _)| *key == self.0)
            .map(|(_, names)| *names)
            .unwrap_or(&[])
    }

    /// Reverse lookup of an on-disk folder name, exact and case-insensitive.
    pub fn from_folder_exact(folder: &str) -> Option<Self> {
        let wanted = folder.trim().to_lowercase();
        PLATFORM_FOLDER_ALIASES.iter().find_map(|(key, names)| {
            names
                .iter()
                .any(|name| name.to_lowercase() == wanted)
                .then(|| Self::new(key))
        })
    }

    /// Every platform key the folder tables know about.
    pub fn known() -> impl Iterator<Item = PlatformKey> {
        PLATFORM_FOLDER_ALIASES.iter().map(|(key, _)| Self::new(key))
    }
}

impl Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PlatformKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for PlatformKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<PlatformKey> for String {
    fn from(value: PlatformKey) -> Self {
        value.0
    }
}

impl Borrow<str> for PlatformKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PlatformKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Archive extensions that may wrap a ROM on any platform.
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".7z", ".rar"];

/// Union of every ROM extension across all platforms, deduplicated.
pub fn all_rom_extensions() -> Vec<&'static str> {
    let mut all: Vec<&'static str> = ROM_EXTENSIONS
        .iter()
        .flat_map(|(_, exts)| exts.iter().copied())
        .collect();
    all.sort_unstable();
    all.dedup();
    all
}

pub const ROM_EXTENSIONS: &[(&str, &[&str])] = &[
    ("NES", &[".nes", ".nez", ".unf", ".unif"]),
    ("SNES", &[".smc", ".sfc", ".fig", ".swc"]),
    ("N64", &[".n64", ".z64", ".v64"]),
    ("N64DD", &[".ndd", ".n64"]),
    ("GAMECUBE", &[".iso", ".gcm", ".gcz", ".rvz", ".wbfs", ".ciso"]),
    ("WII", &[".iso", ".wbfs", ".rvz", ".wia", ".ciso"]),
    ("WII_U", &[".wud", ".wux", ".rpx"]),
    ("SWITCH", &[".nsp", ".xci", ".nsz", ".xcz"]),
    ("GAME_BOY", &[".gb", ".gbc", ".sgb"]),
    ("GAME_BOY_COLOR", &[".gbc", ".gb"]),
    ("GAME_BOY_ADVANCE", &[".gba", ".agb"]),
    ("NINTENDO_DS", &[".nds", ".dsi"]),
    ("NINTENDO_3DS", &[".3ds", ".cia", ".cxi"]),
    ("VIRTUAL_BOY", &[".vb", ".vboy"]),
    ("PS1", &[".bin", ".cue", ".iso", ".img", ".pbp", ".chd"]),
    ("PS2", &[".iso", ".bin", ".img", ".chd", ".cso"]),
    ("PS3", &[".iso", ".pkg"]),
    ("PS4", &[".pkg"]),
    ("PS5", &[".pkg"]),
    ("PSP", &[".iso", ".cso", ".pbp"]),
    ("PS_VITA", &[".vpk", ".mai"]),
    ("XBOX", &[".iso", ".xbe"]),
    ("XBOX_360", &[".iso", ".xex", ".god"]),
    ("MASTER_SYSTEM", &[".sms", ".sg"]),
    ("GENESIS", &[".md", ".gen", ".bin", ".smd"]),
    ("SEGA_CD", &[".iso", ".bin", ".cue", ".chd"]),
    ("SEGA_32X", &[".32x", ".bin"]),
    ("SATURN", &[".iso", ".bin", ".cue", ".chd"]),
    ("DREAMCAST", &[".gdi", ".cdi", ".chd"]),
    ("GAME_GEAR", &[".gg"]),
    ("NEO_GEO", &[".zip", ".7z"]),
    ("NEO_GEO_CD", &[".iso", ".bin", ".cue", ".chd"]),
    ("NEO_GEO_POCKET", &[".ngp", ".ngc"]),
    ("NEO_GEO_POCKET_COLOR", &[".ngc", ".ngp"]),
    ("ATARI_2600", &[".a26", ".bin"]),
    ("ATARI_5200", &[".a52", ".bin"]),
    ("ATARI_7800", &[".a78", ".bin"]),
    ("ATARI_JAGUAR", &[".j64", ".jag", ".rom", ".bin"]),
    ("ATARI_LYNX", &[".lnx", ".lyx"]),
    ("COLECOVISION", &[".col", ".bin", ".rom"]),
    ("INTELLIVISION", &[".int", ".bin", ".rom"]),
    ("TG16", &[".pce", ".sgx"]),
    ("TG_CD", &[".iso", ".bin", ".cue", ".chd"]),
    ("WONDERSWAN", &[".ws"]),
    ("WONDERSWAN_COLOR", &[".wsc", ".ws"]),
    ("MAME", &[".zip", ".7z"]),
    ("FBA", &[".zip", ".7z"]),
    ("SCUMMVM", &[".scummvm"]),
    ("DOS", &[".exe", ".com", ".bat"]),
    ("ANDROID", &[".apk"]),
];

pub const PLATFORM_FOLDER_ALIASES: &[(&str, &[&str])] = &[
    ("NES", &["NES", "Nintendo Entertainment System", "Famicom", "fc"]),
    (
        "SNES",
        &["SNES", "Super Nintendo", "Super Famicom", "supernintendo", "superfamicom", "sfc"],
    ),
    ("N64", &["N64", "Nintendo 64", "nintendo64"]),
    ("N64DD", &["N64DD", "Nintendo 64DD", "64DD"]),
    ("GAMECUBE", &["GameCube", "GC", "NGC"]),
    ("WII", &["Wii"]),
    ("WII_U", &["Wii U", "WiiU"]),
    ("SWITCH", &["Switch", "Nintendo Switch", "NSW"]),
    ("GAME_BOY", &["Game Boy", "GB", "gameboy"]),
    ("GAME_BOY_COLOR", &["Game Boy Color", "GBC", "gameboycolor"]),
    ("GAME_BOY_ADVANCE", &["Game Boy Advance", "GBA", "gameboyadvance"]),
    ("NINTENDO_DS", &["Nintendo DS", "DS", "NDS", "nintendods"]),
    ("NINTENDO_3DS", &["Nintendo 3DS", "3DS", "n3ds"]),
    (
        "PS1",
        &["PlayStation", "PS1", "PSX", "PS One", "playstation", "psone"],
    ),
    ("PS2", &["PlayStation 2", "PS2", "playstation2"]),
    ("PS3", &["PlayStation 3", "PS3", "playstation3"]),
    ("PS4", &["PlayStation 4", "PS4", "playstation4"]),
    ("PS5", &["PlayStation 5", "PS5", "playstation5"]),
    ("PSP", &["PSP", "PlayStation Portable", "playstationportable"]),
    (
        "PS_VITA",
        &["PS Vita", "PlayStation Vita", "Vita", "psvita", "playstationvita"],
    ),
    ("XBOX", &["Xbox", "Original Xbox", "originalxbox"]),
    ("XBOX_360", &["Xbox 360", "X360", "xbox360"]),
    (
        "MASTER_SYSTEM",
        &["Master System", "Sega Master System", "SMS", "mastersystem", "segamastersystem"],
    ),
    (
        "GENESIS",
        &["Genesis", "Mega Drive", "Sega Genesis", "megadrive", "segagenesis", "md"],
    ),
    ("SEGA_CD", &["Sega CD", "Mega CD", "segacd", "megacd"]),
    ("SEGA_32X", &["32X", "Sega 32X", "sega32x"]),
    ("SATURN", &["Saturn", "Sega Saturn", "segasaturn"]),
    ("DREAMCAST", &["Dreamcast", "Sega Dreamcast", "DC", "segadreamcast"]),
    ("GAME_GEAR", &["Game Gear", "GG", "gamegear"]),
    ("NEO_GEO", &["Neo Geo", "NeoGeo", "ng"]),
    ("NEO_GEO_CD", &["Neo Geo CD", "NeoGeoCD", "ngcd"]),
    ("NEO_GEO_POCKET", &["Neo Geo Pocket", "NGP", "neogeopocket"]),
    (
        "NEO_GEO_POCKET_COLOR",
        &["Neo Geo Pocket Color", "NGPC", "neogeopocketcolor"],
    ),
    ("ATARI_2600", &["Atari 2600", "atari2600", "2600"]),
    ("ATARI_5200", &["Atari 5200", "atari5200", "5200"]),
    ("ATARI_7800", &["Atari 7800", "atari7800", "7800"]),
    ("ATARI_JAGUAR", &["Atari Jaguar", "Jaguar", "atarijaguar"]),
    ("ATARI_LYNX", &["Atari Lynx", "Lynx", "atarilynx"]),
    ("COLECOVISION", &["ColecoVision", "Coleco"]),
    ("INTELLIVISION", &["Intellivision", "intv"]),
    (
        "TG16",
        &["TurboGrafx-16", "TG16", "PC Engine", "turbografx16", "pcengine", "pce"],
    ),
    (
        "TG_CD",
        &["TurboGrafx-CD", "TG-CD", "PC Engine CD", "turbografxcd", "tgcd", "pcecd"],
    ),
    ("WONDERSWAN", &["WonderSwan", "ws"]),
    ("WONDERSWAN_COLOR", &["WonderSwan Color", "wonderswancolor", "wsc"]),
    ("VIRTUAL_BOY", &["Virtual Boy", "virtualboy", "vb"]),
    ("MAME", &["MAME", "Arcade"]),
    ("FBA", &["FBA", "Final Burn Alpha", "finalburnalpha", "fbneo"]),
    ("SCUMMVM", &["ScummVM"]),
    ("DOS", &["DOS", "DOSBox"]),
    ("ANDROID", &["Android"]),
];

const IISU_FOLDERS: &[(&str, &str)] = &[
    ("GAMECUBE", "gc"),
    ("WII_U", "wiiu"),
    ("GAME_BOY", "gb"),
    ("GAME_BOY_COLOR", "gbc"),
    ("GAME_BOY_ADVANCE", "gba"),
    ("NINTENDO_DS", "nds"),
    ("NINTENDO_3DS", "n3ds"),
    ("PS_VITA", "psvita"),
    ("XBOX_360", "xbox360"),
    ("MASTER_SYSTEM", "sms"),
    ("SEGA_CD", "segacd"),
    ("SEGA_32X", "32x"),
    ("DREAMCAST", "dc"),
    ("GAME_GEAR", "gg"),
    ("NEO_GEO", "neogeo"),
    ("NEO_GEO_CD", "neogeocd"),
    ("NEO_GEO_POCKET", "ngp"),
    ("NEO_GEO_POCKET_COLOR", "ngpc"),
    ("ATARI_2600", "atari2600"),
    ("ATARI_5200", "atari5200"),
    ("ATARI_7800", "atari7800"),
    ("ATARI_JAGUAR", "jaguar"),
    ("ATARI_LYNX", "lynx"),
    ("COLECOVISION", "coleco"),
    ("INTELLIVISION", "intv"),
    ("TG_CD", "tgcd"),
    ("WONDERSWAN", "ws"),
    ("WONDERSWAN_COLOR", "wsc"),
    ("VIRTUAL_BOY", "vb"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_normalize_case() {
        assert_eq!(PlatformKey::new(" gamecube "), PlatformKey::new("GAMECUBE"));
        assert_eq!(PlatformKey::new("nes").as_str(), "NES");
    }

    #[test]
    fn iisu_folder_shorthand() {
        let cases = [
            ("NES", "nes"),
            ("GAMECUBE", "gc"),
            ("WII_U", "wiiu"),
            ("NINTENDO_3DS", "n3ds"),
            ("PS_VITA", "psvita"),
            ("DREAMCAST", "dc"),
            ("COLECOVISION", "coleco"),
            ("SOME_NEW_THING", "some_new_thing"),
        ];
        for (key, folder) in cases {
            assert_eq!(PlatformKey::new(key).iisu_folder(), folder, "{key}");
        }
    }

    #[test]
    fn folder_reverse_lookup_is_case_insensitive() {
        assert_eq!(
            PlatformKey::from_folder_exact("ngc"),
            Some(PlatformKey::new("GAMECUBE"))
        );
        assert_eq!(
            PlatformKey::from_folder_exact("Mega Drive"),
            Some(PlatformKey::new("GENESIS"))
        );
        assert_eq!(PlatformKey::from_folder_exact("nothing here"), None);
    }

    #[test]
    fn rom_extension_union_is_deduplicated() {
        let all = all_rom_extensions();
        assert!(all.contains(&".gba"));
        assert_eq!(all.iter().filter(|e| **e == ".iso").count(), 1);
        assert_eq!(
            PlatformKey::new("GAME_BOY_ADVANCE").rom_extensions(),
            Some(&[".gba", ".agb"][..])
        );
    }
}
