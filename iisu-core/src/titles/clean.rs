use iisu_model::all_rom_extensions;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static ROM_EXTENSION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    let mut exts: Vec<String> = vec!["zip".into(), "7z".into(), "rar".into()];
    exts.extend(
        all_rom_extensions()
            .into_iter()
            .map(|ext| regex::escape(ext.trim_start_matches('.'))),
    );
    Regex::new(&format!(r"(?i)\.({})$", exts.join("|")))
        .expect("rom extension regex should compile")
});

static ARCHIVE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(zip|7z|rar)$").expect("archive regex should compile")
});

static BRACKET_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\[[^\]]*\]").expect("bracket regex should compile")
});

static SIZE_PARENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\(\s*\d+\.?\d*\s*(GB|MB|KB|B|bytes?)?\s*\)")
        .expect("size regex should compile")
});

static LONG_NUMBER_PARENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\(\s*\d{6,}\s*\)").expect("number regex should compile")
});

// Region, language and release-state tags. Comma lists such as
// "(USA, Europe)" and "(En,Fr,De)" are removed as a whole.
static REGION_PARENS: Lazy<Regex> = Lazy::new(|| {
    let tag = r"USA|US|Europe|EU|Japan|JP|World|WLD|Australia|Korea|Brazil|Asia|En|Fr|De|Es|It|Ja|Ko|Zh|Rev\s*[A-Z0-9]*|v\d+[.\d]*|Proto|Beta|Alpha|Demo|Sample|Unl|Pirate|Virtual Console|Switch|NSW|PS4|PS5|Xbox|XB1|PC|[A-Za-z]{2}";
    Regex::new(&format!(r"(?i)\s*\((?:{tag})(?:\s*,\s*(?:{tag}))*\)"))
        .expect("region regex should compile")
});

static VERSION_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\bv\d+(\.\d+)*").expect("version regex should compile")
});

static VERSION_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\bversion\s*\d+(\.\d+)*")
        .expect("version word regex should compile")
});

static DISC_PARENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\(Disc\s*\d+[^)]*\)").expect("disc regex should compile")
});

static UPDATE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\+?\s*\b(Update|DLC|Patch|Fix|Hotfix)\b\s*v?\d*(\.\d+)*")
        .expect("update regex should compile")
});

static EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\(\s*\)").expect("empty parens regex should compile")
});

static COLLAPSE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex should compile"));

static NON_SEARCH_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\w\s'-]").expect("search char regex should compile")
});

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\w\- ]+").expect("slug char regex should compile")
});

const ROMAN_SWAPS: &[(&str, &str)] = &[
    (r"\bIII\b", "3"),
    (r"\bII\b", "2"),
    (r"\bIV\b", "4"),
    (r"\bVI\b", "6"),
    (r"\bVII\b", "7"),
    (r"\bVIII\b", "8"),
    (r"\bIX\b", "9"),
    (r"\bXI\b", "11"),
    (r"\bXII\b", "12"),
];

static ROMAN_SWAP_REGEXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    ROMAN_SWAPS
        .iter()
        .map(|(pattern, digits)| {
            (
                Regex::new(pattern).expect("roman regex should compile"),
                *digits,
            )
        })
        .collect()
});

/// Reduce a ROM file or folder name to the bare game title.
///
/// `"Super Mario Bros. 3 (USA) (Rev 1) [!].nes"` becomes
/// `"Super Mario Bros. 3"`.
pub fn clean_game_title(name: &str) -> String {
    let name = ROM_EXTENSION_SUFFIX.replace(name, "");
    let name = ARCHIVE_SUFFIX.replace(&name, "");
    let name = BRACKET_TAG.replace_all(&name, "");
    let name = SIZE_PARENS.replace_all(&name, "");
    let name = LONG_NUMBER_PARENS.replace_all(&name, "");
    let name = REGION_PARENS.replace_all(&name, "");
    let name = VERSION_TAG.replace_all(&name, "");
    let name = VERSION_WORD.replace_all(&name, "");
    let name = DISC_PARENS.replace_all(&name, "");
    let name = UPDATE_TAG.replace_all(&name, "");
    let name = EMPTY_PARENS.replace_all(&name, "");
    let name = COLLAPSE_WHITESPACE.replace_all(name.trim(), " ");
    name.trim_end_matches(['-', '_', '.', ' ']).to_string()
}

/// Search-friendly form: cleaned, accents stripped, punctuation spelled
/// out or dropped. Apostrophes and hyphens survive.
pub fn normalize_for_search(name: &str) -> String {
    let cleaned = clean_game_title(name);
    let ascii: String = cleaned.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let mut out = String::with_capacity(ascii.len());
    for ch in ascii.chars() {
        match ch {
            '&' => out.push_str("and"),
            '+' => out.push_str("plus"),
            '@' => out.push_str("at"),
            '™' | '®' | '©' => {}
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            other => out.push(other),
        }
    }

    let stripped = NON_SEARCH_CHARS.replace_all(&out, " ");
    COLLAPSE_WHITESPACE
        .replace_all(stripped.trim(), " ")
        .to_string()
}

/// Alternate spellings to try against a search API, most specific first.
pub fn search_variants(name: &str) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    };

    let clean = clean_game_title(name);
    push(clean.clone());
    push(normalize_for_search(name));

    if let Some((main, _)) = clean.split_once(':') {
        push(main.trim().to_string());
    }
    if let Some((main, _)) = clean.split_once(" - ") {
        push(main.trim().to_string());
    }

    for (pattern, digits) in ROMAN_SWAP_REGEXES.iter() {
        if pattern.is_match(&clean) {
            push(pattern.replace_all(&clean, *digits).to_string());
        }
    }

    variants
}

/// Lowercase ASCII alphanumerics only; used to compare platform keys.
pub fn norm_key(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Filesystem-safe folder name for a title.
pub fn safe_slug(s: &str, limit: usize) -> String {
    let kept = NON_SLUG_CHARS.replace_all(s.trim(), "");
    let underscored = COLLAPSE_WHITESPACE.replace_all(&kept, "_");
    underscored.chars().take(limit).collect()
}

/// Maximum slug length in characters.
pub const DEFAULT_SLUG_LIMIT: usize = 180;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_extensions() {
        assert_eq!(
            clean_game_title("Super Mario Bros. 3 (USA) (Rev 1) [!].nes"),
            "Super Mario Bros. 3"
        );
        assert_eq!(
            clean_game_title("Legend of Zelda, The (USA, Europe).zip"),
            "Legend of Zelda, The"
        );
        assert_eq!(clean_game_title("Final Fantasy VII (Disc 1).chd"), "Final Fantasy VII");
        assert_eq!(clean_game_title("Pokemon Emerald (4.2 MB).gba"), "Pokemon Emerald");
        assert_eq!(clean_game_title("Celeste v1.4.0 + Update"), "Celeste");
    }

    #[test]
    fn keeps_words_that_start_with_tag_letters() {
        assert_eq!(clean_game_title("Patchwork Heroes"), "Patchwork Heroes");
        assert_eq!(clean_game_title("Tetris 2v2"), "Tetris 2v2");
    }

    #[test]
    fn normalizes_accents_and_symbols() {
        assert_eq!(normalize_for_search("Pokémon Ruby"), "Pokemon Ruby");
        assert_eq!(normalize_for_search("Banjo & Kazooie"), "Banjo and Kazooie");
        assert_eq!(
            normalize_for_search("Ratchet: Deadlocked™"),
            "Ratchet Deadlocked"
        );
        assert_eq!(normalize_for_search("Pac-Man"), "Pac-Man");
    }

    #[test]
    fn variants_include_main_title_and_digits() {
        let variants = search_variants("Final Fantasy VII: Crisis Core");
        assert_eq!(variants[0], "Final Fantasy VII: Crisis Core");
        assert!(variants.contains(&"Final Fantasy VII".to_string()));
        assert!(variants.contains(&"Final Fantasy 7: Crisis Core".to_string()));
        let mut dedup = variants.clone();
        dedup.dedup();
        assert_eq!(dedup.len(), variants.len());
    }

    #[test]
    fn slug_and_key() {
        assert_eq!(safe_slug("  Zelda: Link's Awakening DX ", 180), "Zelda_Links_Awakening_DX");
        assert_eq!(safe_slug("abcdef", 3), "abc");
        assert_eq!(norm_key("Game Boy Advance"), "gameboyadvance");
        assert_eq!(norm_key("GAME_BOY-ADVANCE"), "gameboyadvance");
    }
}
