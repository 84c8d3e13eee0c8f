use std::collections::HashSet;

use chrono::{DateTime, Datelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::fuzzy::tokens;

static TRAILING_NUMBER_AFTER_SEP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\s:\-]+(\d+)\s*$").expect("sequel regex should compile")
});
static TRAILING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*$").expect("trailing number regex should compile")
});
static TRAILING_ROMAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(x{0,3}(?:ix|iv|v?i{0,3}))\s*$")
        .expect("roman regex should compile")
});
static SUBTITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[:\-]\s*(.+)$").expect("subtitle regex should compile")
});
static PAREN_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d{4})\)").expect("year regex should compile"));
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(19[7-9]\d|20[0-2]\d)\b").expect("year regex should compile")
});
static ANY_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})").expect("year regex should compile"));

const ROMAN: &[(&str, &str)] = &[
    ("i", "1"),
    ("ii", "2"),
    ("iii", "3"),
    ("iv", "4"),
    ("v", "5"),
    ("vi", "6"),
    ("vii", "7"),
    ("viii", "8"),
    ("ix", "9"),
    ("x", "10"),
    ("xi", "11"),
    ("xii", "12"),
    ("xiii", "13"),
    ("xiv", "14"),
    ("xv", "15"),
];

/// Series number at the end of a title, arabic or roman, as a digit string.
pub fn extract_sequel_number(title: &str) -> Option<String> {
    let t = title.trim().to_lowercase();
    if t.is_empty() {
        return None;
    }
    if let Some(caps) = TRAILING_NUMBER_AFTER_SEP.captures(&t) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = TRAILING_NUMBER.captures(&t) {
        return Some(caps[1].to_string());
    }
    let roman = TRAILING_ROMAN.captures(&t)?;
    ROMAN
        .iter()
        .find(|(numeral, _)| *numeral == &roman[1])
        .map(|(_, digits)| (*digits).to_string())
}

/// Text after the first `:` or `-`, lowercased, when it is more than a
/// couple of characters and not a bare number.
pub fn extract_subtitle(title: &str) -> Option<String> {
    let caps = SUBTITLE.captures(title)?;
    let subtitle = caps[1].trim().to_lowercase();
    let numeric = subtitle.chars().all(|c| c.is_ascii_digit());
    (subtitle.chars().count() > 2 && !numeric).then_some(subtitle)
}

/// Year in `(1998)` form, else any plausible bare year.
pub fn extract_year_from_title(title: &str) -> Option<i32> {
    if let Some(caps) = PAREN_YEAR.captures(title)
        && let Ok(year) = caps[1].parse::<i32>()
        && (1970..=2030).contains(&year)
    {
        return Some(year);
    }
    BARE_YEAR
        .captures(title)
        .and_then(|caps| caps[1].parse().ok())
}

/// Release year from a provider record's `release_date` (unix seconds or
/// a string starting with the year).
pub fn release_year_from_meta(meta: &Value) -> Option<i32> {
    match meta.get("release_date")? {
        Value::Number(n) => {
            let secs = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            if secs == 0 {
                return None;
            }
            DateTime::from_timestamp(secs, 0).map(|dt| dt.year())
        }
        Value::String(s) => ANY_YEAR
            .captures(s)
            .and_then(|caps| caps[1].parse().ok()),
        _ => None,
    }
}

/// Lowercase text of every key and leaf in a JSON value, space separated.
pub fn flatten_meta(meta: &Value) -> String {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    out.push(k.clone());
                    walk(v, out);
                }
            }
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Value::String(s) => out.push(s.clone()),
            Value::Null => out.push("None".to_string()),
            other => out.push(other.to_string()),
        }
    }
    let mut parts = Vec::new();
    walk(meta, &mut parts);
    parts.join(" ").to_lowercase()
}

fn token_set(s: &str) -> HashSet<&str> {
    tokens(s).into_iter().collect()
}

/// Rank an API search hit against the title being scraped. Higher is
/// better; sequel, subtitle and release year disagreements push the
/// score negative.
pub fn score_candidate(
    title: &str,
    candidate_name: &str,
    meta: &Value,
    platform_hints: &[String],
) -> i64 {
    let t = title.trim().to_lowercase();
    let n = candidate_name.trim().to_lowercase();
    let mut score: i64 = 0;

    if n == t {
        score += 200;
    } else if n.starts_with(&t) || t.starts_with(&n) {
        score += 140;
    } else if n.contains(&t) || t.contains(&n) {
        score += 90;
    }

    let shared = token_set(&t).intersection(&token_set(&n)).count() as i64;
    score += (shared * 8).min(80);

    let meta_text = flatten_meta(meta);
    for hint in platform_hints {
        let hint = hint.to_lowercase();
        if !hint.is_empty() && meta_text.contains(&hint) {
            score += 60;
        }
    }

    if let Some(title_num) = extract_sequel_number(title) {
        score += match extract_sequel_number(candidate_name) {
            Some(candidate_num) if candidate_num == title_num => 150,
            Some(_) => -200,
            None => -150,
        };
    }

    if let Some(title_sub) = extract_subtitle(title) {
        score += match extract_subtitle(candidate_name) {
            Some(candidate_sub) => {
                let overlap = token_set(&title_sub)
                    .intersection(&token_set(&candidate_sub))
                    .count();
                match overlap {
                    0 => -50,
                    1 => 30,
                    _ => 100,
                }
            }
            None => -80,
        };
    }

    if let (Some(title_year), Some(meta_year)) =
        (extract_year_from_title(title), release_year_from_meta(meta))
    {
        score += match (title_year - meta_year).abs() {
            0 => 100,
            1 => 50,
            2 => 20,
            d if d >= 5 => -50,
            _ => 0,
        };
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequel_numbers() {
        assert_eq!(extract_sequel_number("Super Mario Bros. 3").as_deref(), Some("3"));
        assert_eq!(extract_sequel_number("Mega Man X").as_deref(), Some("10"));
        assert_eq!(extract_sequel_number("Final Fantasy VI").as_deref(), Some("6"));
        assert_eq!(extract_sequel_number("Metal Gear Solid"), None);
        assert_eq!(extract_sequel_number(""), None);
    }

    #[test]
    fn subtitles() {
        assert_eq!(
            extract_subtitle("Castlevania: Symphony of the Night").as_deref(),
            Some("symphony of the night")
        );
        assert_eq!(extract_subtitle("Game - 2"), None);
        assert_eq!(extract_subtitle("Tetris"), None);
    }

    #[test]
    fn years() {
        assert_eq!(extract_year_from_title("Doom (1993)"), Some(1993));
        assert_eq!(extract_year_from_title("Doom 2016"), Some(2016));
        assert_eq!(extract_year_from_title("Doom"), None);
        assert_eq!(
            release_year_from_meta(&json!({"release_date": 946_684_800})),
            Some(2000)
        );
        assert_eq!(
            release_year_from_meta(&json!({"release_date": "1998-11-21"})),
            Some(1998)
        );
        assert_eq!(release_year_from_meta(&json!({})), None);
    }

    #[test]
    fn exact_match_beats_sequel() {
        let meta = json!({});
        let exact = score_candidate("Streets of Rage", "Streets of Rage", &meta, &[]);
        let sequel = score_candidate("Streets of Rage", "Streets of Rage 2", &meta, &[]);
        assert_eq!(exact, 200 + 24);
        assert_eq!(sequel, 140 + 24);
        assert!(exact > sequel);
    }

    #[test]
    fn wrong_sequel_is_penalized() {
        let meta = json!({});
        let right = score_candidate("Streets of Rage 2", "Streets of Rage 2", &meta, &[]);
        let wrong = score_candidate("Streets of Rage 2", "Streets of Rage 3", &meta, &[]);
        let missing = score_candidate("Streets of Rage 2", "Streets of Rage", &meta, &[]);
        assert_eq!(right, 200 + 32 + 150);
        assert_eq!(wrong, 24 - 200);
        assert_eq!(missing, 140 + 24 - 150);
    }

    #[test]
    fn platform_hints_and_year_add_points() {
        let meta = json!({
            "name": "Doom",
            "platforms": [{"name": "Nintendo 64"}],
            "release_date": 859_852_800
        });
        let hints = vec!["nintendo 64".to_string(), "n64".to_string()];
        let score = score_candidate("Doom (1997)", "Doom", &meta, &hints);
        // prefix 140, one shared token, one hint, exact year
        assert_eq!(score, 140 + 8 + 60 + 100);
    }
}
