use std::collections::HashSet;

use super::clean::normalize_for_search;

/// Words that separate editions or entries of the same franchise.
const CRITICAL_KEYWORDS: &[&str] = &[
    "trilogy", "collection", "compilation", "anthology", "bundle",
    "remaster", "remastered", "remake", "hd", "definitive", "complete",
    "goty", "ultimate", "deluxe", "premium", "gold", "platinum", "2", "3",
    "4", "5", "6", "7", "8", "9", "10", "ii", "iii", "iv", "v", "vi", "vii",
    "viii", "ix", "x", "zero", "origins", "revelations", "corruption",
    "echoes", "hunters", "prime", "fusion", "super", "advance", "portable",
    "pocket",
];

const SEQUEL_INDICATORS: &[&str] = &[
    "2", "3", "4", "5", "6", "7", "8", "9", "10", "ii", "iii", "iv", "v",
    "vi", "vii", "viii", "ix", "x", "trilogy", "collection", "compilation",
];

/// Threshold used by [`find_best_database_match`].
pub const DATABASE_MATCH_THRESHOLD: f64 = 0.5;

/// Lowercase alphanumeric runs, in order.
pub(crate) fn tokens(s: &str) -> Vec<&str> {
    s.split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|t| !t.is_empty())
        .collect()
}

struct Normalized {
    text: String,
    seq: Vec<String>,
    set: HashSet<String>,
}

impl Normalized {
    fn new(raw: &str) -> Self {
        let text = normalize_for_search(raw).to_lowercase();
        let seq: Vec<String> =
            tokens(&text).into_iter().map(str::to_string).collect();
        let set = seq.iter().cloned().collect();
        Self { text, seq, set }
    }

    fn critical(&self) -> HashSet<&str> {
        CRITICAL_KEYWORDS
            .iter()
            .copied()
            .filter(|k| self.set.contains(*k))
            .collect()
    }
}

/// True when `needle` occurs as a contiguous run inside `hay`.
fn contains_token_run(hay: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > hay.len() {
        return false;
    }
    hay.windows(needle.len()).any(|w| w == needle)
}

/// A word on one side is a truncation of a different word on the other,
/// as with "man" and "mania". Checked both ways, so neither "Pac-Man" nor
/// "Pac-Mania" falls through to the sequence ratio against the other.
fn has_word_extension(a: &Normalized, b: &Normalized) -> bool {
    let only_a: Vec<&String> = a.set.difference(&b.set).collect();
    let only_b: Vec<&String> = b.set.difference(&a.set).collect();
    only_a.iter().any(|x| {
        only_b
            .iter()
            .any(|y| y.starts_with(x.as_str()) || x.starts_with(y.as_str()))
    })
}

/// Ratcliff/Obershelp similarity, `2*M / T`.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut stack = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = stack.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            stack.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            stack.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

// Earliest longest common block within the window.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            cur[col] = if a[i] == b[j] { prev[col - 1] + 1 } else { 0 };
            if cur[col] > best_k {
                best_k = cur[col];
                best_i = i + 1 - best_k;
                best_j = j + 1 - best_k;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
        cur.iter_mut().for_each(|v| *v = 0);
    }
    (best_i, best_j, best_k)
}

fn score_pair(
    search: &Normalized,
    title: &Normalized,
    threshold: f64,
) -> Option<f64> {
    let search_critical = search.critical();
    let title_critical = title.critical();

    if !search_critical.is_subset(&title_critical) {
        return None;
    }
    if title_critical
        .difference(&search_critical)
        .any(|k| SEQUEL_INDICATORS.contains(k))
    {
        return None;
    }

    if search.text == title.text {
        return Some(1.0);
    }

    if contains_token_run(&title.seq, &search.seq)
        || contains_token_run(&search.seq, &title.seq)
    {
        let (s, t) = (search.text.len(), title.text.len());
        let ratio = s.min(t) as f64 / s.max(t).max(1) as f64;
        return Some(0.85 + ratio * 0.1);
    }

    if !search.set.is_empty() && !title.set.is_empty() {
        let inter = search.set.intersection(&title.set).count();
        let union = search.set.union(&title.set).count();
        let mut jaccard = inter as f64 / union as f64;
        if search.set.is_subset(&title.set) {
            jaccard = (jaccard + 0.2).min(1.0);
        }
        if jaccard >= threshold {
            return Some(jaccard);
        }
    }

    if has_word_extension(search, title) {
        return None;
    }

    let seq = sequence_ratio(&search.text, &title.text);
    if seq >= threshold {
        return Some(seq);
    }

    let prefix = |s: &str| s.chars().take(10).collect::<String>();
    let shares_prefix = search.text.starts_with(&prefix(&title.text))
        || title.text.starts_with(&prefix(&search.text));
    (shares_prefix && 0.65 >= threshold).then_some(0.65)
}

/// Rank `titles` against `search`, best first. Edition and sequel words
/// must agree on both sides, so "Metroid Prime" never matches
/// "Metroid Prime 2: Echoes".
pub fn fuzzy_match_title(
    search: &str,
    titles: &[String],
    threshold: f64,
) -> Vec<(String, f64)> {
    if search.trim().is_empty() || titles.is_empty() {
        return Vec::new();
    }
    let needle = Normalized::new(search);

    let mut results: Vec<(String, f64)> = titles
        .iter()
        .filter_map(|title| {
            score_pair(&needle, &Normalized::new(title), threshold)
                .map(|score| (title.clone(), score))
        })
        .collect();

    results.sort_by(|a, b| b.1.total_cmp(&a.1));
    results
}

/// Up to `max_results` database titles for `search`, or `[search]` when
/// nothing clears the database threshold.
pub fn find_best_database_match(
    search: &str,
    titles: &[String],
    max_results: usize,
) -> Vec<String> {
    let matches = fuzzy_match_title(search, titles, DATABASE_MATCH_THRESHOLD);
    if matches.is_empty() {
        return vec![search.to_string()];
    }
    matches
        .into_iter()
        .take(max_results)
        .map(|(title, _)| title)
        .collect()
}
