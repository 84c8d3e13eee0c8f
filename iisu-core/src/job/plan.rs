use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use image::RgbaImage;
use iisu_model::PlatformKey;

use super::events::EventSink;
use super::{JobRequest, JobSettings};
use crate::compose::load_border;
use crate::dataset::{PlatformTitles, resolve_platform_titles};
use crate::error::{ArtError, Result};
use crate::http::HttpFetcher;
use crate::titles::{DEFAULT_SLUG_LIMIT, fuzzy_match_title, safe_slug};

/// Threshold for fuzzy candidates when the user searched for a title.
pub const SEARCH_MATCH_THRESHOLD: f64 = 0.7;
/// A database title replaces the raw search term only at this score.
pub const SEARCH_ACCEPT_SCORE: f64 = 0.85;

/// First-character filter for bulk runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LetterFilter {
    /// Every title.
    #[default]
    All,
    /// Titles starting with a digit.
    Digits,
    /// Titles starting with neither a letter nor a digit.
    Symbols,
    /// Titles starting with this letter, case-insensitively.
    Letter(char),
}

impl LetterFilter {
    /// Whether `title` passes the filter.
    pub fn matches(self, title: &str) -> bool {
        let Some(first) = title.chars().next() else {
            return false;
        };
        match self {
            LetterFilter::All => true,
            LetterFilter::Digits => first.is_ascii_digit(),
            LetterFilter::Symbols => !first.is_alphanumeric(),
            LetterFilter::Letter(c) => first.to_uppercase().eq(c.to_uppercase()),
        }
    }
}

impl FromStr for LetterFilter {
    type Err = ArtError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(LetterFilter::All);
        }
        match s {
            "0-9" => Ok(LetterFilter::Digits),
            "#" => Ok(LetterFilter::Symbols),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_alphabetic() => {
                        Ok(LetterFilter::Letter(c.to_ascii_uppercase()))
                    }
                    _ => Err(ArtError::InvalidInput(format!("letter filter {s:?}"))),
                }
            }
        }
    }
}

impl fmt::Display for LetterFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LetterFilter::All => f.write_str("All"),
            LetterFilter::Digits => f.write_str("0-9"),
            LetterFilter::Symbols => f.write_str("#"),
            LetterFilter::Letter(c) => write!(f, "{c}"),
        }
    }
}

/// One queued icon.
#[derive(Clone)]
pub struct PlannedTask {
    /// Platform the title belongs to.
    pub platform: PlatformKey,
    /// Title as searched for.
    pub title: String,
    /// Folder name under the platform output folder.
    pub slug: String,
    /// Border file used for framing.
    pub border_path: PathBuf,
    /// Decoded border, shared across the platform.
    pub border: Arc<RgbaImage>,
    /// Where `icon.*` is written.
    pub out_path: PathBuf,
    /// Where a no-art review folder goes.
    pub review_dir: PathBuf,
}

impl PlannedTask {
    /// The game folder holding the icon.
    pub fn game_dir(&self) -> &Path {
        self.out_path.parent().unwrap_or(&self.out_path)
    }
}

impl fmt::Debug for PlannedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannedTask")
            .field("platform", &self.platform)
            .field("title", &self.title)
            .field("border_path", &self.border_path)
            .field("out_path", &self.out_path)
            .finish()
    }
}

/// Border for `platform`: per-platform override, global override, then
/// the configured border file (absolute, else under `borders_dir`).
pub fn resolve_border(
    settings: &JobSettings,
    request: &JobRequest,
    platform: &PlatformKey,
) -> Option<PathBuf> {
    if let Some(path) = request.custom_border.per_platform.get(platform)
        && path.is_file()
    {
        return Some(path.clone());
    }
    if let Some(path) = &request.custom_border.global
        && path.is_file()
    {
        return Some(path.clone());
    }
    let file = settings.platforms.get(platform)?.border_file.as_ref()?;
    if file.is_absolute() && file.is_file() {
        return Some(file.clone());
    }
    let joined = settings.paths.borders_dir.join(file);
    joined.is_file().then_some(joined)
}

/// Outcome of applying the search term to a platform's titles.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResolution {
    /// A database title scored at least [`SEARCH_ACCEPT_SCORE`].
    Matched {
        /// The database title.
        title: String,
        /// Its fuzzy score.
        score: f64,
    },
    /// No good database match; the term is used verbatim.
    Raw {
        /// Score of the closest title, if any scored at all.
        best_score: Option<f64>,
    },
}

/// Match a typed search term against the platform titles.
pub fn resolve_search(term: &str, titles: &[String]) -> SearchResolution {
    match fuzzy_match_title(term, titles, SEARCH_MATCH_THRESHOLD)
        .into_iter()
        .next()
    {
        Some((title, score)) if score >= SEARCH_ACCEPT_SCORE => {
            SearchResolution::Matched { title, score }
        }
        best => SearchResolution::Raw {
            best_score: best.map(|(_, s)| s),
        },
    }
}

/// Search term, else letter filter, then the per-platform limit.
pub fn filter_titles(
    titles: Vec<String>,
    search_term: Option<&str>,
    letter: LetterFilter,
    limit: usize,
) -> Vec<String> {
    let mut titles = match search_term.map(str::trim).filter(|t| !t.is_empty()) {
        Some(term) => match resolve_search(term, &titles) {
            SearchResolution::Matched { title, .. } => vec![title],
            SearchResolution::Raw { .. } => vec![term.to_string()],
        },
        None => titles.into_iter().filter(|t| letter.matches(t)).collect(),
    };
    if limit > 0 {
        titles.truncate(limit);
    }
    titles
}

/// Build the task list for a job. Platforms without a border are skipped
/// with a warning; existing icons are skipped unless overwriting.
pub(crate) async fn plan_tasks(
    settings: &JobSettings,
    request: &JobRequest,
    dataset: Option<&PlatformTitles>,
    http: &HttpFetcher,
    events: &EventSink,
) -> Result<Vec<PlannedTask>> {
    let empty = PlatformTitles::new();
    let dataset = dataset.unwrap_or(&empty);
    let search_term = request
        .search_term
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let limit = request.limit.unwrap_or(settings.dataset.per_platform_limit);
    let ext = settings.compose.format.extension();

    let mut tasks = Vec::new();
    for platform in &request.platforms {
        let Some(border_path) = resolve_border(settings, request, platform) else {
            events
                .warn(format!("Missing border for {platform}; skipping platform"))
                .await;
            continue;
        };
        let border_file = border_path.clone();
        let border = match tokio::task::spawn_blocking(move || load_border(&border_file)).await? {
            Ok(border) => Arc::new(border),
            Err(err) => {
                events
                    .warn(format!("Unreadable border for {platform}: {err}"))
                    .await;
                continue;
            }
        };

        let titles = if let Some(explicit) = request.titles.get(platform) {
            events
                .info(format!("{platform}: {} requested titles", explicit.len()))
                .await;
            explicit.clone()
        } else {
            let aliases = settings
                .platform_aliases
                .get(platform)
                .cloned()
                .unwrap_or_default();
            let wikipedia_url = settings
                .platforms
                .get(platform)
                .and_then(|p| p.wikipedia_url.as_deref());
            let titles =
                match resolve_platform_titles(dataset, &aliases, platform, wikipedia_url, http).await {
                    Ok((source, titles)) => {
                        events
                            .info(format!("{platform}: {} titles from {source}", titles.len()))
                            .await;
                        titles
                    }
                    Err(err) if search_term.is_some() => {
                        events
                            .info(format!("{platform}: {err}; using the search term directly"))
                            .await;
                        Vec::new()
                    }
                    Err(err) => {
                        events.warn(format!("{platform}: {err}")).await;
                        continue;
                    }
                };

            let titles = filter_titles(titles, search_term, request.letter_filter, limit);
            if let Some(term) = search_term {
                events
                    .info(format!("Search {term:?} on {platform}: {titles:?}"))
                    .await;
            } else if request.letter_filter != LetterFilter::All {
                events
                    .info(format!(
                        "Letter {} on {platform}: {} matches",
                        request.letter_filter,
                        titles.len()
                    ))
                    .await;
            }
            titles
        };

        let folder = platform.iisu_folder();
        let out_dir = settings.paths.output_dir.join(&folder);
        let review_dir = settings.paths.review_dir.join(&folder);
        for title in titles {
            let slug = safe_slug(&title, DEFAULT_SLUG_LIMIT);
            if slug.is_empty() {
                continue;
            }
            let out_path = out_dir.join(&slug).join(format!("icon.{ext}"));
            if !request.overwrite && tokio::fs::try_exists(&out_path).await.unwrap_or(false) {
                continue;
            }
            tasks.push(PlannedTask {
                platform: platform.clone(),
                title,
                slug,
                border_path: border_path.clone(),
                border: Arc::clone(&border),
                out_path,
                review_dir: review_dir.clone(),
            });
        }
    }
    Ok(tasks)
}
