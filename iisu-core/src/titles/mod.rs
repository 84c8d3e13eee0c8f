//! Game title cleanup, database fuzzy matching and API candidate scoring.

/// Removing region tags, dumps markers and file extensions
pub mod clean;
/// Database title matching
pub mod fuzzy;
/// Scoring provider candidates against a title
pub mod scoring;

pub use clean::{
    DEFAULT_SLUG_LIMIT, clean_game_title, norm_key, normalize_for_search,
    safe_slug, search_variants,
};
pub use fuzzy::{
    DATABASE_MATCH_THRESHOLD, find_best_database_match, fuzzy_match_title,
    sequence_ratio,
};
pub use scoring::{
    extract_sequel_number, extract_subtitle, extract_year_from_title,
    flatten_meta, release_year_from_meta, score_candidate,
};
