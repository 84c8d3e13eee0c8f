//! ROM names flowing through cleanup, database matching and search planning.

use iisu_core::job::{SearchResolution, resolve_search};
use iisu_core::titles::{
    clean_game_title, find_best_database_match, fuzzy_match_title, safe_slug, DEFAULT_SLUG_LIMIT,
};

fn database() -> Vec<String> {
    [
        "Metroid",
        "Metroid Prime",
        "Metroid Prime 2: Echoes",
        "Metroid Prime Trilogy",
        "Super Mario Bros. 3",
        "The Legend of Zelda",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[test]
fn rom_names_resolve_to_database_titles() {
    let db = database();
    let cleaned = clean_game_title("Super Mario Bros. 3 (USA) (Rev 1) [!].nes");
    assert_eq!(cleaned, "Super Mario Bros. 3");
    assert_eq!(find_best_database_match(&cleaned, &db, 5)[0], "Super Mario Bros. 3");

    let prime = fuzzy_match_title(&clean_game_title("Metroid Prime (USA)"), &db, 0.6);
    assert_eq!(prime[0].0, "Metroid Prime");
    assert!(prime.iter().all(|(t, _)| t != "Metroid Prime 2: Echoes"));
}

#[test]
fn unmatched_titles_fall_back_to_the_search_term() {
    let db = database();
    assert_eq!(
        find_best_database_match("Totally Unknown Game", &db, 5),
        vec!["Totally Unknown Game"]
    );
    assert!(matches!(
        resolve_search("Totally Unknown Game", &db),
        SearchResolution::Raw { .. }
    ));
    match resolve_search("the legend of zelda", &db) {
        SearchResolution::Matched { title, score } => {
            assert_eq!(title, "The Legend of Zelda");
            assert!(score >= 0.85);
        }
        other => panic!("expected a database match, got {other:?}"),
    }
}

#[test]
fn slugs_are_filesystem_safe() {
    let slug = safe_slug("Metroid Prime 2: Echoes", DEFAULT_SLUG_LIMIT);
    assert!(!slug.contains(':'));
    assert!(!slug.contains(' '));
    assert_eq!(safe_slug(&"x".repeat(300), DEFAULT_SLUG_LIMIT).len(), DEFAULT_SLUG_LIMIT);
}
