use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::http::HttpFetcher;
use crate::markup::unescape_html;

/// MediaWiki API endpoint used for page parsing.
pub const API_URL: &str = "https://en.wikipedia.org/w/api.php";

const SKIP_TERMS: &[&str] = &[
    "unreleased",
    "cancelled",
    "tba",
    "tbd",
    "unknown",
    "various",
    "multiple",
    "n/a",
    "yes",
    "no",
    "genre",
    "developer",
    "publisher",
];

static ITALIC_CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<td[^>]*><i>([^<]+)</i>").expect("wiki cell regex should compile")
});
static FOOTNOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]+\]").expect("footnote regex should compile"));
static SKIP: Lazy<Regex> = Lazy::new(|| {
    let alternatives = SKIP_TERMS
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)(?:^|[^a-z0-9])(?:{alternatives})(?:$|[^a-z0-9])"))
        .expect("skip-term regex should compile")
});

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParsedPage>,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    #[serde(default)]
    text: String,
}

/// `https://en.wikipedia.org/wiki/List_of_X` -> `List_of_X`.
pub fn page_title_from_url(url: &str) -> &str {
    url.rsplit_once("/wiki/").map_or(url, |(_, page)| page)
}

/// Titles from the italic first cells of a "List of games" table.
pub fn parse_game_list(html: &str) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    for caps in ITALIC_CELL.captures_iter(html) {
        let raw = unescape_html(&caps[1]);
        let title = FOOTNOTE.replace_all(raw.trim(), "").trim().to_string();
        if title.chars().count() < 2 || SKIP.is_match(&title) {
            continue;
        }
        if !titles.contains(&title) {
            titles.push(title);
        }
    }
    titles
}

/// Fetch and parse a Wikipedia game list. Network or parse failures are
/// logged and produce an empty list.
pub async fn fetch_game_list(http: &HttpFetcher, url: &str) -> Result<Vec<String>> {
    let page = page_title_from_url(url);
    info!("[wikipedia] fetching game list {}", page);

    let params = [
        ("action", "parse"),
        ("page", page),
        ("format", "json"),
        ("prop", "text"),
        ("formatversion", "2"),
    ];
    let response: ParseResponse = match http
        .get_json(|c| {
            c.get(API_URL)
                .query(&params)
                .timeout(Duration::from_secs(30))
        })
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!("[wikipedia] error fetching {}: {}", url, err);
            return Ok(Vec::new());
        }
    };

    let Some(parsed) = response.parse else {
        warn!("[wikipedia] no parse data returned for {}", page);
        return Ok(Vec::new());
    };
    let titles = parse_game_list(&parsed.text);
    info!("[wikipedia] found {} game titles", titles.len());
    Ok(titles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_page_title() {
        assert_eq!(
            page_title_from_url("https://en.wikipedia.org/wiki/List_of_Virtual_Boy_games"),
            "List_of_Virtual_Boy_games"
        );
        assert_eq!(page_title_from_url("List_of_X"), "List_of_X");
    }

    #[test]
    fn parses_italic_cells_and_filters_noise() {
        let html = r#"<table>
<tr><td><i>Mario&#39;s Tennis</i></td><td>Sports</td></tr>
<tr><td style="x"><i>Wario Land[a]</i></td></tr>
<tr><td><i>Unreleased</i></td></tr>
<tr><td><i>No</i></td></tr>
<tr><td><i>Nobunaga&#39;s Ambition</i></td></tr>
<tr><td><i>X</i></td></tr>
<tr><td><i>Mario&#39;s Tennis</i></td></tr>
</table>"#;
        assert_eq!(
            parse_game_list(html),
            vec!["Mario's Tennis", "Wario Land", "Nobunaga's Ambition"]
        );
    }
}
