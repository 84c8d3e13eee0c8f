//! Just enough HTML handling for directory listings and wiki tables.

use once_cell::sync::Lazy;
use regex::Regex;

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);")
        .expect("html entity regex should compile")
});

static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("html tag regex should compile"));

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "rsquo" | "lsquo" => '\'',
        "eacute" => 'é',
        _ => return None,
    })
}

/// Decode named and numeric character references. Unknown entities are
/// left as written.
pub fn unescape_html(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body
                .strip_prefix("#x")
                .or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Drop every HTML tag, keeping the text between them.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_common_entities() {
        assert_eq!(unescape_html("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(unescape_html("Link&#39;s Awakening"), "Link's Awakening");
        assert_eq!(unescape_html("Pok&#xE9;mon"), "Pokémon");
        assert_eq!(unescape_html("&bogus; stays"), "&bogus; stays");
    }

    #[test]
    fn strips_markup() {
        assert_eq!(strip_tags("<i><a href=\"/x\">Doom</a></i>"), "Doom");
    }
}
