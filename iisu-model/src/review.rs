use std::fmt::{self, Display};

/// Reason a work item was written to the review folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReviewKind {
    NoArt,
    OffCenter,
    ComposeError,
    NoFallback,
    NoProviders,
}

impl ReviewKind {
    /// Suffix appended to the slug of the review file stem.
    pub const fn suffix(self) -> &'static str {
        match self {
            ReviewKind::NoArt => "__no_art",
            ReviewKind::OffCenter => "__offcenter",
            ReviewKind::ComposeError => "__compose_error",
            ReviewKind::NoFallback => "__no_fallback",
            ReviewKind::NoProviders => "__no_providers",
        }
    }

    /// Review file name for a title slug, e.g. `Zelda__no_art.json`.
    pub fn file_name(self, slug: &str) -> String {
        format!("{slug}{}.json", self.suffix())
    }
}

impl Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix().trim_start_matches('_'))
    }
}

/// JSON body written next to review items.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReviewRecord {
    pub title: String,
    pub platform: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub provider_order: Option<Vec<String>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub source: Option<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub centering: Option<(f64, f64)>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub content_centroid: Option<(f64, f64)>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub deviation: Option<(f64, f64)>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub count: Option<u64>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
}

impl ReviewRecord {
    pub fn new(title: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            platform: platform.into(),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_provider_order(mut self, order: Vec<String>) -> Self {
        self.provider_order = Some(order);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_file_names() {
        assert_eq!(ReviewKind::NoArt.file_name("Zelda"), "Zelda__no_art.json");
        assert_eq!(
            ReviewKind::OffCenter.file_name("Kirby"),
            "Kirby__offcenter.json"
        );
        assert_eq!(ReviewKind::ComposeError.to_string(), "compose_error");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn optional_fields_are_omitted() {
        let record = ReviewRecord::new("Zelda", "NES")
            .with_provider_order(vec!["libretro".into()])
            .with_error("No artwork found");
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["title"], "Zelda");
        assert_eq!(json["provider_order"][0], "libretro");
        assert!(json.get("centering").is_none());
    }
}
