use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use crate::dimensions::ImageDimensions;
use crate::error::ModelError;

/// Artwork databases the scraper knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProviderId {
    #[cfg_attr(feature = "serde", serde(rename = "steamgriddb"))]
    SteamGridDb,
    Libretro,
    Igdb,
    #[cfg_attr(feature = "serde", serde(rename = "thegamesdb"))]
    TheGamesDb,
    SteamStore,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::SteamGridDb,
        ProviderId::Libretro,
        ProviderId::Igdb,
        ProviderId::TheGamesDb,
        ProviderId::SteamStore,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ProviderId::SteamGridDb => "steamgriddb",
            ProviderId::Libretro => "libretro",
            ProviderId::Igdb => "igdb",
            ProviderId::TheGamesDb => "thegamesdb",
            ProviderId::SteamStore => "steam_store",
        }
    }

    pub const fn requires_credentials(self) -> bool {
        matches!(
            self,
            ProviderId::SteamGridDb | ProviderId::Igdb | ProviderId::TheGamesDb
        )
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| ModelError::UnknownProvider(s.to_string()))
    }
}

/// Asset slots in an iiSU game folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArtworkKind {
    Icon,
    Title,
    Hero,
    Slide,
}

impl ArtworkKind {
    /// File stem for the asset. `index` is zero-based; numbered kinds are
    /// written one-based (`hero_1`, `slide_3`).
    pub fn file_stem(self, index: usize) -> String {
        match self {
            ArtworkKind::Icon => "icon".to_string(),
            ArtworkKind::Title => "title".to_string(),
            ArtworkKind::Hero => format!("hero_{}", index + 1),
            ArtworkKind::Slide => format!("slide_{}", index + 1),
        }
    }

    pub const fn cache_namespace(self) -> &'static str {
        match self {
            ArtworkKind::Icon => "icon",
            ArtworkKind::Title => "logo",
            ArtworkKind::Hero => "hero",
            ArtworkKind::Slide => "screenshot",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ArtworkKind::Icon => "icon",
            ArtworkKind::Title => "title",
            ArtworkKind::Hero => "hero",
            ArtworkKind::Slide => "slide",
        }
    }
}

impl Display for ArtworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtworkKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "icon" => Ok(ArtworkKind::Icon),
            "title" | "logo" => Ok(ArtworkKind::Title),
            "hero" | "heroes" => Ok(ArtworkKind::Hero),
            "slide" | "slides" | "screenshot" | "screenshots" => {
                Ok(ArtworkKind::Slide)
            }
            _ => Err(ModelError::UnknownArtworkKind(s.to_string())),
        }
    }
}

/// Free-form label describing where an option came from.
///
/// Auto-centering and logo cropping are gated on these labels, so the
/// well-known ones are constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SourceTag(String);

impl SourceTag {
    pub const STEAMGRIDDB_SQUARE: &'static str = "steamgriddb_square";
    pub const LIBRETRO_BOXART: &'static str = "libretro_boxart";
    pub const IGDB_COVER: &'static str = "igdb_cover";
    pub const THEGAMESDB_BOXART: &'static str = "thegamesdb_boxart";
    pub const STEAM_STORE_CAPSULE: &'static str = "steam_store_capsule";
    pub const FALLBACK_PLATFORM_ICON: &'static str = "fallback_platform_icon";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn steamgriddb_style(style: &str) -> Self {
        Self(format!("SteamGridDB - {style}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this tag appears in a configured source list.
    pub fn is_listed(&self, sources: &[String]) -> bool {
        sources.iter().any(|s| s == &self.0)
    }
}

impl Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One candidate image returned by a provider.
#[derive(Clone, PartialEq)]
pub struct ArtworkOption {
    pub provider: ProviderId,
    pub source: SourceTag,
    pub kind: ArtworkKind,
    pub url: Option<String>,
    pub dimensions: Option<ImageDimensions>,
    pub bytes: Arc<[u8]>,
    pub score: Option<i64>,
}

impl ArtworkOption {
    pub fn new(
        provider: ProviderId,
        source: SourceTag,
        kind: ArtworkKind,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            provider,
            source,
            kind,
            url: None,
            dimensions: None,
            bytes: bytes.into(),
            score: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_dimensions(mut self, dims: Option<ImageDimensions>) -> Self {
        self.dimensions = dims;
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for ArtworkOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtworkOption")
            .field("provider", &self.provider)
            .field("source", &self.source)
            .field("kind", &self.kind)
            .field("url", &self.url)
            .field("dimensions", &self.dimensions)
            .field("bytes", &self.bytes.len())
            .field("score", &self.score)
            .finish()
    }
}

/// Answer from an interactive artwork chooser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Chosen(usize),
    Skip,
    CancelAll,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_round_trip_through_strings() {
        for id in ProviderId::ALL {
            assert_eq!(id.as_str().parse::<ProviderId>().unwrap(), id);
        }
        assert!("tmdb".parse::<ProviderId>().is_err());
        assert!(ProviderId::Igdb.requires_credentials());
        assert!(!ProviderId::Libretro.requires_credentials());
        assert!(!ProviderId::SteamStore.requires_credentials());
    }

    #[test]
    fn numbered_stems_are_one_based() {
        assert_eq!(ArtworkKind::Icon.file_stem(0), "icon");
        assert_eq!(ArtworkKind::Title.file_stem(4), "title");
        assert_eq!(ArtworkKind::Hero.file_stem(0), "hero_1");
        assert_eq!(ArtworkKind::Slide.file_stem(2), "slide_3");
    }

    #[test]
    fn debug_hides_payload() {
        let opt = ArtworkOption::new(
            ProviderId::Libretro,
            SourceTag::new(SourceTag::LIBRETRO_BOXART),
            ArtworkKind::Icon,
            vec![0u8; 2048],
        );
        let dbg = format!("{opt:?}");
        assert!(dbg.contains("bytes: 2048"));
        assert_eq!(
            SourceTag::steamgriddb_style("material").as_str(),
            "SteamGridDB - material"
        );
    }
}
