//! Artwork providers behind a common async trait.

/// IGDB covers and screenshots
pub mod igdb;
/// Libretro thumbnail repository
pub mod libretro;
/// Steam store assets
pub mod steam_store;
/// SteamGridDB grids, logos and heroes
pub mod steamgriddb;
/// TheGamesDB box art and screenshots
pub mod thegamesdb;
/// Provider trait and request type
pub mod traits;

use std::fmt;
use std::sync::Arc;

use iisu_model::ProviderId;

pub use igdb::{IgdbProvider, IgdbSettings};
pub use libretro::{LibretroProvider, LibretroSettings};
pub use steam_store::{SteamStoreProvider, SteamStoreSettings};
pub use steamgriddb::{SteamGridDbProvider, SteamGridDbSettings};
pub use thegamesdb::{TheGamesDbProvider, TheGamesDbSettings};
pub use traits::{ArtworkProvider, ArtworkRequest, ProviderError};

/// Providers wired up for a job, in priority order.
#[derive(Clone, Default)]
pub struct ProviderSet {
    /// Icon providers, tried in order.
    pub icon: Vec<Arc<dyn ArtworkProvider>>,
    /// Source of logos and heroes.
    pub logo_hero: Option<Arc<dyn ArtworkProvider>>,
    /// Screenshot providers, tried in order.
    pub screenshots: Vec<Arc<dyn ArtworkProvider>>,
}

impl ProviderSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an icon provider.
    pub fn with_icon(mut self, provider: Arc<dyn ArtworkProvider>) -> Self {
        self.icon.push(provider);
        self
    }

    /// Set the logo and hero provider.
    pub fn with_logo_hero(mut self, provider: Arc<dyn ArtworkProvider>) -> Self {
        self.logo_hero = Some(provider);
        self
    }

    /// Append a screenshot provider.
    pub fn with_screenshots(mut self, provider: Arc<dyn ArtworkProvider>) -> Self {
        self.screenshots.push(provider);
        self
    }

    /// True when no icon provider is configured.
    pub fn is_empty(&self) -> bool {
        self.icon.is_empty()
    }

    /// Icon provider ids in priority order.
    pub fn icon_order(&self) -> Vec<ProviderId> {
        self.icon.iter().map(|p| p.id()).collect()
    }
}

impl fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSet")
            .field("icon", &self.icon_order())
            .field("logo_hero", &self.logo_hero.as_ref().map(|p| p.id()))
            .field(
                "screenshots",
                &self.screenshots.iter().map(|p| p.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
