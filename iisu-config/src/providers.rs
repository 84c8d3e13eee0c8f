//! Turns the configured provider list into live provider handles.

use std::sync::Arc;

use iisu_core::cache::{BlobStore, CacheRoot, CachedDownloader};
use iisu_core::http::HttpFetcher;
use iisu_core::providers::{
    ArtworkProvider, IgdbProvider, LibretroProvider, ProviderSet, SteamGridDbProvider,
    SteamStoreProvider, TheGamesDbProvider,
};
use iisu_model::ProviderId;
use tracing::{debug, warn};

use crate::models::Config;

impl Config {
    /// Download cache shared by every provider.
    pub fn downloader(&self, http: &HttpFetcher) -> CachedDownloader {
        CachedDownloader::new(
            http.clone(),
            BlobStore::new(CacheRoot::new(self.cache_dir.clone())),
        )
    }

    /// Icon providers in configured order; logos and heroes from SteamGridDB
    /// (or the Steam store without a key); screenshots from IGDB, TheGamesDB
    /// and Libretro, each when usable.
    pub fn build_providers(&self, http: &HttpFetcher) -> ProviderSet {
        let downloader = self.downloader(http);
        let settings = &self.provider_settings;
        let usable = |id: ProviderId| settings.has_credentials(id);

        let sgdb: Option<Arc<dyn ArtworkProvider>> = usable(ProviderId::SteamGridDb).then(|| {
            Arc::new(SteamGridDbProvider::new(
                settings.steamgriddb.clone(),
                downloader.clone(),
            )) as Arc<dyn ArtworkProvider>
        });
        let libretro: Arc<dyn ArtworkProvider> = Arc::new(LibretroProvider::new(
            settings.libretro.clone(),
            downloader.clone(),
        ));
        let igdb: Option<Arc<dyn ArtworkProvider>> = usable(ProviderId::Igdb).then(|| {
            Arc::new(IgdbProvider::new(settings.igdb.clone(), downloader.clone()))
                as Arc<dyn ArtworkProvider>
        });
        let tgdb: Option<Arc<dyn ArtworkProvider>> = usable(ProviderId::TheGamesDb).then(|| {
            Arc::new(TheGamesDbProvider::new(
                settings.thegamesdb.clone(),
                downloader.clone(),
            )) as Arc<dyn ArtworkProvider>
        });
        let steam_store: Arc<dyn ArtworkProvider> = Arc::new(SteamStoreProvider::new(
            settings.steam_store.clone(),
            downloader.clone(),
        ));

        let mut set = ProviderSet::new();
        for entry in self.enabled_providers() {
            let provider = match entry.id {
                ProviderId::SteamGridDb => sgdb.clone(),
                ProviderId::Libretro => Some(Arc::clone(&libretro)),
                ProviderId::Igdb => igdb.clone(),
                ProviderId::TheGamesDb => tgdb.clone(),
                ProviderId::SteamStore => Some(Arc::clone(&steam_store)),
            };
            match provider {
                Some(provider) => set = set.with_icon(provider),
                None => warn!("[providers] {} enabled without credentials, skipped", entry.id),
            }
        }

        let store_listed = self
            .enabled_providers()
            .any(|e| e.id == ProviderId::SteamStore);
        match (sgdb, store_listed) {
            (Some(sgdb), _) => set = set.with_logo_hero(sgdb),
            (None, true) => set = set.with_logo_hero(steam_store),
            (None, false) => debug!("[providers] no logo/hero source configured"),
        }

        for provider in [igdb, tgdb].into_iter().flatten() {
            set = set.with_screenshots(provider);
        }
        set = set.with_screenshots(libretro);

        debug!("[providers] {:?}", set);
        set
    }
}
