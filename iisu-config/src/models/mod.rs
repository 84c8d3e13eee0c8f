pub mod sources;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use iisu_core::compose::ComposeSettings;
use iisu_core::http::HttpSettings;
use iisu_core::job::{
    CredentialCheck, DatasetSettings, FallbackSettings, JobPaths, JobSettings, PlatformSettings,
};
use iisu_core::providers::{
    IgdbSettings, LibretroSettings, SteamStoreSettings, SteamGridDbSettings, TheGamesDbSettings,
};
use iisu_model::{PlatformKey, ProviderId};

/// One entry of the ordered provider list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    pub id: ProviderId,
    pub enabled: bool,
    /// SteamGridDB only: restrict grids to square dimensions.
    pub square_only: bool,
}

impl ProviderEntry {
    pub fn new(id: ProviderId, enabled: bool) -> Self {
        Self {
            id,
            enabled,
            square_only: true,
        }
    }
}

/// Names of the environment variables that hold provider secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialVars {
    pub sgdb_api_key: String,
    pub igdb_client_id: String,
    pub igdb_client_secret: String,
    pub tgdb_api_key: String,
}

impl Default for CredentialVars {
    fn default() -> Self {
        Self {
            sgdb_api_key: "SGDB_API_KEY".into(),
            igdb_client_id: "IGDB_CLIENT_ID".into(),
            igdb_client_secret: "IGDB_CLIENT_SECRET".into(),
            tgdb_api_key: "TGDB_API_KEY".into(),
        }
    }
}

/// Per-provider settings. Secret fields are empty when the variable is unset.
#[derive(Debug, Clone)]
pub struct ProviderConfigs {
    pub steamgriddb: SteamGridDbSettings,
    pub libretro: LibretroSettings,
    pub igdb: IgdbSettings,
    pub thegamesdb: TheGamesDbSettings,
    pub steam_store: SteamStoreSettings,
}

impl Default for ProviderConfigs {
    fn default() -> Self {
        Self {
            steamgriddb: SteamGridDbSettings::new(""),
            libretro: LibretroSettings::default(),
            igdb: IgdbSettings::new("", ""),
            thegamesdb: TheGamesDbSettings::new(""),
            steam_store: SteamStoreSettings::default(),
        }
    }
}

impl ProviderConfigs {
    /// Whether `id` has every secret it needs.
    pub fn has_credentials(&self, id: ProviderId) -> bool {
        match id {
            ProviderId::SteamGridDb => !self.steamgriddb.api_key.is_empty(),
            ProviderId::Igdb => {
                !self.igdb.client_id.is_empty() && !self.igdb.client_secret.is_empty()
            }
            ProviderId::TheGamesDb => !self.thegamesdb.api_key.is_empty(),
            ProviderId::Libretro | ProviderId::SteamStore => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveConfig {
    pub options_per_provider: usize,
    pub timeout: Duration,
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            options_per_provider: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

/// Fully resolved configuration: every path absolute or relative to the
/// working directory, every default filled in.
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: JobPaths,
    pub cache_dir: PathBuf,
    /// Default worker count for runs that don't override it.
    pub workers: usize,
    pub compose: ComposeSettings,
    pub platforms: BTreeMap<PlatformKey, PlatformSettings>,
    pub platform_aliases: BTreeMap<PlatformKey, Vec<String>>,
    pub platform_hints: BTreeMap<PlatformKey, Vec<String>>,
    pub dataset: DatasetSettings,
    pub providers: Vec<ProviderEntry>,
    pub credential_vars: CredentialVars,
    pub provider_settings: ProviderConfigs,
    pub http: HttpSettings,
    pub fallback: FallbackSettings,
    pub interactive: InteractiveConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.providers.iter().filter(|p| p.enabled)
    }

    /// Secret checks for each enabled provider that needs one.
    pub fn credential_checks(&self) -> Vec<CredentialCheck> {
        let vars = &self.credential_vars;
        let settings = &self.provider_settings;
        let mut checks = Vec::new();
        for entry in self.enabled_providers() {
            match entry.id {
                ProviderId::SteamGridDb => checks.push(CredentialCheck {
                    provider: entry.id.as_str(),
                    env_var: vars.sgdb_api_key.clone(),
                    present: !settings.steamgriddb.api_key.is_empty(),
                }),
                ProviderId::Igdb => {
                    checks.push(CredentialCheck {
                        provider: entry.id.as_str(),
                        env_var: vars.igdb_client_id.clone(),
                        present: !settings.igdb.client_id.is_empty(),
                    });
                    checks.push(CredentialCheck {
                        provider: entry.id.as_str(),
                        env_var: vars.igdb_client_secret.clone(),
                        present: !settings.igdb.client_secret.is_empty(),
                    });
                }
                ProviderId::TheGamesDb => checks.push(CredentialCheck {
                    provider: entry.id.as_str(),
                    env_var: vars.tgdb_api_key.clone(),
                    present: !settings.thegamesdb.api_key.is_empty(),
                }),
                ProviderId::Libretro | ProviderId::SteamStore => {}
            }
        }
        checks
    }

    /// Settings handed to [`iisu_core::job::JobRunner`].
    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            paths: self.paths.clone(),
            platforms: self.platforms.clone(),
            platform_aliases: self.platform_aliases.clone(),
            platform_hints: self.platform_hints.clone(),
            compose: self.compose.clone(),
            fallback: self.fallback,
            dataset: self.dataset.clone(),
            credentials: self.credential_checks(),
            interactive_options_per_provider: self.interactive.options_per_provider,
            interactive_timeout: self.interactive.timeout,
        }
    }

    /// Platforms in the config, or every known platform when none are listed.
    pub fn platform_keys(&self) -> Vec<PlatformKey> {
        if self.platforms.is_empty() {
            PlatformKey::known().collect()
        } else {
            self.platforms.keys().cloned().collect()
        }
    }
}
