use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use iisu_core::compose::{
    AutoCenterSettings, CenteringOptions, ComposeSettings, DEFAULT_JPEG_QUALITY,
    LogoCropOptions, LogoDetectSettings,
};
use iisu_core::http::HttpSettings;
use iisu_core::job::{DatasetSettings, FallbackSettings, JobPaths, PlatformSettings};
use iisu_model::{ExportFormat, PlatformKey, ProviderId};
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::models::sources::{EnvConfig, FileArtSources, FileConfig};
use crate::models::{
    Config, ConfigMetadata, CredentialVars, InteractiveConfig, ProviderConfigs, ProviderEntry,
};
use crate::validation::{self, ConfigGuardRailError, ConfigWarnings};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("iisu.toml"),
        PathBuf::from("iisu.json"),
        PathBuf::from("config/iisu.toml"),
        PathBuf::from("config/iisu.json"),
    ]
});

const DEFAULT_OUTPUT_SIZE: u32 = 1024;
const DEFAULT_WORKERS: i64 = 4;

#[derive(Debug, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Fail when an enabled provider has no credentials. Offline commands
    /// turn this off and get a warning instead.
    pub require_credentials: bool,
}

impl Default for ConfigLoaderOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            env_file: None,
            require_credentials: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

/// Resolved configuration and the warnings collected on the way.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn require_credentials(mut self, required: bool) -> Self {
        self.options.require_credentials = required;
        self
    }

    /// Load `.env`, then the config file, then apply guard rails.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Everything [`ConfigLoader::load`] does except touching the process
    /// environment.
    pub fn load_with_env(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, mut warnings) = self.compose_config(file_config, env, config_path)?;
        warnings.extend(validation::apply_guard_rails(
            &config,
            self.options.require_credentials,
        )?);
        for warning in &warnings.items {
            debug!("[config] {}", warning.message);
        }
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env.config_path {
            source.env = Some(from_env.clone());
        }

        if source.is_empty() {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            warn!("[config] {} not found, using defaults", path.display());
            return Ok((None, None));
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parsed = match extension.as_deref() {
            Some("toml") => FileConfig::parse_toml(&contents),
            Some("json") => FileConfig::parse_json(&contents),
            _ => FileConfig::parse_from_str(&contents, &path.display().to_string()),
        };
        let file_config = parsed.map_err(|source| ConfigLoadError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!("[config] loaded {} ({:?})", path.display(), provenance);

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "No iisu.toml detected; using built-in defaults",
                "Pass --config or set IISU_CONFIG_PATH to point at a configuration file",
            );
        }

        let base = config_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let resolve = |path: Option<PathBuf>, default: &str| match path {
            Some(p) if p.is_absolute() => p,
            Some(p) => base.join(p),
            None => base.join(default),
        };

        let file = file_config.unwrap_or_default();
        let FileConfig {
            output_size,
            export_format,
            jpeg_quality,
            workers,
            paths: file_paths,
            platforms: file_platforms,
            platform_aliases,
            platform_hints,
            dataset: file_dataset,
            art_sources,
            steamgriddb: file_sgdb,
            libretro: file_libretro,
            igdb: file_igdb,
            thegamesdb: file_tgdb,
            http: file_http,
            auto_centering,
            logo_detection,
            fallback_icons,
            interactive: file_interactive,
        } = file;

        let cache_dir = env
            .cache_dir
            .clone()
            .unwrap_or_else(|| resolve(file_paths.cache_dir, "cache"));
        let paths = JobPaths {
            output_dir: env
                .output_dir
                .clone()
                .unwrap_or_else(|| resolve(file_paths.output_dir, "output")),
            review_dir: resolve(file_paths.review_dir, "review"),
            borders_dir: resolve(file_paths.borders_dir, "borders"),
            fallback_icons_dir: resolve(fallback_icons.fallback_icons_path, "fallback_icons"),
            platform_icons_dir: resolve(file_paths.platform_icons_dir, "platform_icons"),
        };

        let format = match export_format {
            Some(raw) => raw.parse::<ExportFormat>().map_err(|err| {
                ConfigLoadError::InvalidValue {
                    field: "export_format",
                    reason: err.to_string(),
                }
            })?,
            None => ExportFormat::Jpeg,
        };
        let jpeg_quality =
            validation::jpeg_quality(jpeg_quality.unwrap_or(i64::from(DEFAULT_JPEG_QUALITY)))?;
        let workers = validation::workers(workers.unwrap_or(DEFAULT_WORKERS))?;

        let mut auto_center = AutoCenterSettings::default();
        let defaults = CenteringOptions::default();
        auto_center.enabled = auto_centering.enabled.unwrap_or(auto_center.enabled);
        if let Some(sources) = auto_centering.sources {
            auto_center.sources = sources;
        }
        auto_center.options = CenteringOptions {
            steps: auto_centering.search_steps.unwrap_or(defaults.steps).max(1),
            span: auto_centering.search_span.unwrap_or(defaults.span),
            tolerance: auto_centering.tolerance.unwrap_or(defaults.tolerance),
            alpha_threshold: auto_centering
                .alpha_threshold
                .unwrap_or(defaults.alpha_threshold),
            margin: auto_centering.margin_pct.unwrap_or(defaults.margin),
        };

        let mut logo_detect = LogoDetectSettings::default();
        let logo_defaults = LogoCropOptions::default();
        logo_detect.enabled = logo_detection.enabled.unwrap_or(logo_detect.enabled);
        if let Some(sources) = logo_detection.sources {
            logo_detect.sources = sources;
        }
        logo_detect.options = LogoCropOptions {
            alpha_threshold: auto_center.options.alpha_threshold,
            padding: logo_detection.padding.unwrap_or(logo_defaults.padding),
            min_content_ratio: logo_detection
                .min_content_ratio
                .unwrap_or(logo_defaults.min_content_ratio),
            max_crop_ratio: logo_detection
                .max_crop_ratio
                .unwrap_or(logo_defaults.max_crop_ratio),
        };

        let compose = ComposeSettings {
            out_size: output_size.unwrap_or(DEFAULT_OUTPUT_SIZE),
            format,
            jpeg_quality,
            auto_center,
            logo_detect,
        };

        let mut platforms = BTreeMap::new();
        for (key, p) in file_platforms {
            let key = PlatformKey::new(key);
            let wikipedia_url = p.wikipedia_url.filter(|u| !u.trim().is_empty());
            let wikipedia_url = match wikipedia_url {
                Some(link) if Url::parse(&link).is_err() => {
                    warnings.push(format!(
                        "{key}: ignoring wikipedia_url {link:?}, not a valid URL"
                    ));
                    None
                }
                other => other,
            };
            platforms.insert(
                key,
                PlatformSettings {
                    border_file: p.border_file,
                    wikipedia_url,
                },
            );
        }

        let dataset = DatasetSettings {
            enabled: file_dataset.enabled.unwrap_or(true),
            repo_zip_url: file_dataset
                .repo_zip_url
                .unwrap_or_else(|| iisu_core::dataset::DEFAULT_REPO_ZIP_URL.to_string()),
            gamesdb_subdir: file_dataset
                .gamesdb_subdir
                .unwrap_or_else(|| iisu_core::dataset::DEFAULT_GAMESDB_SUBDIR.to_string()),
            per_platform_limit: file_dataset.per_platform_limit.unwrap_or(0),
            cache_dir: resolve(file_paths.dataset_cache_dir, "dataset_cache"),
        };

        let providers = resolve_providers(&art_sources, &mut warnings);

        let defaults = CredentialVars::default();
        let credential_vars = CredentialVars {
            sgdb_api_key: file_sgdb.api_key_env.unwrap_or(defaults.sgdb_api_key),
            igdb_client_id: file_igdb.client_id_env.unwrap_or(defaults.igdb_client_id),
            igdb_client_secret: file_igdb
                .client_secret_env
                .unwrap_or(defaults.igdb_client_secret),
            tgdb_api_key: file_tgdb.api_key_env.unwrap_or(defaults.tgdb_api_key),
        };
        let secret = |name: &str| env.secret(name).unwrap_or_default();

        let mut settings = ProviderConfigs::default();

        let sgdb = &mut settings.steamgriddb;
        sgdb.api_key = secret(&credential_vars.sgdb_api_key);
        if let Some(url) = file_sgdb.base_url {
            sgdb.base_url = url;
        }
        if let Some(timeout) = seconds(file_sgdb.request_timeout_seconds) {
            sgdb.timeout = timeout;
        }
        if let Some(delay) = seconds(file_sgdb.delay_seconds) {
            sgdb.delay = delay;
        }
        sgdb.allow_animated = file_sgdb.allow_animated.unwrap_or(sgdb.allow_animated);
        if let Some(dim) = file_sgdb.prefer_dimensions.and_then(|d| d.into_iter().next()) {
            sgdb.prefer_dim = dim;
        }
        if let Some(styles) = file_sgdb.square_styles {
            sgdb.square_styles = styles;
        }
        if let Some(entry) = providers.iter().find(|p| p.id == ProviderId::SteamGridDb) {
            sgdb.square_only = entry.square_only;
        }

        let libretro = &mut settings.libretro;
        if let Some(url) = file_libretro.base_url {
            libretro.base_url = url;
        }
        libretro.playlist_names.extend(
            file_libretro
                .playlist_names
                .into_iter()
                .map(|(k, v)| (PlatformKey::new(k), v)),
        );
        libretro.use_index_matching = file_libretro
            .use_index_matching
            .unwrap_or(libretro.use_index_matching);
        libretro.index_cache_hours = file_libretro
            .index_cache_hours
            .unwrap_or(libretro.index_cache_hours);
        if let Some(timeout) = seconds(file_libretro.request_timeout_seconds) {
            libretro.timeout = timeout;
        }

        let igdb = &mut settings.igdb;
        igdb.client_id = secret(&credential_vars.igdb_client_id);
        igdb.client_secret = secret(&credential_vars.igdb_client_secret);
        if let Some(url) = file_igdb.base_url {
            igdb.base_url = url;
        }
        if let Some(timeout) = seconds(file_igdb.request_timeout_seconds) {
            igdb.timeout = timeout;
        }
        if let Some(delay) = seconds(file_igdb.delay_seconds) {
            igdb.delay = delay;
        }
        if let Some(size) = file_igdb.cover_size {
            igdb.cover_size = size;
        }
        igdb.platform_map.extend(
            file_igdb
                .platform_map
                .into_iter()
                .map(|(k, v)| (PlatformKey::new(k), v)),
        );

        let tgdb = &mut settings.thegamesdb;
        tgdb.api_key = secret(&credential_vars.tgdb_api_key);
        if let Some(url) = file_tgdb.base_url {
            tgdb.base_url = url;
        }
        if let Some(timeout) = seconds(file_tgdb.request_timeout_seconds) {
            tgdb.timeout = timeout;
        }
        if let Some(delay) = seconds(file_tgdb.delay_seconds) {
            tgdb.delay = delay;
        }
        if let Some(kind) = file_tgdb.prefer_image_type {
            tgdb.prefer_image_type = kind;
        }
        tgdb.platform_map.extend(
            file_tgdb
                .platform_map
                .into_iter()
                .map(|(k, v)| (PlatformKey::new(k), v)),
        );

        let mut http = HttpSettings::default();
        if let Some(n) = file_http.max_concurrent_downloads {
            http.max_concurrent = n.max(1);
        }
        if let Some(timeout) = seconds(file_http.request_timeout_seconds) {
            http.timeout = timeout;
        }
        if let Some(agent) = file_http.user_agent {
            http.user_agent = agent;
        }
        if let Some(n) = file_http.max_attempts {
            http.max_attempts = n.max(1);
        }

        let fallback = FallbackSettings {
            use_platform_icon: fallback_icons.use_platform_icon_fallback.unwrap_or(false),
            skip_scraping: fallback_icons.skip_scraping_use_platform_icon.unwrap_or(false),
        };

        let interactive_defaults = InteractiveConfig::default();
        let interactive = InteractiveConfig {
            options_per_provider: file_interactive
                .options_per_provider
                .unwrap_or(interactive_defaults.options_per_provider)
                .max(1),
            timeout: file_interactive
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(interactive_defaults.timeout),
        };

        check_url("dataset.repo_zip_url", &dataset.repo_zip_url)?;
        check_url("steamgriddb.base_url", &settings.steamgriddb.base_url)?;
        check_url("libretro.base_url", &settings.libretro.base_url)?;
        check_url("igdb.base_url", &settings.igdb.base_url)?;
        check_url("thegamesdb.base_url", &settings.thegamesdb.base_url)?;

        let config = Config {
            paths,
            cache_dir,
            workers,
            compose,
            platforms,
            platform_aliases: keyed(platform_aliases),
            platform_hints: keyed(platform_hints),
            dataset,
            providers,
            credential_vars,
            provider_settings: settings,
            http,
            fallback,
            interactive,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        };

        Ok((config, warnings))
    }
}

fn check_url(field: &'static str, raw: &str) -> Result<(), ConfigLoadError> {
    Url::parse(raw)
        .map(|_| ())
        .map_err(|source| ConfigLoadError::InvalidUrl { field, source })
}

fn keyed<V>(map: BTreeMap<String, V>) -> BTreeMap<PlatformKey, V> {
    map.into_iter().map(|(k, v)| (PlatformKey::new(k), v)).collect()
}

/// Non-negative, finite seconds; anything else keeps the default.
fn seconds(value: Option<f64>) -> Option<Duration> {
    value.and_then(|v| Duration::try_from_secs_f64(v).ok())
}

/// Provider order from a pre-list `art_sources.mode` string.
pub fn migrate_legacy_mode(mode: &str) -> Vec<ProviderEntry> {
    let mut entries = match mode.trim().to_ascii_lowercase().as_str() {
        "steamgriddb" => vec![ProviderEntry::new(ProviderId::SteamGridDb, true)],
        "libretro" => vec![ProviderEntry::new(ProviderId::Libretro, true)],
        "libretro_then_steamgriddb" => vec![
            ProviderEntry::new(ProviderId::Libretro, true),
            ProviderEntry::new(ProviderId::SteamGridDb, true),
        ],
        _ => vec![
            ProviderEntry::new(ProviderId::SteamGridDb, true),
            ProviderEntry::new(ProviderId::Libretro, true),
        ],
    };
    entries.push(ProviderEntry::new(ProviderId::Igdb, false));
    entries.push(ProviderEntry::new(ProviderId::TheGamesDb, false));
    entries
}

fn resolve_providers(sources: &FileArtSources, warnings: &mut ConfigWarnings) -> Vec<ProviderEntry> {
    let Some(listed) = &sources.providers else {
        return migrate_legacy_mode(sources.mode.as_deref().unwrap_or_default());
    };

    let mut entries: Vec<ProviderEntry> = Vec::with_capacity(listed.len());
    for raw in listed {
        let id = match raw.id.parse::<ProviderId>() {
            Ok(id) => id,
            Err(err) => {
                warnings.push(format!("ignoring art source: {err}"));
                continue;
            }
        };
        if entries.iter().any(|e| e.id == id) {
            warnings.push(format!("art source {id} listed twice; keeping the first"));
            continue;
        }
        entries.push(ProviderEntry {
            id,
            enabled: raw.enabled,
            square_only: raw.square_only.unwrap_or(true),
        });
    }
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Environment,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(self, Self::Explicit | Self::Environment)
    }
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn is_empty(&self) -> bool {
        self.explicit.is_none() && self.env.is_none()
    }

    fn resolved_path(self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = self.explicit {
            Some((path, ConfigPathProvenance::Explicit))
        } else if let Some(path) = self.env {
            Some((path, ConfigPathProvenance::Environment))
        } else {
            self.default.map(|path| (path, ConfigPathProvenance::Default))
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("invalid URL in {field}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error("failed to load env file")]
    EnvFile(#[from] dotenvy::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_modes_map_to_provider_lists() {
        let ids = |mode: &str| {
            migrate_legacy_mode(mode)
                .into_iter()
                .map(|e| (e.id, e.enabled))
                .collect::<Vec<_>>()
        };
        assert_eq!(
            ids("libretro_then_steamgriddb"),
            vec![
                (ProviderId::Libretro, true),
                (ProviderId::SteamGridDb, true),
                (ProviderId::Igdb, false),
                (ProviderId::TheGamesDb, false),
            ]
        );
        assert_eq!(ids("steamgriddb")[0], (ProviderId::SteamGridDb, true));
        assert_eq!(ids("libretro").len(), 3);
        assert_eq!(ids("whatever")[..2], [
            (ProviderId::SteamGridDb, true),
            (ProviderId::Libretro, true)
        ]);
    }

    #[test]
    fn unknown_and_duplicate_sources_warn() {
        let sources: FileArtSources = toml::from_str(
            r#"
[[providers]]
id = "custom_http"

[[providers]]
id = "libretro"

[[providers]]
id = "LIBRETRO"
enabled = false
"#,
        )
        .expect("art sources parse");
        let mut warnings = ConfigWarnings::default();
        let entries = resolve_providers(&sources, &mut warnings);
        assert_eq!(entries, vec![ProviderEntry::new(ProviderId::Libretro, true)]);
        assert_eq!(warnings.items.len(), 2);
    }

    #[test]
    fn bad_timeouts_keep_defaults() {
        assert_eq!(seconds(Some(-1.0)), None);
        assert_eq!(seconds(Some(f64::NAN)), None);
        assert_eq!(seconds(Some(0.25)), Some(Duration::from_millis(250)));
    }

    #[test]
    fn environment_path_that_is_missing_is_an_error() {
        let env = EnvConfig::from_vars([("IISU_CONFIG_PATH", "/definitely/not/here.toml")]);
        let err = ConfigLoader::new().load_with_env(env).unwrap_err();
        assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
    }
}
