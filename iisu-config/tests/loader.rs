use std::path::{Path, PathBuf};

use iisu_config::{
    ConfigGuardRailError, ConfigLoadError, ConfigLoader, EnvConfig, ProviderEntry,
};
use iisu_core::http::{HttpFetcher, HttpSettings};
use iisu_model::{ExportFormat, PlatformKey, ProviderId};
use tempfile::TempDir;

const FULL: &str = r#"
output_size = 512
export_format = "png"
jpeg_quality = 90
workers = 6

[paths]
borders_dir = "frames"
output_dir = "/abs/out"
cache_dir = "cache"

[platforms.nes]
border_file = "nes.png"
wikipedia_url = "https://en.wikipedia.org/wiki/List_of_NES_games"

[platform_aliases]
NES = ["Nintendo Entertainment System"]

[art_sources]
providers = [
  { id = "libretro" },
  { id = "steamgriddb", square_only = false },
  { id = "igdb", enabled = false },
  { id = "thegamesdb" },
]

[steamgriddb]
api_key_env = "MY_SGDB"
prefer_dimensions = ["512x512", "1024x1024"]

[auto_centering]
enabled = false
search_steps = 3

[fallback_icons]
use_platform_icon_fallback = true
"#;

fn write_config(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).expect("write config");
    path
}

fn env(pairs: &[(&str, &str)]) -> EnvConfig {
    EnvConfig::from_vars(pairs.iter().map(|(k, v)| (*k, *v)))
}

fn load(path: &Path, vars: &[(&str, &str)]) -> Result<iisu_config::ConfigLoad, ConfigLoadError> {
    ConfigLoader::new().with_config_path(path).load_with_env(env(vars))
}

#[test]
fn full_file_resolves_paths_secrets_and_order() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "iisu.toml", FULL);

    let load = load(&path, &[("MY_SGDB", "sgdb-key"), ("TGDB_API_KEY", "tgdb-key")])
        .expect("config loads");
    let config = load.config;

    assert_eq!(config.paths.borders_dir, dir.path().join("frames"));
    assert_eq!(config.paths.output_dir, PathBuf::from("/abs/out"));
    assert_eq!(config.cache_dir, dir.path().join("cache"));
    assert_eq!(config.paths.review_dir, dir.path().join("review"));
    assert_eq!(config.metadata.config_path, Some(path));

    assert_eq!(config.compose.out_size, 512);
    assert_eq!(config.compose.format, ExportFormat::Png);
    assert_eq!(config.compose.jpeg_quality, 90);
    assert!(!config.compose.auto_center.enabled);
    assert_eq!(config.compose.auto_center.options.steps, 3);
    assert_eq!(config.workers, 6);
    assert!(config.fallback.use_platform_icon);

    let nes = PlatformKey::new("NES");
    assert_eq!(
        config.platforms[&nes].border_file,
        Some(PathBuf::from("nes.png"))
    );
    assert_eq!(config.platform_aliases[&nes], vec!["Nintendo Entertainment System"]);

    let sgdb = &config.provider_settings.steamgriddb;
    assert_eq!(sgdb.api_key, "sgdb-key");
    assert_eq!(sgdb.prefer_dim, "512x512");
    assert!(!sgdb.square_only);

    let settings = config.job_settings();
    assert_eq!(settings.credentials.len(), 2);
    assert!(settings.missing_credential().is_none());

    let http = HttpFetcher::new(HttpSettings::default()).expect("http client");
    let providers = config.build_providers(&http);
    assert_eq!(
        providers.icon_order(),
        vec![ProviderId::Libretro, ProviderId::SteamGridDb, ProviderId::TheGamesDb]
    );
    assert_eq!(
        providers.logo_hero.as_ref().map(|p| p.id()),
        Some(ProviderId::SteamGridDb)
    );
    let shots: Vec<_> = providers.screenshots.iter().map(|p| p.id()).collect();
    assert_eq!(shots, vec![ProviderId::TheGamesDb, ProviderId::Libretro]);
}

#[test]
fn json_config_is_accepted() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        "iisu.json",
        r#"{"output_size": 256, "art_sources": {"mode": "libretro"}}"#,
    );
    let config = load(&path, &[]).expect("json loads").config;
    assert_eq!(config.compose.out_size, 256);
    assert_eq!(
        config.providers,
        vec![
            ProviderEntry::new(ProviderId::Libretro, true),
            ProviderEntry::new(ProviderId::Igdb, false),
            ProviderEntry::new(ProviderId::TheGamesDb, false),
        ]
    );
}

#[test]
fn missing_credentials_are_rejected_unless_relaxed() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "iisu.toml", "[art_sources]\nmode = \"steamgriddb\"\n");

    let err = load(&path, &[]).unwrap_err();
    assert!(matches!(
        err,
        ConfigLoadError::GuardRail(ConfigGuardRailError::MissingCredential { provider: "steamgriddb", ref env_var })
            if env_var == "SGDB_API_KEY"
    ));

    let relaxed = ConfigLoader::new()
        .with_config_path(&path)
        .require_credentials(false)
        .load_with_env(env(&[]))
        .expect("relaxed load");
    assert!(
        relaxed
            .warnings
            .items
            .iter()
            .any(|w| w.message.contains("SGDB_API_KEY"))
    );
    assert!(relaxed.config.job_settings().missing_credential().is_some());
}

#[test]
fn skip_scraping_needs_no_providers_or_keys() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        "iisu.toml",
        r#"
[art_sources]
providers = [{ id = "steamgriddb", enabled = false }]

[fallback_icons]
skip_scraping_use_platform_icon = true
"#,
    );
    let config = load(&path, &[]).expect("skip mode loads").config;
    assert!(config.fallback.skip_scraping);
}

#[test]
fn no_enabled_provider_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        "iisu.toml",
        "[art_sources]\nproviders = [{ id = \"libretro\", enabled = false }]\n",
    );
    let err = load(&path, &[]).unwrap_err();
    assert!(matches!(
        err,
        ConfigLoadError::GuardRail(ConfigGuardRailError::NoEnabledProvider)
    ));
}

#[test]
fn numeric_limits_are_enforced() {
    let dir = TempDir::new().expect("tempdir");
    let cases = [
        ("output_size = 32\n", ConfigGuardRailError::OutputSizeOutOfRange { value: 32 }),
        ("jpeg_quality = 0\n", ConfigGuardRailError::JpegQualityOutOfRange { value: 0 }),
        ("jpeg_quality = 101\n", ConfigGuardRailError::JpegQualityOutOfRange { value: 101 }),
        ("workers = 0\n", ConfigGuardRailError::InvalidWorkers { value: 0 }),
    ];
    for (body, expected) in cases {
        let body = format!("{body}[art_sources]\nmode = \"libretro\"\n");
        let path = write_config(&dir, "iisu.toml", &body);
        match load(&path, &[]) {
            Err(ConfigLoadError::GuardRail(err)) => assert_eq!(err, expected, "{body}"),
            other => panic!("expected guard rail for {body}, got {other:?}"),
        }
    }
}

#[test]
fn bad_export_format_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        "iisu.toml",
        "export_format = \"tiff\"\n[art_sources]\nmode = \"libretro\"\n",
    );
    let err = load(&path, &[]).unwrap_err();
    assert!(matches!(
        err,
        ConfigLoadError::InvalidValue { field: "export_format", .. }
    ));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = load(&dir.path().join("nope.toml"), &[]).unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn env_overrides_output_and_cache_dirs() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "iisu.toml", "[art_sources]\nmode = \"libretro\"\n");
    let config = load(
        &path,
        &[("IISU_OUTPUT_DIR", "/env/out"), ("IISU_CACHE_DIR", "/env/cache")],
    )
    .expect("loads")
    .config;
    assert_eq!(config.paths.output_dir, PathBuf::from("/env/out"));
    assert_eq!(config.cache_dir, PathBuf::from("/env/cache"));
    assert_eq!(config.dataset.cache_dir, dir.path().join("dataset_cache"));
}

#[test]
fn unparseable_file_names_the_path() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "iisu.toml", "output_size = [");
    match load(&path, &[]) {
        Err(ConfigLoadError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn malformed_urls_are_caught() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        "iisu.toml",
        "[art_sources]\nmode = \"libretro\"\n\n[libretro]\nbase_url = \"not a url\"\n",
    );
    match load(&path, &[]) {
        Err(ConfigLoadError::InvalidUrl { field, .. }) => assert_eq!(field, "libretro.base_url"),
        other => panic!("expected invalid url, got {other:?}"),
    }

    let path = write_config(
        &dir,
        "iisu.toml",
        "[art_sources]\nmode = \"libretro\"\n\n[platforms.snes]\nwikipedia_url = \"wiki page\"\n",
    );
    let loaded = load(&path, &[]).expect("bad wikipedia link only warns");
    let snes = loaded
        .config
        .platforms
        .get(&PlatformKey::new("snes"))
        .expect("snes entry");
    assert!(snes.wikipedia_url.is_none());
    assert!(loaded.warnings.items.iter().any(|w| w.message.contains("wikipedia_url")));
}
