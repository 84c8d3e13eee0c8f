use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub const ENV_CONFIG_PATH: &str = "IISU_CONFIG_PATH";
pub const ENV_OUTPUT_DIR: &str = "IISU_OUTPUT_DIR";
pub const ENV_CACHE_DIR: &str = "IISU_CACHE_DIR";

/// Raw configuration as written in `iisu.toml` / `iisu.json`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jpeg_quality: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<i64>,
    #[serde(default)]
    pub paths: FilePathsConfig,
    #[serde(default)]
    pub platforms: BTreeMap<String, FilePlatformConfig>,
    #[serde(default)]
    pub platform_aliases: BTreeMap<String, Vec<String>>,
    #[serde(default, alias = "sgdb_platform_hints")]
    pub platform_hints: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub dataset: FileDatasetConfig,
    #[serde(default)]
    pub art_sources: FileArtSources,
    #[serde(default)]
    pub steamgriddb: FileSteamGridDbConfig,
    #[serde(default)]
    pub libretro: FileLibretroConfig,
    #[serde(default)]
    pub igdb: FileIgdbConfig,
    #[serde(default)]
    pub thegamesdb: FileTheGamesDbConfig,
    #[serde(default)]
    pub http: FileHttpConfig,
    #[serde(default)]
    pub auto_centering: FileAutoCenteringConfig,
    #[serde(default)]
    pub logo_detection: FileLogoDetectionConfig,
    #[serde(default)]
    pub fallback_icons: FileFallbackConfig,
    #[serde(default)]
    pub interactive: FileInteractiveConfig,
}

impl FileConfig {
    /// Parse either format; TOML is tried first.
    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_toml(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).map_err(|err| anyhow!("invalid toml: {err}"))
    }

    pub fn parse_json(contents: &str) -> anyhow::Result<Self> {
        serde_json::from_str(contents).map_err(|err| anyhow!("invalid json: {err}"))
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FilePathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borders_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_cache_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_icons_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FilePlatformConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikipedia_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatasetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_zip_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamesdb_subdir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_platform_limit: Option<usize>,
}

/// Either the provider list or the older single `mode` string.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileArtSources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<FileProviderEntry>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileProviderEntry {
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_only: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileSteamGridDbConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_animated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefer_dimensions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_styles: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLibretroConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub playlist_names: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_index_matching: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_cache_hours: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileIgdbConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_size: Option<String>,
    #[serde(default)]
    pub platform_map: BTreeMap<String, u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileTheGamesDbConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefer_image_type: Option<String>,
    #[serde(default)]
    pub platform_map: BTreeMap<String, u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileHttpConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_downloads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAutoCenteringConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_span: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_threshold: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_pct: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLogoDetectionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_content_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_crop_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileFallbackConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_platform_icon_fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_scraping_use_platform_icon: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_icons_path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileInteractiveConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options_per_provider: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Configuration sourced from the process environment.
///
/// Secrets are looked up by name because the file decides which variable
/// holds each API key.
#[derive(Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfig")
            .field("config_path", &self.config_path)
            .field("output_dir", &self.output_dir)
            .field("cache_dir", &self.cache_dir)
            .field("vars", &self.vars.len())
            .finish()
    }
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let path = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            config_path: path(ENV_CONFIG_PATH),
            output_dir: path(ENV_OUTPUT_DIR),
            cache_dir: path(ENV_CACHE_DIR),
            vars,
        }
    }

    /// Trimmed, non-empty value of `name`.
    pub fn secret(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_parse_to_the_same_shape() {
        let toml = r#"
output_size = 512
export_format = "PNG"

[paths]
borders_dir = "frames"

[platforms.NES]
border_file = "nes.png"

[[art_sources.providers]]
id = "libretro"
"#;
        let json = r#"{
            "output_size": 512,
            "export_format": "PNG",
            "paths": {"borders_dir": "frames"},
            "platforms": {"NES": {"border_file": "nes.png"}},
            "art_sources": {"providers": [{"id": "libretro"}]}
        }"#;

        for cfg in [
            FileConfig::parse_from_str(toml, "iisu.toml").expect("toml parses"),
            FileConfig::parse_from_str(json, "iisu.json").expect("json parses"),
        ] {
            assert_eq!(cfg.output_size, Some(512));
            assert_eq!(cfg.paths.borders_dir, Some(PathBuf::from("frames")));
            assert_eq!(
                cfg.platforms["NES"].border_file,
                Some(PathBuf::from("nes.png"))
            );
            let providers = cfg.art_sources.providers.expect("providers listed");
            assert_eq!(providers[0].id, "libretro");
            assert!(providers[0].enabled);
        }
    }

    #[test]
    fn legacy_hint_key_is_accepted() {
        let cfg = FileConfig::parse_toml("[sgdb_platform_hints]\nNES = [\"Famicom\"]\n")
            .expect("parses");
        assert_eq!(cfg.platform_hints["NES"], vec!["Famicom"]);
    }

    #[test]
    fn garbage_reports_both_formats() {
        let err = FileConfig::parse_from_str("{ not = valid", "x.conf").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("toml error"));
        assert!(msg.contains("json error"));
    }

    #[test]
    fn env_secrets_are_trimmed_and_blank_is_missing() {
        let env = EnvConfig::from_vars([
            ("SGDB_API_KEY", "  abc \n"),
            ("TGDB_API_KEY", "   "),
            (ENV_OUTPUT_DIR, "/tmp/out"),
        ]);
        assert_eq!(env.secret("SGDB_API_KEY").as_deref(), Some("abc"));
        assert_eq!(env.secret("TGDB_API_KEY"), None);
        assert_eq!(env.secret("NOPE"), None);
        assert_eq!(env.output_dir, Some(PathBuf::from("/tmp/out")));
        assert!(env.config_path.is_none());
    }
}
