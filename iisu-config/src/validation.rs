use thiserror::Error;

use crate::models::Config;

pub const OUTPUT_SIZE_RANGE: std::ops::RangeInclusive<u32> = 64..=4096;
pub const JPEG_QUALITY_RANGE: std::ops::RangeInclusive<i64> = 1..=100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("no artwork provider is enabled")]
    NoEnabledProvider,
    #[error("missing {provider} credential: set {env_var}")]
    MissingCredential {
        provider: &'static str,
        env_var: String,
    },
    #[error("output_size {value} is outside 64..=4096")]
    OutputSizeOutOfRange { value: u32 },
    #[error("jpeg_quality {value} is outside 1..=100")]
    JpegQualityOutOfRange { value: i64 },
    #[error("workers must be at least 1 (got {value})")]
    InvalidWorkers { value: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub(crate) fn jpeg_quality(raw: i64) -> Result<u8, ConfigGuardRailError> {
    if JPEG_QUALITY_RANGE.contains(&raw) {
        // 1..=100 always fits.
        Ok(raw as u8)
    } else {
        Err(ConfigGuardRailError::JpegQualityOutOfRange { value: raw })
    }
}

pub(crate) fn workers(raw: i64) -> Result<usize, ConfigGuardRailError> {
    usize::try_from(raw)
        .ok()
        .filter(|w| *w >= 1)
        .ok_or(ConfigGuardRailError::InvalidWorkers { value: raw })
}

/// Hard limits plus advisory warnings. Credential checks are skipped when
/// `require_credentials` is false or scraping is turned off entirely.
pub fn apply_guard_rails(
    config: &Config,
    require_credentials: bool,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    let out_size = config.compose.out_size;
    if !OUTPUT_SIZE_RANGE.contains(&out_size) {
        return Err(ConfigGuardRailError::OutputSizeOutOfRange { value: out_size });
    }
    jpeg_quality(i64::from(config.compose.jpeg_quality))?;
    if config.workers == 0 {
        return Err(ConfigGuardRailError::InvalidWorkers { value: 0 });
    }

    let skip_scraping = config.fallback.skip_scraping;
    if !skip_scraping && config.enabled_providers().next().is_none() {
        return Err(ConfigGuardRailError::NoEnabledProvider);
    }

    if require_credentials && !skip_scraping {
        if let Some(missing) = config.credential_checks().into_iter().find(|c| !c.present) {
            return Err(ConfigGuardRailError::MissingCredential {
                provider: missing.provider,
                env_var: missing.env_var,
            });
        }
    } else {
        for check in config.credential_checks().into_iter().filter(|c| !c.present) {
            warnings.push_with_hint(
                format!("{} is enabled but {} is not set", check.provider, check.env_var),
                format!("Export {} or disable {} under art_sources", check.env_var, check.provider),
            );
        }
    }

    if !config.paths.borders_dir.is_dir() {
        warnings.push_with_hint(
            format!(
                "borders directory {} does not exist",
                config.paths.borders_dir.display()
            ),
            "Icons are only generated for platforms with a border image",
        );
    }

    let wants_fallback = config.fallback.skip_scraping || config.fallback.use_platform_icon;
    let icon_dirs = [&config.paths.fallback_icons_dir, &config.paths.platform_icons_dir];
    if wants_fallback && !icon_dirs.iter().any(|d| d.is_dir()) {
        warnings.push(format!(
            "no platform icon directory found ({} or {}); titles without art will go to review",
            config.paths.fallback_icons_dir.display(),
            config.paths.platform_icons_dir.display()
        ));
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_bounds() {
        assert_eq!(jpeg_quality(1), Ok(1));
        assert_eq!(jpeg_quality(100), Ok(100));
        assert_eq!(
            jpeg_quality(0),
            Err(ConfigGuardRailError::JpegQualityOutOfRange { value: 0 })
        );
        assert!(jpeg_quality(101).is_err());
    }

    #[test]
    fn worker_bounds() {
        assert_eq!(workers(4), Ok(4));
        assert_eq!(
            workers(0),
            Err(ConfigGuardRailError::InvalidWorkers { value: 0 })
        );
        assert!(workers(-2).is_err());
    }
}
