//! Configuration for the iiSU artwork tools.
//!
//! A single `iisu.toml` (or `iisu.json`) describes paths, platforms, the
//! provider order and compositing knobs. API keys stay in the environment;
//! the file only names the variables. [`ConfigLoader`] resolves the file,
//! fills defaults, and rejects values the job runner cannot work with.
#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod providers;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions, migrate_legacy_mode};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    Config, ConfigMetadata, CredentialVars, InteractiveConfig, ProviderConfigs, ProviderEntry,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
