//! # iiSU Core
//!
//! Artwork scraping and icon compositing for the iiSU launcher.
//!
//! ## Overview
//!
//! - **Titles**: cleaning ROM-style names, fuzzy matching against a title
//!   database and scoring API search results
//! - **Providers**: SteamGridDB, Libretro thumbnails, IGDB, TheGamesDB and
//!   the Steam store behind one async trait
//! - **Compose**: crop, auto-center and blend artwork under a platform border
//! - **Dataset**: per-platform title lists from a zipped JSON database, with a
//!   Wikipedia fallback
//! - **Scan**: ROM folder discovery and region detection
//! - **Job**: planning and running bulk or interactive icon jobs
//! - **Device** and **Assets**: pushing output over `adb` and inventorying it
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use iisu_core::http::{HttpFetcher, HttpSettings};
//! use iisu_core::job::{JobRequest, JobRunner, JobSettings};
//! use iisu_core::providers::ProviderSet;
//! use iisu_model::PlatformKey;
//!
//! # async fn run() -> iisu_core::Result<()> {
//! let settings = JobSettings::new(Path::new("."));
//! let http = HttpFetcher::new(HttpSettings::default())?;
//! let runner = JobRunner::new(settings, ProviderSet::new(), http);
//! let summary = runner
//!     .run(JobRequest::new(vec![PlatformKey::new("NES")]), None)
//!     .await?;
//! println!("{}", summary.message);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Inventory of generated output folders
pub mod assets;
/// Content-addressed download cache
pub mod cache;
/// Cropping, centering, logo detection and border compositing
pub mod compose;
/// Per-platform title databases
pub mod dataset;
/// `adb` push of generated output
pub mod device;
/// Crate error type
pub mod error;
/// Shared HTTP client with bounded concurrency and retries
pub mod http;
/// Planning and running icon jobs
pub mod job;
/// HTML entity decoding and tag stripping
pub mod markup;
/// Artwork provider implementations
pub mod providers;
/// ROM library and iiSU folder scanning
pub mod scan;
/// Title cleaning, fuzzy matching and candidate scoring
pub mod titles;

pub use error::{ArtError, Result};
