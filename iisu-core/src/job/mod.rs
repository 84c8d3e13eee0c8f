//! Job orchestration: plan the icon tasks for a set of platforms, run them
//! through the providers and the compositor, and report progress.
//!
//! Automatic runs fan out over a bounded worker pool. Interactive runs walk
//! the queue one title at a time, prefetching the next title's options
//! while an [`ArtworkSelector`] decides on the current one.

/// Progress and log events sent to the caller
pub mod events;
/// Platform icon fallback lookup
pub mod fallback;
/// Task planning and title filters
pub mod plan;
/// Review folders for titles without art
pub mod review;
mod work;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use iisu_model::{ArtworkOption, JobSummary, PlatformKey, Selection};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::compose::ComposeSettings;
use crate::dataset::{
    DEFAULT_GAMESDB_SUBDIR, DEFAULT_REPO_ZIP_URL, DatasetStore, PlatformTitles,
    load_platform_titles,
};
use crate::device::Adb;
use crate::error::{ArtError, Result};
use crate::http::HttpFetcher;
use crate::providers::ProviderSet;

pub use events::EventSink;
pub use fallback::{fallback_name_variants, find_fallback_icon};
pub use plan::{
    LetterFilter, PlannedTask, SEARCH_ACCEPT_SCORE, SEARCH_MATCH_THRESHOLD,
    SearchResolution, filter_titles, resolve_border, resolve_search,
};
pub use review::write_review;
pub use work::collect_icon_options;

use work::{JobContext, Outcome};

/// Directories a job reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    /// Where finished icons and artwork go.
    pub output_dir: PathBuf,
    /// Where no-art review folders go.
    pub review_dir: PathBuf,
    /// Where relative border files resolve.
    pub borders_dir: PathBuf,
    /// Per-title fallback icons.
    pub fallback_icons_dir: PathBuf,
    /// Per-platform icons for the platform fallback.
    pub platform_icons_dir: PathBuf,
}

impl JobPaths {
    /// The default layout below `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            output_dir: root.join("output"),
            review_dir: root.join("review"),
            borders_dir: root.join("borders"),
            fallback_icons_dir: root.join("fallback_icons"),
            platform_icons_dir: root.join("platform_icons"),
        }
    }
}

/// Per-platform border and title source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSettings {
    /// Absolute, or relative to [`JobPaths::borders_dir`].
    pub border_file: Option<PathBuf>,
    /// "List of games" page used when the title database has no entry.
    pub wikipedia_url: Option<String>,
}

/// What to do when no provider has art.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallbackSettings {
    /// Use the platform icon when no provider has art.
    pub use_platform_icon: bool,
    /// Never query providers; every title gets the platform icon.
    pub skip_scraping: bool,
}

/// Where platform title lists come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSettings {
    /// Load titles from the games database at all.
    pub enabled: bool,
    /// Zip archive of the games database repository.
    pub repo_zip_url: String,
    /// Folder inside the archive holding the per-platform JSON files.
    pub gamesdb_subdir: String,
    /// Zero means unlimited.
    pub per_platform_limit: usize,
    /// Where the downloaded archive is kept.
    pub cache_dir: PathBuf,
}

impl DatasetSettings {
    /// Defaults with the cache below `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            enabled: true,
            repo_zip_url: DEFAULT_REPO_ZIP_URL.to_string(),
            gamesdb_subdir: DEFAULT_GAMESDB_SUBDIR.to_string(),
            per_platform_limit: 0,
            cache_dir: root.join(".cache").join("dataset"),
        }
    }
}

/// Whether an enabled provider found the secret it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialCheck {
    /// Provider display name.
    pub provider: &'static str,
    /// Environment variable checked.
    pub env_var: String,
    /// Whether the variable held a value.
    pub present: bool,
}

/// Everything a job needs that comes from configuration.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Directory layout.
    pub paths: JobPaths,
    /// Per-platform border and title source.
    pub platforms: BTreeMap<PlatformKey, PlatformSettings>,
    /// Extra folder names per platform.
    pub platform_aliases: BTreeMap<PlatformKey, Vec<String>>,
    /// Extra title-list names per platform.
    pub platform_hints: BTreeMap<PlatformKey, Vec<String>>,
    /// Compositing settings.
    pub compose: ComposeSettings,
    /// No-art fallback behaviour.
    pub fallback: FallbackSettings,
    /// Title database source.
    pub dataset: DatasetSettings,
    /// Results of the credential checks for enabled providers.
    pub credentials: Vec<CredentialCheck>,
    /// Icon options offered per provider in interactive runs.
    pub interactive_options_per_provider: usize,
    /// How long interactive prefetching waits for a provider.
    pub interactive_timeout: Duration,
}

impl JobSettings {
    /// Defaults with every directory below `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            paths: JobPaths::under(root),
            platforms: BTreeMap::new(),
            platform_aliases: BTreeMap::new(),
            platform_hints: BTreeMap::new(),
            compose: ComposeSettings::default(),
            fallback: FallbackSettings::default(),
            dataset: DatasetSettings::under(root),
            credentials: Vec::new(),
            interactive_options_per_provider: 5,
            interactive_timeout: Duration::from_secs(30),
        }
    }

    /// The first enabled provider without its key.
    pub fn missing_credential(&self) -> Option<&CredentialCheck> {
        self.credentials.iter().find(|c| !c.present)
    }
}

/// Border overrides chosen for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomBorders {
    /// Border used for every platform.
    pub global: Option<PathBuf>,
    /// Border per platform, ahead of [`Self::global`].
    pub per_platform: BTreeMap<PlatformKey, PathBuf>,
}

/// What to generate in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    /// Platforms to process, in order.
    pub platforms: Vec<PlatformKey>,
    /// Parallel workers for automatic runs.
    pub workers: usize,
    /// Overrides [`DatasetSettings::per_platform_limit`].
    pub limit: Option<usize>,
    /// Only titles matching this term.
    pub search_term: Option<String>,
    /// Exact titles per platform. A platform listed here skips the title
    /// database and the search/letter filters.
    pub titles: BTreeMap<PlatformKey, Vec<String>>,
    /// First-character filter.
    pub letter_filter: LetterFilter,
    /// Let an [`ArtworkSelector`] pick each icon.
    pub interactive: bool,
    /// Fetch hero banners.
    pub download_heroes: bool,
    /// Hero banners per title.
    pub hero_count: usize,
    /// Fetch screenshots.
    pub download_screenshots: bool,
    /// Screenshots per title.
    pub screenshot_count: usize,
    /// Fetch title logos.
    pub scrape_logos: bool,
    /// Use the box art as the logo when no logo is found.
    pub logo_fallback_to_boxart: bool,
    /// Regenerate titles that already have an icon.
    pub overwrite: bool,
    /// Border overrides.
    pub custom_border: CustomBorders,
    /// Device directory to push the output to once the run ends.
    pub push_to_device: Option<String>,
}

impl Default for JobRequest {
    fn default() -> Self {
        Self {
            platforms: Vec::new(),
            workers: 4,
            limit: None,
            search_term: None,
            titles: BTreeMap::new(),
            letter_filter: LetterFilter::All,
            interactive: false,
            download_heroes: false,
            hero_count: 1,
            download_screenshots: false,
            screenshot_count: 3,
            scrape_logos: true,
            logo_fallback_to_boxart: true,
            overwrite: false,
            custom_border: CustomBorders::default(),
            push_to_device: None,
        }
    }
}

impl JobRequest {
    /// Defaults for `platforms`.
    pub fn new(platforms: Vec<PlatformKey>) -> Self {
        Self {
            platforms,
            ..Self::default()
        }
    }
}

/// Chooses one of the icon options gathered for a title.
#[async_trait]
pub trait ArtworkSelector: Send + Sync {
    /// Pick one of `options`, or answer with a non-pick [`Selection`].
    async fn select(
        &self,
        title: &str,
        platform: &PlatformKey,
        options: &[ArtworkOption],
    ) -> Selection;
}

#[derive(Debug, Default)]
struct Tally {
    done: usize,
    errors: usize,
}

impl Tally {
    /// False when the item never ran.
    fn record(&mut self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Done => self.done += 1,
            Outcome::Skipped | Outcome::Stopped | Outcome::Failed => {
                self.done += 1;
                self.errors += 1;
            }
            Outcome::Cancelled => return false,
        }
        true
    }
}

/// Runs icon jobs against a fixed configuration and provider set.
#[derive(Debug, Clone)]
pub struct JobRunner {
    settings: JobSettings,
    providers: ProviderSet,
    http: HttpFetcher,
    events: EventSink,
    cancel: CancellationToken,
}

impl JobRunner {
    /// Runner with silent events and a fresh cancellation token.
    pub fn new(settings: JobSettings, providers: ProviderSet, http: HttpFetcher) -> Self {
        Self {
            settings,
            providers,
            http,
            events: EventSink::silent(),
            cancel: CancellationToken::new(),
        }
    }

    /// Send progress and log events to `events`.
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// The configuration the runner was built with.
    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Cancelling this token stops every run started from this runner.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn check_credentials(&self) -> Result<()> {
        if self.settings.fallback.skip_scraping {
            return Ok(());
        }
        match self.settings.missing_credential() {
            Some(check) => Err(ArtError::MissingCredentials {
                provider: check.provider,
                env_var: check.env_var.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn load_dataset(&self, request: &JobRequest) -> Result<Option<PlatformTitles>> {
        let dataset = &self.settings.dataset;
        let all_explicit = !request.platforms.is_empty()
            && request.platforms.iter().all(|p| request.titles.contains_key(p));
        if !dataset.enabled || all_explicit {
            return Ok(None);
        }
        let has_search = request
            .search_term
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());

        let store = DatasetStore::new(dataset.cache_dir.clone(), self.http.clone());
        let loaded = async {
            let root = store.ensure(&dataset.repo_zip_url).await?;
            let subdir = dataset.gamesdb_subdir.clone();
            tokio::task::spawn_blocking(move || load_platform_titles(&root, &subdir)).await?
        }
        .await;

        match loaded {
            Ok(titles) => {
                self.events
                    .info(format!("Loaded dataset with {} platforms", titles.len()))
                    .await;
                Ok(Some(titles))
            }
            Err(err) if has_search => {
                self.events
                    .warn(format!("Dataset unavailable ({err}); searching without it"))
                    .await;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Plan and run one job. Interactive requests need a `selector`.
    pub async fn run(
        &self,
        request: JobRequest,
        selector: Option<Arc<dyn ArtworkSelector>>,
    ) -> Result<JobSummary> {
        self.check_credentials()?;
        let selector = match (request.interactive, selector) {
            (true, None) => {
                return Err(ArtError::InvalidInput(
                    "interactive mode needs an artwork selector".into(),
                ));
            }
            (true, selector) => selector,
            (false, _) => None,
        };

        let dataset = self.load_dataset(&request).await?;
        let tasks = plan::plan_tasks(
            &self.settings,
            &request,
            dataset.as_ref(),
            &self.http,
            &self.events,
        )
        .await?;
        if tasks.is_empty() {
            let summary = JobSummary::nothing_to_do();
            self.events.info(summary.message.clone()).await;
            return Ok(summary);
        }

        let total = tasks.len();
        self.events.info(format!("Queued {total} titles")).await;
        self.events.progress(0, total).await;

        let cancel = self.cancel.child_token();
        let push_to_device = request.push_to_device.clone();
        let workers = request.workers.max(1);
        let ctx = Arc::new(JobContext {
            settings: self.settings.clone(),
            request,
            providers: self.providers.clone(),
            events: self.events.clone(),
            cancel: cancel.clone(),
        });

        let tally = match selector {
            Some(selector) => run_interactive(&ctx, tasks, selector.as_ref()).await,
            None => run_automatic(&ctx, tasks, workers).await,
        };

        let summary = if cancel.is_cancelled() {
            JobSummary::cancelled(tally.done, total, tally.errors)
        } else {
            JobSummary::finished(tally.done, total, tally.errors)
        };
        self.events.info(summary.message.clone()).await;

        if let Some(base) = push_to_device
            && !summary.cancelled
        {
            self.push(&base).await;
        }
        Ok(summary)
    }

    async fn push(&self, base: &str) {
        let output_dir = &self.settings.paths.output_dir;
        let pushed = match Adb::locate() {
            Ok(adb) => adb.push_output(output_dir, base).await,
            Err(err) => Err(err),
        };
        match pushed {
            Ok(report) => {
                self.events
                    .info(format!(
                        "Pushed {} files to device ({} errors)",
                        report.copied, report.errors
                    ))
                    .await
            }
            Err(err) => self.events.error(format!("Device push failed: {err}")).await,
        }
    }
}

async fn run_automatic(ctx: &Arc<JobContext>, tasks: Vec<PlannedTask>, workers: usize) -> Tally {
    let total = tasks.len();
    let permits = Arc::new(Semaphore::new(workers));
    let mut set = JoinSet::new();
    for task in tasks {
        let ctx = Arc::clone(ctx);
        let permits = Arc::clone(&permits);
        set.spawn(async move {
            let _permit = tokio::select! {
                _ = ctx.cancel.cancelled() => return Outcome::Cancelled,
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Outcome::Cancelled,
                },
            };
            ctx.process(&task, None).await
        });
    }

    let mut tally = Tally::default();
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                debug!("[job] cancelled with {} items in flight", set.len());
                set.abort_all();
                while set.join_next().await.is_some() {}
                break;
            }
            next = set.join_next() => match next {
                None => break,
                Some(Ok(outcome)) => {
                    if tally.record(outcome) {
                        ctx.events.progress(tally.done, total).await;
                    }
                }
                Some(Err(err)) if err.is_cancelled() => {}
                Some(Err(err)) => {
                    warn!("[job] worker panicked: {}", err);
                    tally.record(Outcome::Failed);
                    ctx.events.progress(tally.done, total).await;
                }
            },
        }
    }
    tally
}

fn prefetch(ctx: &Arc<JobContext>, task: &PlannedTask) -> JoinHandle<Vec<ArtworkOption>> {
    let ctx = Arc::clone(ctx);
    let req = ctx.artwork_request(task);
    tokio::spawn(async move {
        collect_icon_options(
            &ctx.providers.icon,
            &req,
            ctx.settings.interactive_options_per_provider,
            ctx.settings.interactive_timeout,
        )
        .await
    })
}

async fn run_interactive(
    ctx: &Arc<JobContext>,
    tasks: Vec<PlannedTask>,
    selector: &dyn ArtworkSelector,
) -> Tally {
    let total = tasks.len();
    let scraping = !ctx.settings.fallback.skip_scraping && !ctx.providers.is_empty();
    let start = |task: Option<&PlannedTask>| task.filter(|_| scraping).map(|t| prefetch(ctx, t));

    let mut tally = Tally::default();
    let mut pending = start(tasks.first());
    for (index, task) in tasks.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let options = match pending.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Vec::new(),
        };
        pending = start(tasks.get(index + 1));

        let interactive = scraping.then_some((options, selector));
        if tally.record(ctx.process(task, interactive).await) {
            ctx.events.progress(tally.done, total).await;
        }
    }
    if let Some(handle) = pending {
        handle.abort();
    }
    tally
}
