use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use image::DynamicImage;
use iisu_model::{ArtworkKind, ArtworkOption, ExportFormat, ReviewKind, ReviewRecord, Selection, SourceTag};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::events::EventSink;
use super::fallback::find_fallback_icon;
use super::plan::PlannedTask;
use super::review::write_review;
use super::{ArtworkSelector, JobRequest, JobSettings};
use crate::compose::{ComposedIcon, compose_icon_blocking, save_image_async, save_image_for_export};
use crate::error::{ArtError, Result};
use crate::providers::{ArtworkProvider, ArtworkRequest, ProviderSet};

/// How a single work item ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Done,
    /// Passed over by the selector; finished but not generated.
    Skipped,
    /// The selector stopped the whole run on this item.
    Stopped,
    Failed,
    Cancelled,
}

/// Every icon option from `providers`, queried concurrently. A provider that
/// errors or exceeds `timeout` contributes nothing.
pub async fn collect_icon_options(
    providers: &[Arc<dyn ArtworkProvider>],
    req: &ArtworkRequest,
    per_provider: usize,
    timeout: Duration,
) -> Vec<ArtworkOption> {
    let calls = providers.iter().map(|provider| async move {
        let id = provider.id();
        match tokio::time::timeout(timeout, provider.fetch_icon_options(req, per_provider)).await {
            Ok(Ok(options)) => {
                debug!("[job] {} offered {} options for {}", id, options.len(), req.title);
                options
            }
            Ok(Err(err)) => {
                warn!("[job] {} failed for {}: {}", id, req.title, err);
                Vec::new()
            }
            Err(_) => {
                warn!("[job] {} timed out for {}", id, req.title);
                Vec::new()
            }
        }
    });
    join_all(calls).await.into_iter().flatten().collect()
}

/// Decode `bytes` and export them as-is (no border).
async fn save_asset(bytes: Arc<[u8]>, path: PathBuf, format: ExportFormat, quality: u8) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&bytes)?;
        save_image_for_export(&img, &path, format, quality).map(|()| path)
    })
    .await?
}

/// Shared state for the items of one job.
pub(crate) struct JobContext {
    pub settings: JobSettings,
    pub request: JobRequest,
    pub providers: ProviderSet,
    pub events: EventSink,
    pub cancel: CancellationToken,
}

impl JobContext {
    pub fn artwork_request(&self, task: &PlannedTask) -> ArtworkRequest {
        let hints = self
            .settings
            .platform_hints
            .get(&task.platform)
            .cloned()
            .unwrap_or_default();
        ArtworkRequest::new(task.platform.clone(), task.title.clone()).with_hints(hints)
    }

    fn provider_order(&self) -> Vec<String> {
        self.providers
            .icon_order()
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    fn asset_path(&self, task: &PlannedTask, kind: ArtworkKind, index: usize) -> PathBuf {
        let ext = self.settings.compose.format.extension();
        task.game_dir().join(format!("{}.{ext}", kind.file_stem(index)))
    }

    async fn review(&self, task: &PlannedTask, kind: ReviewKind, record: ReviewRecord) {
        if let Err(err) = write_review(&task.review_dir, &task.slug, kind, &record).await {
            self.events
                .error(format!("Could not write {kind} review for {}: {err}", task.title))
                .await;
        }
    }

    async fn fallback_icon(&self, task: &PlannedTask) -> Option<(Arc<[u8]>, SourceTag)> {
        let paths = &self.settings.paths;
        let dirs: [&Path; 2] = [&paths.fallback_icons_dir, &paths.platform_icons_dir];
        let (path, bytes) = find_fallback_icon(&dirs, &task.platform).await?;
        self.events
            .info(format!("{}: {} - using fallback icon {}", task.platform, task.title, path.display()))
            .await;
        Some((bytes.into(), SourceTag::new(SourceTag::FALLBACK_PLATFORM_ICON)))
    }

    /// Icon providers in order until one yields; errors move on to the next.
    async fn first_icon(&self, req: &ArtworkRequest) -> Result<Option<ArtworkOption>> {
        for provider in &self.providers.icon {
            if self.cancel.is_cancelled() {
                return Err(ArtError::Cancelled(req.title.clone()));
            }
            let id = provider.id();
            match provider.fetch_icon(req).await {
                Ok(Some(option)) => {
                    self.events
                        .info(format!("{}: {} - found in {id}", req.platform, req.title))
                        .await;
                    return Ok(Some(option));
                }
                Ok(None) => debug!("[job] {}: {} - not found in {}", req.platform, req.title, id),
                Err(err) => {
                    self.events
                        .warn(format!("{}: {} - {id} failed: {err}", req.platform, req.title))
                        .await
                }
            }
        }
        Ok(None)
    }

    /// Run one item. `interactive` carries the options already gathered for
    /// this title and the selector that picks among them.
    pub async fn process(
        &self,
        task: &PlannedTask,
        interactive: Option<(Vec<ArtworkOption>, &dyn ArtworkSelector)>,
    ) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        let req = self.artwork_request(task);
        let (platform, title) = (&task.platform, &task.title);

        let found = if self.settings.fallback.skip_scraping {
            match self.fallback_icon(task).await {
                Some(art) => Some(art),
                None => {
                    self.events
                        .error(format!("{platform}: {title} - no fallback icon for platform"))
                        .await;
                    let record = ReviewRecord::new(title, platform.as_str())
                        .with_error("no fallback icon found for platform");
                    self.review(task, ReviewKind::NoFallback, record).await;
                    return Outcome::Failed;
                }
            }
        } else {
            if self.providers.is_empty() {
                self.events
                    .error(format!("{platform}: {title} - no providers configured"))
                    .await;
                let record = ReviewRecord::new(title, platform.as_str())
                    .with_error("no providers configured");
                self.review(task, ReviewKind::NoProviders, record).await;
                return Outcome::Failed;
            }
            match interactive {
                Some((options, _)) if options.is_empty() => None,
                Some((options, selector)) => {
                    match selector.select(title, platform, &options).await {
                        Selection::CancelAll => {
                            self.events.info("Interactive run stopped by user").await;
                            self.cancel.cancel();
                            return Outcome::Stopped;
                        }
                        Selection::Skip => {
                            self.events.info(format!("{platform}: {title} - skipped")).await;
                            return Outcome::Skipped;
                        }
                        Selection::Chosen(index) => match options.get(index) {
                            Some(option) => Some((Arc::clone(&option.bytes), option.source.clone())),
                            None => {
                                self.events
                                    .error(format!("{platform}: {title} - invalid selection {index}"))
                                    .await;
                                return Outcome::Failed;
                            }
                        },
                    }
                }
                None => match self.first_icon(&req).await {
                    Ok(option) => option.map(|o| (o.bytes, o.source)),
                    Err(_) => return Outcome::Cancelled,
                },
            }
        };

        let (bytes, source) = match found {
            Some(art) => art,
            None if self.settings.fallback.use_platform_icon => match self.fallback_icon(task).await {
                Some(art) => art,
                None => {
                    self.events
                        .error(format!("{platform}: {title} - no artwork and no fallback icon"))
                        .await;
                    let record = ReviewRecord::new(title, platform.as_str())
                        .with_provider_order(self.provider_order())
                        .with_error("no art found and no fallback icon");
                    self.review(task, ReviewKind::NoArt, record).await;
                    return Outcome::Failed;
                }
            },
            None => {
                self.events
                    .error(format!("{platform}: {title} - no artwork from any provider"))
                    .await;
                let record = ReviewRecord::new(title, platform.as_str())
                    .with_provider_order(self.provider_order())
                    .with_error("no art found from any provider");
                self.review(task, ReviewKind::NoArt, record).await;
                return Outcome::Failed;
            }
        };

        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        match self.compose_and_save(task, &req, bytes, &source).await {
            Ok(()) => Outcome::Done,
            Err(err) => {
                self.events
                    .error(format!("{platform}: {title} - compose error: {err}"))
                    .await;
                let record = ReviewRecord::new(title, platform.as_str())
                    .with_source(source.as_str())
                    .with_error(err.to_string());
                self.review(task, ReviewKind::ComposeError, record).await;
                Outcome::Failed
            }
        }
    }

    async fn compose_and_save(
        &self,
        task: &PlannedTask,
        req: &ArtworkRequest,
        bytes: Arc<[u8]>,
        source: &SourceTag,
    ) -> Result<()> {
        let compose = &self.settings.compose;
        let composed =
            compose_icon_blocking(bytes, source.clone(), Arc::clone(&task.border), compose.clone())
                .await?;
        self.check_alignment(task, source, &composed).await;

        let icon = DynamicImage::ImageRgba8(composed.image);
        save_image_async(icon.clone(), task.out_path.clone(), compose.format, compose.jpeg_quality)
            .await?;

        self.save_title(task, req, &icon).await;
        if self.request.download_heroes {
            self.save_heroes(task, req).await;
        }
        if self.request.download_screenshots {
            self.save_screenshots(task, req).await;
        }

        self.events.preview(task.out_path.clone()).await;
        self.events
            .info(format!(
                "{}: {} ({source}) -> {}/",
                task.platform,
                task.title,
                task.slug
            ))
            .await;
        Ok(())
    }

    async fn check_alignment(&self, task: &PlannedTask, source: &SourceTag, composed: &ComposedIcon) {
        let tolerance = self.settings.compose.auto_center.options.tolerance;
        let Some(centroid) = composed.centroid.filter(|_| composed.is_off_center(tolerance)) else {
            return;
        };
        let (dx, dy) = ((centroid.x - 0.5).abs(), (centroid.y - 0.5).abs());
        let mut record = ReviewRecord::new(&task.title, task.platform.as_str()).with_source(source.as_str());
        record.centering = Some(composed.centering);
        record.content_centroid = Some((centroid.x, centroid.y));
        record.deviation = Some((dx, dy));
        record.count = Some(centroid.count);
        self.review(task, ReviewKind::OffCenter, record).await;
        self.events
            .warn(format!(
                "Off-center: {}: {} centroid=({:.3},{:.3})",
                task.platform, task.title, centroid.x, centroid.y
            ))
            .await;
    }

    /// Logo as `title.{ext}`, or the composed icon when logos are off or
    /// the fallback is allowed.
    async fn save_title(&self, task: &PlannedTask, req: &ArtworkRequest, icon: &DynamicImage) {
        let compose = &self.settings.compose;
        let path = self.asset_path(task, ArtworkKind::Title, 0);
        let mut saved = false;

        if self.request.scrape_logos
            && let Some(provider) = &self.providers.logo_hero
        {
            match provider.fetch_logo(req).await {
                Ok(Some(logo)) => {
                    match save_asset(logo.bytes, path.clone(), compose.format, compose.jpeg_quality).await {
                        Ok(_) => saved = true,
                        Err(err) => self.events.warn(format!("Failed to save logo for {}: {err}", task.title)).await,
                    }
                }
                Ok(None) => {}
                Err(err) => self.events.warn(format!("Logo lookup failed for {}: {err}", task.title)).await,
            }
        }

        if !saved && (self.request.logo_fallback_to_boxart || !self.request.scrape_logos) {
            if let Err(err) =
                save_image_async(icon.clone(), path, compose.format, compose.jpeg_quality).await
            {
                self.events.warn(format!("Failed to save title for {}: {err}", task.title)).await;
            } else if self.request.scrape_logos {
                debug!("[job] no logo for {}, used icon as title", task.title);
            }
        }
    }

    async fn save_options(&self, task: &PlannedTask, kind: ArtworkKind, options: Vec<ArtworkOption>) {
        let compose = &self.settings.compose;
        for (index, option) in options.into_iter().enumerate() {
            let path = self.asset_path(task, kind, index);
            match save_asset(option.bytes, path, compose.format, compose.jpeg_quality).await {
                Ok(path) => debug!("[job] saved {}", path.display()),
                Err(err) => {
                    self.events
                        .warn(format!("Failed to save {} for {}: {err}", kind.file_stem(index), task.title))
                        .await
                }
            }
        }
    }

    async fn save_heroes(&self, task: &PlannedTask, req: &ArtworkRequest) {
        let Some(provider) = &self.providers.logo_hero else {
            return;
        };
        match provider.fetch_heroes(req, self.request.hero_count).await {
            Ok(heroes) => self.save_options(task, ArtworkKind::Hero, heroes).await,
            Err(err) => self.events.warn(format!("Hero lookup failed for {}: {err}", task.title)).await,
        }
    }

    /// First screenshot provider with anything wins.
    async fn save_screenshots(&self, task: &PlannedTask, req: &ArtworkRequest) {
        for provider in &self.providers.screenshots {
            if self.cancel.is_cancelled() {
                return;
            }
            match provider.fetch_screenshots(req, self.request.screenshot_count).await {
                Ok(shots) if !shots.is_empty() => {
                    self.save_options(task, ArtworkKind::Slide, shots).await;
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    self.events
                        .warn(format!("{} screenshots failed for {}: {err}", provider.id(), task.title))
                        .await
                }
            }
        }
    }
}
