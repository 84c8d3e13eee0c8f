//! End-to-end job runs against a fake provider and a temp output tree.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use iisu_core::ArtError;
use iisu_core::http::{HttpFetcher, HttpSettings};
use iisu_core::job::{
    ArtworkSelector, CredentialCheck, EventSink, JobRequest, JobRunner, JobSettings,
    PlatformSettings,
};
use iisu_core::providers::{ArtworkProvider, ArtworkRequest, ProviderError, ProviderSet};
use iisu_model::{
    ArtworkKind, ArtworkOption, JobEvent, PlatformKey, ProviderId, ReviewRecord, Selection,
    SourceTag,
};
use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use tokio::sync::mpsc;

fn png(color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(32, 32, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

/// Known titles get a solid square; everything else is a miss.
struct FakeProvider {
    known: Vec<&'static str>,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn new(known: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            known: known.to_vec(),
            calls: AtomicUsize::new(0),
        })
    }

    fn option(&self, color: [u8; 4]) -> ArtworkOption {
        ArtworkOption::new(
            ProviderId::Libretro,
            SourceTag::new(SourceTag::LIBRETRO_BOXART),
            ArtworkKind::Icon,
            png(color),
        )
    }
}

#[async_trait]
impl ArtworkProvider for FakeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Libretro
    }

    async fn fetch_icon(
        &self,
        req: &ArtworkRequest,
    ) -> Result<Option<ArtworkOption>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .known
            .contains(&req.title.as_str())
            .then(|| self.option([200, 30, 30, 255])))
    }

    async fn fetch_icon_options(
        &self,
        req: &ArtworkRequest,
        _max: usize,
    ) -> Result<Vec<ArtworkOption>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.known.contains(&req.title.as_str()) {
            return Ok(Vec::new());
        }
        Ok(vec![
            self.option([200, 30, 30, 255]),
            self.option([30, 30, 200, 255]),
        ])
    }
}

struct FixedSelector(Selection);

#[async_trait]
impl ArtworkSelector for FixedSelector {
    async fn select(
        &self,
        _title: &str,
        _platform: &PlatformKey,
        options: &[ArtworkOption],
    ) -> Selection {
        assert!(!options.is_empty(), "selector called without options");
        self.0
    }
}

fn write_border(path: &Path) {
    let mut border = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 0]));
    for (x, y, px) in border.enumerate_pixels_mut() {
        if x < 4 || y < 4 || x >= 60 || y >= 60 {
            *px = Rgba([255, 255, 255, 255]);
        }
    }
    std::fs::create_dir_all(path.parent().expect("border parent")).expect("mkdir borders");
    border.save(path).expect("write border");
}

fn settings(root: &Path) -> JobSettings {
    let mut settings = JobSettings::new(root);
    settings.dataset.enabled = false;
    settings.compose.out_size = 64;
    settings.compose.auto_center.enabled = false;
    settings.platforms.insert(
        PlatformKey::new("NES"),
        PlatformSettings {
            border_file: Some("nes.png".into()),
            wikipedia_url: None,
        },
    );
    write_border(&settings.paths.borders_dir.join("nes.png"));
    settings
}

fn runner(settings: JobSettings, provider: Arc<FakeProvider>) -> JobRunner {
    let http = HttpFetcher::new(HttpSettings::default()).expect("http client");
    JobRunner::new(settings, ProviderSet::new().with_icon(provider), http)
}

fn request(title: &str) -> JobRequest {
    JobRequest {
        search_term: Some(title.to_string()),
        ..JobRequest::new(vec![PlatformKey::new("NES")])
    }
}

fn game_dir(root: &TempDir, slug: &str) -> std::path::PathBuf {
    root.path().join("output").join("nes").join(slug)
}

#[tokio::test]
async fn automatic_run_writes_icon_and_title() {
    let root = TempDir::new().expect("tempdir");
    let provider = FakeProvider::new(&["Metroid"]);
    let (tx, mut rx) = mpsc::channel(256);
    let runner = runner(settings(root.path()), Arc::clone(&provider))
        .with_events(EventSink::new(tx));

    let summary = runner.run(request("Metroid"), None).await.expect("run");

    assert_eq!((summary.done, summary.total, summary.errors), (1, 1, 0));
    assert!(!summary.cancelled);
    assert_eq!(summary.message, "Finished. Completed 1/1 (errors=0).");

    let dir = game_dir(&root, "Metroid");
    let icon = image::open(dir.join("icon.jpg")).expect("icon written");
    assert_eq!((icon.width(), icon.height()), (64, 64));
    assert!(dir.join("title.jpg").is_file());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    drop(runner);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(events.contains(&JobEvent::Progress { done: 1, total: 1 }));
    assert!(events.contains(&JobEvent::Preview {
        path: dir.join("icon.jpg")
    }));
}

#[tokio::test]
async fn existing_icons_are_not_regenerated() {
    let root = TempDir::new().expect("tempdir");
    let provider = FakeProvider::new(&["Metroid"]);
    let runner = runner(settings(root.path()), Arc::clone(&provider));

    runner.run(request("Metroid"), None).await.expect("first run");
    let again = runner.run(request("Metroid"), None).await.expect("second run");
    assert_eq!(again.total, 0);
    assert!(again.message.starts_with("Nothing to do"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    let overwrite = JobRequest {
        overwrite: true,
        ..request("Metroid")
    };
    let summary = runner.run(overwrite, None).await.expect("overwrite run");
    assert_eq!(summary.done, 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn explicit_titles_bypass_lookup_and_rescrape() {
    let root = TempDir::new().expect("tempdir");
    let provider = FakeProvider::new(&["Metroid", "Kid Icarus"]);
    let runner = runner(settings(root.path()), Arc::clone(&provider));
    runner.run(request("Metroid"), None).await.expect("first run");

    let mut titles = std::collections::BTreeMap::new();
    titles.insert(
        PlatformKey::new("NES"),
        vec!["Metroid".to_string(), "Kid Icarus".to_string()],
    );
    let rescrape = JobRequest {
        titles,
        overwrite: true,
        ..JobRequest::new(vec![PlatformKey::new("NES")])
    };
    let summary = runner.run(rescrape, None).await.expect("rescrape run");
    assert_eq!((summary.done, summary.total, summary.errors), (2, 2, 0));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    assert!(game_dir(&root, "Kid_Icarus").join("icon.jpg").is_file());
}

#[tokio::test]
async fn missing_art_writes_no_art_review() {
    let root = TempDir::new().expect("tempdir");
    let runner = runner(settings(root.path()), FakeProvider::new(&[]));

    let summary = runner.run(request("Unknown Game"), None).await.expect("run");
    assert_eq!((summary.done, summary.errors), (1, 1));

    let review = root
        .path()
        .join("review")
        .join("nes")
        .join("Unknown_Game__no_art.json");
    let record: ReviewRecord =
        serde_json::from_slice(&std::fs::read(&review).expect("review file")).expect("json");
    assert_eq!(record.title, "Unknown Game");
    assert_eq!(record.provider_order, Some(vec!["libretro".to_string()]));
    assert!(!game_dir(&root, "Unknown_Game").join("icon.jpg").exists());
}

#[tokio::test]
async fn fallback_icon_covers_missing_art() {
    let root = TempDir::new().expect("tempdir");
    let mut settings = settings(root.path());
    settings.fallback.use_platform_icon = true;
    std::fs::create_dir_all(&settings.paths.platform_icons_dir).expect("mkdir icons");
    std::fs::write(settings.paths.platform_icons_dir.join("NES.png"), png([0, 150, 0, 255]))
        .expect("write fallback");

    let runner = runner(settings, FakeProvider::new(&[]));
    let summary = runner.run(request("Unknown Game"), None).await.expect("run");
    assert_eq!(summary.errors, 0);
    assert!(game_dir(&root, "Unknown_Game").join("icon.jpg").is_file());
}

#[tokio::test]
async fn missing_border_skips_platform() {
    let root = TempDir::new().expect("tempdir");
    let mut settings = settings(root.path());
    settings.platforms.clear();

    let runner = runner(settings, FakeProvider::new(&["Metroid"]));
    let summary = runner.run(request("Metroid"), None).await.expect("run");
    assert_eq!(summary.total, 0);
}

#[tokio::test]
async fn missing_credentials_fail_before_any_work() {
    let root = TempDir::new().expect("tempdir");
    let mut settings = settings(root.path());
    settings.credentials.push(CredentialCheck {
        provider: "steamgriddb",
        env_var: "SGDB_API_KEY".to_string(),
        present: false,
    });
    let provider = FakeProvider::new(&["Metroid"]);
    let runner = runner(settings, Arc::clone(&provider));

    let err = runner.run(request("Metroid"), None).await.unwrap_err();
    assert!(matches!(
        err,
        ArtError::MissingCredentials { ref env_var, .. } if env_var == "SGDB_API_KEY"
    ));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn interactive_run_needs_a_selector() {
    let root = TempDir::new().expect("tempdir");
    let runner = runner(settings(root.path()), FakeProvider::new(&["Metroid"]));
    let req = JobRequest {
        interactive: true,
        ..request("Metroid")
    };
    assert!(matches!(
        runner.run(req, None).await,
        Err(ArtError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn interactive_choice_and_skip() {
    let root = TempDir::new().expect("tempdir");
    let runner = runner(settings(root.path()), FakeProvider::new(&["Metroid"]));
    let interactive = || JobRequest {
        interactive: true,
        ..request("Metroid")
    };

    let skip: Arc<dyn ArtworkSelector> = Arc::new(FixedSelector(Selection::Skip));
    let summary = runner.run(interactive(), Some(skip)).await.expect("skip run");
    assert_eq!((summary.done, summary.errors), (1, 1));
    assert_eq!(summary.message, "Finished. Completed 1/1 (errors=1).");
    assert!(!game_dir(&root, "Metroid").join("icon.jpg").exists());

    let pick: Arc<dyn ArtworkSelector> = Arc::new(FixedSelector(Selection::Chosen(1)));
    let summary = runner.run(interactive(), Some(pick)).await.expect("pick run");
    assert_eq!((summary.done, summary.errors), (1, 0));
    let icon = image::open(game_dir(&root, "Metroid").join("icon.jpg"))
        .expect("icon written")
        .to_rgb8();
    let center = icon.get_pixel(32, 32);
    assert!(center[2] > center[0], "second option (blue) should be used: {center:?}");

    let out_of_range: Arc<dyn ArtworkSelector> = Arc::new(FixedSelector(Selection::Chosen(7)));
    let req = JobRequest {
        overwrite: true,
        ..interactive()
    };
    let summary = runner.run(req, Some(out_of_range)).await.expect("bad pick run");
    assert_eq!(summary.errors, 1);
}

#[tokio::test]
async fn cancel_all_stops_the_run() {
    let root = TempDir::new().expect("tempdir");
    let runner = runner(settings(root.path()), FakeProvider::new(&["Metroid"]));
    let req = JobRequest {
        interactive: true,
        ..request("Metroid")
    };
    let stop: Arc<dyn ArtworkSelector> = Arc::new(FixedSelector(Selection::CancelAll));

    let summary = runner.run(req, Some(stop)).await.expect("run");
    assert!(summary.cancelled);
    assert!(summary.message.starts_with("Cancelled."));
    assert_eq!((summary.done, summary.errors), (1, 1));

    // Stopping one interactive run leaves the runner usable.
    let summary = runner.run(request("Metroid"), None).await.expect("next run");
    assert!(!summary.cancelled);
    assert_eq!(summary.done, 1);
}

#[tokio::test]
async fn cancelled_token_runs_nothing() {
    let root = TempDir::new().expect("tempdir");
    let provider = FakeProvider::new(&["Metroid"]);
    let runner = runner(settings(root.path()), Arc::clone(&provider));
    runner.cancel_token().cancel();

    let summary = runner.run(request("Metroid"), None).await.expect("run");
    assert!(summary.cancelled);
    assert_eq!(summary.done, 0);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}
