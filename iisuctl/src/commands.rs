use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use iisu_config::{Config, ConfigLoader};
use iisu_core::assets::{GameAssets, missing, scan_output};
use iisu_core::compose::{ComposedIcon, compose_icon, load_border, save_image_for_export};
use iisu_core::dataset::{DatasetStore, load_platform_titles, resolve_platform_titles};
use iisu_core::device::Adb;
use iisu_core::http::HttpFetcher;
use iisu_core::job::{
    ArtworkSelector, CustomBorders, EventSink, JobRequest, JobRunner, LetterFilter,
    SEARCH_MATCH_THRESHOLD, SearchResolution, collect_icon_options, resolve_border, resolve_search,
};
use iisu_core::providers::ArtworkRequest;
use iisu_core::scan::{RomScanner, find_iisu_directory, scan_iisu_directory};
use iisu_core::titles::fuzzy_match_title;
use iisu_model::{ArtworkKind, JobEvent, LogLevel, PlatformKey, SourceTag};
use image::DynamicImage;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::{
    AssetsArgs, ComposeArgs, GlobalArgs, MatchArgs, PushArgs, RunArgs, ScanArgs, SearchArgs,
};
use crate::selector::TerminalSelector;

const LOCAL_SOURCE: &str = "local";

fn load_config(global: &GlobalArgs, require_credentials: bool) -> Result<Config> {
    let mut loader = ConfigLoader::new().require_credentials(require_credentials);
    if let Some(path) = &global.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &global.env_file {
        loader = loader.with_env_file(path);
    }
    let load = loader.load().context("failed to load configuration")?;
    for warning in &load.warnings.items {
        match &warning.hint {
            Some(hint) => warn!("{} ({})", warning.message, hint),
            None => warn!("{}", warning.message),
        }
    }
    Ok(load.config)
}

fn http_for(config: &Config) -> Result<HttpFetcher> {
    HttpFetcher::new(config.http.clone()).context("failed to build HTTP client")
}

async fn print_events(mut rx: mpsc::Receiver<JobEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            JobEvent::Log { level, message } => match level {
                LogLevel::Error => eprintln!("error: {message}"),
                LogLevel::Warn => eprintln!("warn: {message}"),
                _ => println!("{message}"),
            },
            JobEvent::Progress { done, total } => println!("[{done}/{total}]"),
            JobEvent::Preview { path } => println!("  -> {}", path.display()),
        }
    }
}

fn build_request(args: RunArgs, config: &Config) -> Result<JobRequest> {
    let platforms = if args.platforms.is_empty() {
        config.platform_keys()
    } else {
        args.platforms.iter().map(PlatformKey::new).collect()
    };
    let letter_filter = match args.letter.as_deref() {
        Some(raw) => raw.parse::<LetterFilter>().context("invalid --letter")?,
        None => LetterFilter::All,
    };
    if let Some(border) = &args.border
        && !border.is_file()
    {
        bail!("border {} does not exist", border.display());
    }

    Ok(JobRequest {
        platforms,
        workers: args.workers.map(usize::from).unwrap_or(config.workers),
        limit: args.limit,
        titles: BTreeMap::new(),
        search_term: args.search.filter(|s| !s.trim().is_empty()),
        letter_filter,
        interactive: args.interactive,
        download_heroes: args.heroes > 0,
        hero_count: args.heroes.max(1),
        download_screenshots: args.screenshots > 0,
        screenshot_count: args.screenshots.max(1),
        scrape_logos: !args.no_logos,
        logo_fallback_to_boxart: !args.no_title_fallback,
        overwrite: args.overwrite,
        custom_border: CustomBorders {
            global: args.border,
            ..CustomBorders::default()
        },
        push_to_device: args.push_to_device,
    })
}

pub async fn run(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    let config = load_config(global, true)?;
    let interactive = args.interactive;
    let request = build_request(args, &config)?;
    execute_job(&config, request, interactive).await
}

/// Run `request` with progress printing and Ctrl-C cancellation.
async fn execute_job(config: &Config, request: JobRequest, interactive: bool) -> Result<()> {
    let http = http_for(config)?;
    let providers = config.build_providers(&http);

    let (tx, rx) = mpsc::channel(256);
    let printer = tokio::spawn(print_events(rx));
    let runner = JobRunner::new(config.job_settings(), providers, http)
        .with_events(EventSink::new(tx));

    let cancel = runner.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after in-flight titles");
            cancel.cancel();
        }
    });

    let selector: Option<Arc<dyn ArtworkSelector>> =
        interactive.then(|| Arc::new(TerminalSelector) as Arc<dyn ArtworkSelector>);
    let result = runner.run(request, selector).await;
    drop(runner);
    if let Err(err) = printer.await {
        warn!("event printer stopped: {}", err);
    }

    let summary = result.context("job failed")?;
    println!("{}", summary.message);
    if summary.errors > 0 {
        info!("see {} for titles that need attention", config.paths.review_dir.display());
    }
    Ok(())
}

pub async fn search(global: &GlobalArgs, args: SearchArgs) -> Result<()> {
    let config = load_config(global, false)?;
    let http = http_for(&config)?;
    let providers = config.build_providers(&http);
    if providers.is_empty() {
        bail!("no usable icon providers; check art_sources and credentials");
    }

    let platform = PlatformKey::new(&args.platform);
    let hints = config
        .platform_hints
        .get(&platform)
        .cloned()
        .unwrap_or_default();
    let request = ArtworkRequest::new(platform, args.title.as_str()).with_hints(hints);
    let options = collect_icon_options(
        &providers.icon,
        &request,
        args.per_provider.max(1),
        config.interactive.timeout,
    )
    .await;

    if options.is_empty() {
        println!("no artwork found for {:?}", args.title);
        return Ok(());
    }
    for (i, option) in options.iter().enumerate() {
        let dims = option
            .dimensions
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "?".into());
        println!(
            "{:>3}  {:<12} {:<24} {:>10}  {}",
            i,
            option.provider.as_str(),
            option.source.as_str(),
            dims,
            option.url.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub async fn match_title(global: &GlobalArgs, args: MatchArgs) -> Result<()> {
    let config = load_config(global, false)?;
    let http = http_for(&config)?;
    let platform = PlatformKey::new(&args.platform);

    let store = DatasetStore::new(config.dataset.cache_dir.clone(), http.clone());
    let root = store
        .ensure(&config.dataset.repo_zip_url)
        .await
        .context("failed to fetch the title database")?;
    let subdir = config.dataset.gamesdb_subdir.clone();
    let map = tokio::task::spawn_blocking(move || load_platform_titles(&root, &subdir))
        .await?
        .context("failed to read the title database")?;

    let aliases = config
        .platform_aliases
        .get(&platform)
        .cloned()
        .unwrap_or_default();
    let wikipedia = config
        .platforms
        .get(&platform)
        .and_then(|p| p.wikipedia_url.as_deref());
    let (source, titles) = resolve_platform_titles(&map, &aliases, &platform, wikipedia, &http)
        .await
        .with_context(|| format!("no titles for {platform}"))?;
    println!("{} titles from {}", titles.len(), source);

    match resolve_search(&args.title, &titles) {
        SearchResolution::Matched { title, score } => {
            println!("accepted: {title} ({score:.2})");
        }
        SearchResolution::Raw { best_score } => match best_score {
            Some(score) => println!("no confident match (best {score:.2}); the raw title is used"),
            None => println!("no match; the raw title is used"),
        },
    }
    for (title, score) in fuzzy_match_title(&args.title, &titles, SEARCH_MATCH_THRESHOLD)
        .into_iter()
        .take(args.max)
    {
        println!("  {score:.2}  {title}");
    }
    Ok(())
}

pub fn scan(args: ScanArgs) -> Result<()> {
    if !args.root.is_dir() {
        bail!("{} is not a directory", args.root.display());
    }
    let mut root = args.root.clone();
    if scan_iisu_directory(&root).is_empty()
        && let Some(found) = find_iisu_directory(std::slice::from_ref(&root))
    {
        info!("using ROM root {}", found.display());
        root = found;
    }

    let mut scanner = RomScanner::new(&root);
    let only = args.platform.as_deref().map(PlatformKey::new);
    if let Some(query) = args.query.as_deref() {
        let hits = scanner.search(query, only.as_ref());
        for (platform, game) in &hits {
            println!("{:<16} {:<48} {}", platform.as_str(), game.title, game.region);
        }
        println!("{} of {} games match {:?}", hits.len(), scanner.total_game_count(), query);
        return Ok(());
    }

    let mut shown = 0usize;
    for platform in scanner.platforms() {
        if only.as_ref().is_some_and(|p| *p != platform) {
            continue;
        }
        let games = scanner.games(&platform);
        println!("{} ({} games)", platform.as_str(), games.len());
        for game in games {
            println!("  {:<48} {}", game.title, game.region);
        }
        shown += 1;
    }
    if shown == 0 {
        println!("no ROM folders found under {}", root.display());
    }
    Ok(())
}

pub fn platforms(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global, false)?;
    let settings = config.job_settings();
    let request = JobRequest::default();
    for platform in config.platform_keys() {
        let border = match resolve_border(&settings, &request, &platform) {
            Some(path) => path.display().to_string(),
            None => "no border".to_string(),
        };
        println!("{:<20} {:<16} {}", platform.as_str(), platform.iisu_folder(), border);
    }
    Ok(())
}

/// How far auto-centering moved the crop from the middle, when it ran and
/// moved it at all.
fn centering_shift(icon: &ComposedIcon) -> Option<(f64, f64)> {
    icon.centroid?;
    let (cx, cy) = icon.centering;
    let shift = (cx - 0.5, cy - 0.5);
    (shift.0.abs() > f64::EPSILON || shift.1.abs() > f64::EPSILON).then_some(shift)
}

fn default_compose_output(image: &Path, ext: &str) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    image.with_file_name(format!("{stem}_icon.{ext}"))
}

pub async fn compose(global: &GlobalArgs, args: ComposeArgs) -> Result<()> {
    let config = load_config(global, false)?;
    let mut settings = config.compose.clone();
    if let Some(size) = args.size {
        settings.out_size = size;
    }
    if args.auto_center {
        settings.auto_center.enabled = true;
        settings.auto_center.sources.push(LOCAL_SOURCE.to_string());
    }
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_compose_output(&args.image, settings.format.extension()));

    let written = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let bytes = std::fs::read(&args.image)
            .with_context(|| format!("failed to read {}", args.image.display()))?;
        let border = load_border(&args.border)
            .with_context(|| format!("failed to load border {}", args.border.display()))?;
        let icon = compose_icon(&bytes, &SourceTag::new(LOCAL_SOURCE), &border, &settings)?;
        if let Some((dx, dy)) = centering_shift(&icon) {
            info!("shifted artwork by ({dx:.3}, {dy:.3})");
        }
        save_image_for_export(
            &DynamicImage::ImageRgba8(icon.image),
            &out,
            settings.format,
            settings.jpeg_quality,
        )?;
        Ok(out)
    })
    .await??;
    println!("{}", written.display());
    Ok(())
}

pub async fn assets(global: &GlobalArgs, args: AssetsArgs) -> Result<()> {
    let config = load_config(global, false)?;
    let games = scan_output(&config.paths.output_dir);
    let listed: Vec<_> = match args.missing {
        Some(kind) => missing(&games, ArtworkKind::from(kind)),
        None => games.iter().collect(),
    };
    for game in &listed {
        let mark = |present: bool| if present { "yes" } else { "-" };
        println!(
            "{:<12} {:<40} icon:{:<3} title:{:<3} heroes:{} slides:{}",
            game.platform_folder,
            game.game,
            mark(game.icon.is_some()),
            mark(game.title.is_some()),
            game.hero_count,
            game.slide_count
        );
    }
    println!("{} of {} games", listed.len(), games.len());

    match args.missing {
        Some(kind) if args.rescrape => {
            let Some(request) = rescrape_request(&listed, kind.into(), &config, args.workers)
            else {
                println!("nothing to re-scrape");
                return Ok(());
            };
            execute_job(&config, request, false).await
        }
        _ => Ok(()),
    }
}

/// Game folder name back to a searchable title.
fn title_for_folder(game: &str) -> String {
    game.replace('_', " ").trim().to_string()
}

/// A forced job over `games`, asking for the asset they lack.
fn rescrape_request(
    games: &[&GameAssets],
    kind: ArtworkKind,
    config: &Config,
    workers: Option<u16>,
) -> Option<JobRequest> {
    let mut titles: BTreeMap<PlatformKey, Vec<String>> = BTreeMap::new();
    for game in games {
        match &game.platform {
            Some(platform) => titles
                .entry(platform.clone())
                .or_default()
                .push(title_for_folder(&game.game)),
            None => warn!(
                "skipping {}/{}: unknown platform folder",
                game.platform_folder, game.game
            ),
        }
    }
    if titles.is_empty() {
        return None;
    }

    Some(JobRequest {
        platforms: titles.keys().cloned().collect(),
        titles,
        workers: workers.map(usize::from).unwrap_or(config.workers),
        overwrite: true,
        download_heroes: kind == ArtworkKind::Hero,
        download_screenshots: kind == ArtworkKind::Slide,
        ..JobRequest::default()
    })
}

pub async fn push(global: &GlobalArgs, args: PushArgs) -> Result<()> {
    let config = load_config(global, false)?;
    let adb = Adb::locate()?;
    info!("using adb at {}", adb.path().display());
    let report = adb
        .push_output(&config.paths.output_dir, &args.device_base)
        .await
        .context("device push failed")?;
    println!("copied {} files ({} errors)", report.copied, report.errors);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iisu_core::compose::Centroid;

    #[test]
    fn compose_output_sits_next_to_input() {
        assert_eq!(
            default_compose_output(Path::new("/art/Metroid.png"), "jpg"),
            PathBuf::from("/art/Metroid_icon.jpg")
        );
    }

    #[test]
    fn centering_shift_ignores_the_default_middle() {
        let icon = |centering, ran: bool| ComposedIcon {
            image: image::RgbaImage::new(1, 1),
            centering,
            centroid: ran.then_some(Centroid { x: 0.5, y: 0.5, count: 1 }),
            logo_cropped: false,
        };
        assert_eq!(centering_shift(&icon((0.5, 0.5), false)), None);
        assert_eq!(centering_shift(&icon((0.5, 0.5), true)), None);
        let (dx, dy) = centering_shift(&icon((0.28, 0.5), true)).expect("moved");
        assert!((dx + 0.22).abs() < 1e-9 && dy.abs() < 1e-9);
    }

    fn game(folder: &str, platform: Option<&str>, name: &str) -> GameAssets {
        GameAssets {
            platform_folder: folder.to_string(),
            platform: platform.map(PlatformKey::new),
            game: name.to_string(),
            dir: PathBuf::from(folder).join(name),
            icon: None,
            title: None,
            hero_count: 0,
            slide_count: 0,
        }
    }

    #[test]
    fn rescrape_groups_titles_by_platform() {
        let config = ConfigLoader::new()
            .require_credentials(false)
            .load_with_env(iisu_config::EnvConfig::from_vars(std::iter::empty::<(&str, &str)>()))
            .expect("default config")
            .config;
        let games = [
            game("NES", Some("NES"), "Kid_Icarus"),
            game("NES", Some("NES"), "Metroid"),
            game("junk", None, "Whatever"),
        ];
        let listed: Vec<&GameAssets> = games.iter().collect();

        let request = rescrape_request(&listed, ArtworkKind::Hero, &config, Some(2))
            .expect("request built");
        assert!(request.overwrite);
        assert!(request.download_heroes);
        assert!(!request.download_screenshots);
        assert_eq!(request.workers, 2);
        assert_eq!(request.platforms, vec![PlatformKey::new("NES")]);
        assert_eq!(
            request.titles[&PlatformKey::new("NES")],
            vec!["Kid Icarus".to_string(), "Metroid".to_string()]
        );

        let orphans = [game("junk", None, "Whatever")];
        let listed: Vec<&GameAssets> = orphans.iter().collect();
        assert!(rescrape_request(&listed, ArtworkKind::Icon, &config, None).is_none());
    }
}
