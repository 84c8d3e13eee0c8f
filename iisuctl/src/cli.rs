use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use iisu_core::device::DEFAULT_DEVICE_BASE;
use iisu_model::ArtworkKind;

#[derive(Debug, Parser)]
#[command(
    name = "iisuctl",
    version,
    about = "Scrape game artwork and build iiSU launcher icons"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Configuration file (TOML or JSON)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Env file holding API credentials
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate icons (and optionally logos, heroes, screenshots) for platforms
    Run(RunArgs),
    /// Query every icon provider for one title and list the options
    Search(SearchArgs),
    /// Fuzzy-match a title against a platform's database titles
    Match(MatchArgs),
    /// List ROM-derived titles per platform under a ROM root
    Scan(ScanArgs),
    /// List configured platforms with their iiSU folder and border status
    Platforms,
    /// Compose one image under a border without any network access
    Compose(ComposeArgs),
    /// Inventory the generated output tree
    Assets(AssetsArgs),
    /// Push the output tree to a connected Android device over adb
    Push(PushArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Platform key such as NES or GAMECUBE (repeatable; default: all configured)
    #[arg(long = "platform", short = 'p', value_name = "KEY")]
    pub platforms: Vec<String>,
    /// Parallel workers for automatic runs [default: config `workers`, else 4]
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,
    /// Titles per platform (0 = unlimited)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Only process titles matching this search term
    #[arg(long)]
    pub search: Option<String>,
    /// First-letter filter: A-Z, 0-9, # or all
    #[arg(long)]
    pub letter: Option<String>,
    /// Pick each icon by hand from the provider options
    #[arg(long)]
    pub interactive: bool,
    /// Download up to N hero banners per title
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub heroes: usize,
    /// Download up to N screenshots per title
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub screenshots: usize,
    /// Skip title/logo downloads
    #[arg(long)]
    pub no_logos: bool,
    /// Don't reuse the icon artwork when no logo exists
    #[arg(long)]
    pub no_title_fallback: bool,
    /// Regenerate assets that already exist
    #[arg(long)]
    pub overwrite: bool,
    /// Border image used for every platform in this run
    #[arg(long, value_name = "PNG")]
    pub border: Option<PathBuf>,
    /// Push the output to this device directory when the run ends
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_DEVICE_BASE)]
    pub push_to_device: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    /// Game title to look up
    pub title: String,
    #[arg(long, short = 'p', value_name = "KEY")]
    pub platform: String,
    /// Options requested from each provider
    #[arg(long, default_value_t = 5)]
    pub per_provider: usize,
}

#[derive(Debug, Clone, Args)]
pub struct MatchArgs {
    pub title: String,
    #[arg(long, short = 'p', value_name = "KEY")]
    pub platform: String,
    /// How many ranked matches to print
    #[arg(long, default_value_t = 5)]
    pub max: usize,
}

#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// ROM root containing one folder per platform
    pub root: PathBuf,
    /// Only list this platform
    #[arg(long, short = 'p', value_name = "KEY")]
    pub platform: Option<String>,
    /// Only list titles containing this text
    #[arg(long, short = 'q')]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ComposeArgs {
    /// Source artwork
    pub image: PathBuf,
    /// Border PNG with a transparent window
    #[arg(long, value_name = "PNG")]
    pub border: PathBuf,
    /// Output file (default: <image>_icon.<ext> next to the input)
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Output edge length in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(64..=4096))]
    pub size: Option<u32>,
    /// Shift the artwork so its content sits centered in the frame
    #[arg(long)]
    pub auto_center: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AssetKindArg {
    Icon,
    Title,
    Hero,
    Slide,
}

impl From<AssetKindArg> for ArtworkKind {
    fn from(value: AssetKindArg) -> Self {
        match value {
            AssetKindArg::Icon => ArtworkKind::Icon,
            AssetKindArg::Title => ArtworkKind::Title,
            AssetKindArg::Hero => ArtworkKind::Hero,
            AssetKindArg::Slide => ArtworkKind::Slide,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct AssetsArgs {
    /// Only list games missing this asset
    #[arg(long, value_enum)]
    pub missing: Option<AssetKindArg>,
    /// Run a job over the listed games, overwriting what exists
    #[arg(long, requires = "missing")]
    pub rescrape: bool,
    /// Parallel titles for --rescrape (defaults to the config)
    #[arg(long, requires = "rescrape", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,
}

#[derive(Debug, Clone, Args)]
pub struct PushArgs {
    /// Device directory holding per-platform folders
    #[arg(default_value = DEFAULT_DEVICE_BASE)]
    pub device_base: String,
}
