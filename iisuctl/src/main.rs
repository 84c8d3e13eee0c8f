//! `iisuctl`: scrape artwork, compose iiSU icons and manage the output tree.

mod cli;
mod commands;
mod selector;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Command::Run(args) => commands::run(&global, args).await,
        Command::Search(args) => commands::search(&global, args).await,
        Command::Match(args) => commands::match_title(&global, args).await,
        Command::Scan(args) => commands::scan(args),
        Command::Platforms => commands::platforms(&global),
        Command::Compose(args) => commands::compose(&global, args).await,
        Command::Assets(args) => commands::assets(&global, args).await,
        Command::Push(args) => commands::push(&global, args).await,
    }
}
