//! # lyricsync
//!
//! Follows the active media session and relays the current lyric line.
//! Snapshots arrive on stdin as JSON lines, updates leave on stdout and logs
//! go to stderr.

mod config;
mod services;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use lyricsync_cache::{DatasetIndex, LyricsCache, OfflineDataset};
use lyricsync_core::TrackQuery;
use lyricsync_lyrics::{ContentFilter, LrclibProvider, NeteaseProvider, Resolver};
use services::{DisplaySettings, LineRelay, LineSource, LyricsService};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "lyricsync", version, about = "Synced lyrics for the active media session")]
struct Cli {
    /// Override config file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Follow media snapshots on stdin and relay lyrics to stdout (default).
    Run,
    /// Rebuild the offline dataset index.
    BuildIndex {
        /// Dataset to index. Defaults to `dataset_path` from the config.
        dataset: Option<PathBuf>,
    },
    /// Resolve lyrics for one track and print them.
    Lookup {
        artist: String,
        title: String,
        /// Track length in seconds, used to pick between candidates.
        #[arg(long)]
        duration: Option<u64>,
    },
}

type DefaultResolver = Resolver<LrclibProvider, NeteaseProvider>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lyricsync=info,lyricsync_lyrics=info,lyricsync_cache=info,lyricsync_timing=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load_or_create(&config_path)?;

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::BuildIndex { dataset } => build_index(&config, dataset).await,
        Command::Lookup {
            artist,
            title,
            duration,
        } => lookup(config, artist, title, duration).await,
    };

    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}

async fn run(config: Config) -> Result<()> {
    info!("Starting lyricsync v{}", env!("CARGO_PKG_VERSION"));

    let settings = DisplaySettings::from_config(&config)?;
    let resolver = build_resolver(&config).await?;
    let service = LyricsService::new(Arc::new(resolver), settings, config.offset_ms);

    tokio::select! {
        result = service.run(LineSource::stdin(), LineRelay::stdout(), config.tick_interval()) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}

async fn build_index(config: &Config, dataset: Option<PathBuf>) -> Result<()> {
    let dataset = dataset
        .or_else(|| config.dataset_path.clone())
        .context("No dataset given and no dataset_path configured")?;
    let index_path = DatasetIndex::index_path(&dataset);

    let index =
        tokio::task::spawn_blocking(move || DatasetIndex::build_file(&dataset, &index_path))
            .await
            .context("Index build task failed")??;

    info!("Indexed {} tracks", index.len());
    Ok(())
}

async fn lookup(
    config: Config,
    artist: String,
    title: String,
    duration: Option<u64>,
) -> Result<()> {
    let resolver = build_resolver(&config).await?;
    let mut query = TrackQuery::new(artist, title);
    if let Some(secs) = duration {
        query = query.with_duration(secs * 1000);
    }

    let resolution = resolver.resolve(&query).await;
    for attempt in &resolution.attempts {
        println!(
            "# {}: {} ({} ms)",
            attempt.source,
            attempt.outcome,
            attempt.elapsed.as_millis()
        );
    }
    for line in resolution.document.lines() {
        println!("{:>8} {}", line.time_ms, line.text);
    }
    Ok(())
}

async fn build_resolver(config: &Config) -> Result<DefaultResolver> {
    let cache = match &config.cache_dir {
        Some(dir) => LyricsCache::with_path(dir),
        None => LyricsCache::new()?,
    };
    info!("Lyrics cache at {}", cache.cache_dir().display());

    let dataset = match config.dataset_path.clone() {
        Some(path) => open_dataset(path).await,
        None => None,
    };

    let timeout = config.request_timeout();
    let primary = LrclibProvider::new(timeout).context("Failed to create LRCLIB client")?;
    let secondary = NeteaseProvider::new(timeout).context("Failed to create NetEase client")?;

    Ok(Resolver::new(cache, primary, secondary)
        .with_dataset(dataset)
        .with_filter(ContentFilter::new(config.filter_cjk))
        .with_offline_mode(config.offline_mode))
}

/// Open the offline dataset, disabling it on failure.
async fn open_dataset(path: PathBuf) -> Option<Arc<OfflineDataset>> {
    let opened = tokio::task::spawn_blocking(move || OfflineDataset::open(&path)).await;
    match opened {
        Ok(Ok(dataset)) => {
            info!(
                "Offline dataset {} with {} indexed tracks",
                dataset.path().display(),
                dataset.index().len()
            );
            Some(Arc::new(dataset))
        }
        Ok(Err(e)) => {
            warn!("Offline dataset disabled: {e}");
            None
        }
        Err(e) => {
            warn!("Offline dataset disabled: {e}");
            None
        }
    }
}
