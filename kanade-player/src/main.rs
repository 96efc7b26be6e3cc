//! Kanade - Main entry point
//!
//! Composition root for the playback orchestrator: loads configuration,
//! wires the resolved-URL cache into the playback session, and runs one CLI
//! command. Shutdown is an explicit hook: Ctrl-C or SIGTERM stops the
//! session and clears the cache before the process exits.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kanade_common::{PlayerEvent, TrackDescriptor};
use kanade_player::{demo, search, PlayerConfig, PlayerSession, UrlCache, UrlResolver, YtDlpResolver};

/// Package version plus build identification from build.rs
const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

/// Command-line arguments for kanade
#[derive(Parser, Debug)]
#[command(name = "kanade")]
#[command(about = "Terminal audio player driving yt-dlp and mpv")]
#[command(version = VERSION)]
struct Args {
    /// Path to a config file (default: <config_dir>/kanade/config.toml)
    #[arg(short, long, env = "KANADE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Play a URL, or the first search hit for a free-text query
    Play {
        /// Watch-page URL or search text
        target: String,
    },
    /// Search for tracks and list them
    Search {
        /// Search text; #hashtags filter the results
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// List tracks related to a watch-page URL
    Related {
        url: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; KANADE_DEBUG=1 raises the default verbosity,
    // RUST_LOG overrides everything.
    let default_filter = if std::env::var("KANADE_DEBUG").map(|v| v == "1").unwrap_or(false) {
        "kanade_player=debug"
    } else {
        "kanade_player=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = PlayerConfig::load(args.config.as_deref()).context("failed to load configuration")?;

    match args.command {
        CliCommand::Play { target } => cmd_play(config, target).await,
        CliCommand::Search { query, limit } => cmd_search(config, query, limit).await,
        CliCommand::Related { url, limit } => cmd_related(config, url, limit).await,
    }
}

async fn cmd_play(config: PlayerConfig, target: String) -> Result<()> {
    check_binary(&config.player_bin, "player", "mpv").await?;
    if !demo::enabled().await {
        check_binary(&config.resolver_bin, "resolver", "yt-dlp").await?;
    }

    let resolver: Arc<dyn UrlResolver> = Arc::new(YtDlpResolver::new(&config));
    let cache = Arc::new(UrlCache::new(resolver, config.cache_ttl()));
    let session = PlayerSession::new(config.clone(), Arc::clone(&cache));

    let track = pick_track(&config, &cache, &target).await?;

    // warm the cache for the chosen track so the session can take the
    // direct fast path instead of building the pipe
    if !track.is_live() {
        cache.prefetch(&track.url, &config.audio_format).await;
        cache.wait_for(&track.url, Duration::from_secs(5)).await;
    }

    let mut events = session.subscribe();
    if !session.play(&track.url, track.clone()).await {
        bail!("could not start playback of {}", track.url);
    }
    println!("Playing: {}", track);
    println!("(Ctrl-C to stop)");

    // run until natural end of stream or an interrupt
    loop {
        tokio::select! {
            _ = shutdown_signal() => {
                info!("interrupt received, stopping playback");
                break;
            }
            event = events.recv() => match event {
                Ok(PlayerEvent::PlaybackEnded { .. }) => {
                    info!("playback finished");
                    break;
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
    }

    session.stop().await;
    cache.clear().await;
    Ok(())
}

async fn cmd_search(config: PlayerConfig, query: String, limit: usize) -> Result<()> {
    if !demo::enabled().await {
        check_binary(&config.resolver_bin, "resolver", "yt-dlp").await?;
    }
    let results = search::search(&config, &query, limit)
        .await
        .context("search failed")?;
    print_tracks(&results);
    Ok(())
}

async fn cmd_related(config: PlayerConfig, url: String, limit: usize) -> Result<()> {
    check_binary(&config.resolver_bin, "resolver", "yt-dlp").await?;
    let results = search::related(&config, &url, limit)
        .await
        .context("related-track lookup failed")?;
    print_tracks(&results);
    Ok(())
}

/// Turn the CLI target into a track descriptor: URLs play as-is (duration
/// unknown, so the player handles them directly), anything else plays the
/// first search hit. Upcoming candidates are prefetched while we are at it.
async fn pick_track(
    config: &PlayerConfig,
    cache: &UrlCache,
    target: &str,
) -> Result<TrackDescriptor> {
    if target.starts_with("http://") || target.starts_with("https://") {
        let id = search::extract_video_id(target).unwrap_or_else(|| target.to_string());
        return Ok(TrackDescriptor::new(id, target, target, "?"));
    }

    let results = search::search(config, target, 10).await.context("search failed")?;
    let Some(first) = results.first().cloned() else {
        bail!("no results for '{}'", target);
    };

    // warm the cache for the runners-up in case the user plays one next
    let upcoming: Vec<String> = results.iter().skip(1).map(|t| t.url.clone()).collect();
    cache
        .prefetch_batch(upcoming, &config.audio_format, 3)
        .await;

    Ok(first)
}

fn print_tracks(tracks: &[TrackDescriptor]) {
    if tracks.is_empty() {
        println!("No results.");
        return;
    }
    for (i, track) in tracks.iter().enumerate() {
        println!("{:2}. {}  {}", i + 1, track, track.url);
    }
}

/// Fail early with an actionable message when an external binary is not
/// runnable.
async fn check_binary(bin: &std::path::Path, role: &str, hint: &str) -> Result<()> {
    let status = tokio::process::Command::new(bin)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => bail!(
            "{} binary '{}' is not runnable; install {} or point the config at it",
            role,
            bin.display(),
            hint
        ),
    }
}

/// Graceful shutdown signal: Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
