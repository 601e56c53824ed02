//! Forum-Archiver main entry point
//!
//! This is the command-line interface for the forum thread archiver.

use anyhow::Context;
use clap::Parser;
use forum_archiver::config::{compute_config_hash, load_config, validate, Config};
use forum_archiver::crawler::{Fetcher, RangeRunner};
use forum_archiver::output::{load_statistics, print_statistics};
use forum_archiver::storage::open_storage;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Forum-Archiver: an incremental forum thread archiver
///
/// Walks a range of thread ids on a MyBB-style forum and stores threads,
/// posts and author statistics in SQLite. Threads already archived are
/// skipped, so an interrupted run can simply be started again.
#[derive(Parser, Debug)]
#[command(name = "forum-archiver")]
#[command(version = "1.0.0")]
#[command(about = "An incremental forum thread archiver", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// First thread id to archive (overrides config and START_TID)
    #[arg(long, value_name = "TID")]
    start: Option<i64>,

    /// Last thread id to archive, inclusive (overrides config and END_TID)
    #[arg(long, value_name = "TID")]
    end: Option<i64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be archived without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    let config = load_effective_config(&cli)?;
    let config_hash = compute_config_hash(&config)?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("forum_archiver=info,warn"),
            1 => EnvFilter::new("forum_archiver=debug,info"),
            2 => EnvFilter::new("forum_archiver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Layers file, environment and command-line settings, then validates
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(start) = cli.start {
        config.range.start_tid = start;
    }
    if let Some(end) = cli.end {
        config.range.end_tid = end;
    }
    validate(&config).context("Invalid command-line range")?;

    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Forum-Archiver Dry Run ===\n");

    println!("Forum:");
    println!("  Base URL: {}", config.forum.base_url);
    println!(
        "  Thread range: {}..={} ({} threads)",
        config.range.start_tid,
        config.range.end_tid,
        config.range.end_tid - config.range.start_tid + 1
    );
    println!(
        "  First page: {}",
        config.thread_page_url(config.range.start_tid, 1)
    );

    println!("\nFetching:");
    println!("  Delay between requests: {}s", config.fetch.request_delay_secs);
    println!("  Attempts per request: {}", config.fetch.max_retries);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Backoff base: {}s", config.fetch.backoff_base_secs);
    println!("  User agent: {}", config.fetch.user_agent);
    println!("  Extra headers: {}", config.fetch.headers.len());
    println!(
        "  Cookies: {}",
        if config.fetch.cookies.is_some() {
            "set"
        } else {
            "none"
        }
    );

    println!("\nOutput:");
    println!("  Database: {}", config.database.path.display());

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.database.path.display());

    let storage = open_storage(&config.database.path).context("Failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);
    storage.close()?;

    Ok(())
}

/// Handles the main archive pass
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let storage = open_storage(&config.database.path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database.path.display()
        )
    })?;
    let fetcher = Fetcher::new(&config.fetch)?;

    let cancel = CancellationToken::new();
    let listener = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown requested, finishing current thread...");
        listener.cancel();
    });

    let mut runner = RangeRunner::new(config, fetcher, storage);
    let result = runner.run(&cancel, config_hash).await;
    runner.close().close()?;

    let summary = result?;
    if summary.cancelled {
        tracing::info!("Archive pass interrupted; run again to resume");
    } else {
        tracing::info!("Archive pass completed");
    }
    println!(
        "Crawled {} thread(s): {} succeeded, {} failed, {} skipped",
        summary.crawled, summary.succeeded, summary.failed, summary.skipped
    );

    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
