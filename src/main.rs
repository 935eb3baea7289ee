//! Listing-Harvester main entry point
//!
//! This is the command-line interface for the Listing-Harvester crawler.

use anyhow::Context;
use clap::Parser;
use listing_harvester::config::{load_config_with_hash, Config};
use listing_harvester::crawler::{run_crawl, seed_requests};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Listing-Harvester: a classifieds listing crawler
///
/// Listing-Harvester walks paginated search results, visits every item's
/// detail page and writes one record per item to a JSON-lines file or a
/// SQLite database.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A classifieds listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume from the checkpoint of an interrupted crawl (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start from the seeds, discarding any checkpoint
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Seed URL overriding the configured seeds (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if !cli.seeds.is_empty() {
        config.seeds = cli.seeds;
        seed_requests(&config).context("Invalid --seed URL")?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(&config, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Listing-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.max_concurrency);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!(
        "  Navigation timeout: {}s",
        config.crawler.navigation_timeout_secs
    );
    println!("  Element wait: {}ms", config.crawler.wait_timeout_ms);
    println!("  Phone settle: {}ms", config.crawler.phone_settle_ms);
    println!("  Phone fallback: {:?}", config.crawler.phone_fallback);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nEgress:");
    match &config.proxy {
        Some(proxy) if !proxy.urls.is_empty() => {
            println!("  {} proxies (required: {})", proxy.urls.len(), proxy.required);
        }
        _ => println!("  direct"),
    }

    println!("\nOutput:");
    println!("  Records ({:?}): {}", config.output.format, config.output.records_path);
    println!("  Diagnostics: {}", config.output.diagnostics_dir);
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring checkpoint)");
    } else {
        tracing::info!("Starting crawl (will resume from checkpoint if present)");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping workers");
            on_signal.cancel();
        }
    });

    let report = run_crawl(config, !fresh, cancel)
        .await
        .context("Crawl failed")?;

    if report.is_complete() {
        tracing::info!("Crawl completed successfully");
    } else {
        tracing::warn!(
            "Crawl stopped early; rerun to resume {} requests",
            report.unfinished.len()
        );
    }
    Ok(())
}
