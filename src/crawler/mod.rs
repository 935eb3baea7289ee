//! Crawler module: frontier, workers and the per-page state machine
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating frontier shared by all workers
//! - The bounded worker pool and its retry policy
//! - The page state machine for listing and detail pages
//! - The extraction engine for detail pages
//! - Overall crawl coordination, including checkpoint and resume

mod dispatcher;
mod extract;
mod frontier;
mod handler;
mod request;
mod retry;

pub use dispatcher::Dispatcher;
pub use extract::{apply_parameter_line, city_from_location, extract_fields};
pub use frontier::Frontier;
pub use handler::PageHandler;
pub use request::{AttemptFailure, AttemptOutcome, Request, RequestKey};
pub use retry::{RetryDecision, RetryPolicy};

pub use crate::state::Label;

use crate::accessor::{DocumentAccessor, HttpAccessor};
use crate::config::Config;
use crate::output::{
    self, load_checkpoint, remove_checkpoint, save_checkpoint, CrawlReport, CrawlStats,
    DiagnosticsStore, RecordSink,
};
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl with the HTTP accessor and the configured sink
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the accessor and its egress pool (fatal on failure)
/// 2. Open the record sink and the diagnostics directory
/// 3. Seed the frontier, or restore it from a checkpoint when `resume` is set
/// 4. Run the workers until the frontier drains or `cancel` fires
/// 5. Save unfinished work to the checkpoint, or remove a stale one
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ran; individual pages may still have failed
/// * `Err(HarvestError)` - The crawl could not start or its output could not
///   be finalized
pub async fn run_crawl(
    config: &Config,
    resume: bool,
    cancel: CancellationToken,
) -> Result<CrawlReport> {
    let accessor = HttpAccessor::new(config)?;
    let sink = output::open_sink(&config.output)?;
    let diagnostics = Arc::new(DiagnosticsStore::in_dir(Path::new(
        &config.output.diagnostics_dir,
    )));
    let checkpoint = Path::new(&config.output.checkpoint_path);

    let restored = if resume {
        load_checkpoint(checkpoint)?.filter(|requests| !requests.is_empty())
    } else {
        remove_checkpoint(checkpoint)?;
        None
    };
    let seeds = match restored {
        Some(requests) => {
            tracing::info!(
                "Resuming {} unfinished requests from {}",
                requests.len(),
                checkpoint.display()
            );
            requests
        }
        None => seed_requests(config)?,
    };

    let report = crawl_with(
        config,
        accessor,
        Arc::clone(&sink),
        diagnostics,
        seeds,
        cancel,
    )
    .await;

    sink.flush()?;
    if report.is_complete() {
        remove_checkpoint(checkpoint)?;
    } else {
        save_checkpoint(checkpoint, &report.unfinished)?;
    }

    report.log_summary();
    Ok(report)
}

/// Runs a crawl over any accessor and sink
///
/// Never fails: page-level failures are absorbed by the retry policy and
/// show up in the report.
pub async fn crawl_with<A: DocumentAccessor>(
    config: &Config,
    accessor: A,
    sink: Arc<dyn RecordSink>,
    diagnostics: Arc<DiagnosticsStore>,
    seeds: Vec<Request>,
    cancel: CancellationToken,
) -> CrawlReport {
    let started = Instant::now();
    let frontier = Arc::new(Frontier::new());
    let stats = Arc::new(CrawlStats::new());

    for seed in seeds {
        let url = seed.url.clone();
        if !frontier.admit(seed) {
            tracing::debug!("Duplicate seed {}", url);
        }
    }
    tracing::info!(
        "Starting crawl with {} seeds and {} workers",
        frontier.len(),
        config.crawler.max_concurrency
    );

    let dispatcher = Dispatcher::new(
        config,
        accessor,
        Arc::clone(&frontier),
        sink,
        Arc::clone(&diagnostics),
        Arc::clone(&stats),
    );
    let mut unfinished = dispatcher.run(&cancel).await;
    unfinished.extend(frontier.drain_pending());

    CrawlReport {
        stats: stats.summary(),
        unfinished,
        diagnostics: diagnostics.captured(),
        duration: started.elapsed(),
    }
}

/// LIST requests for every configured seed
pub fn seed_requests(config: &Config) -> Result<Vec<Request>> {
    let requests = config
        .seeds
        .iter()
        .map(|seed| Request::new(seed, Label::List))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(requests)
}

/// Configuration with short waits for unit tests
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    crate::config::parse_config(
        r#"
seeds = ["https://www.example.com/carros/"]

[crawler]
max-concurrency = 3
max-retries = 2
wait-timeout-ms = 200
phone-settle-ms = 10
cookie-settle-ms = 10

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[output]
records-path = "./records.jsonl"
"#,
    )
    .expect("test config is valid")
}
