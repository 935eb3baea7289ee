//! Crawl statistics
//!
//! Counters are updated lock-free by every worker; a [`StatsSummary`] is a
//! point-in-time copy used for reporting.

use crate::crawler::Request;
use crate::output::diagnostics::DiagnosticRef;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters shared by all workers
#[derive(Debug, Default)]
pub struct CrawlStats {
    attempts: AtomicU64,
    successes: AtomicU64,
    retries: AtomicU64,
    permanent_failures: AtomicU64,
    records_emitted: AtomicU64,
    list_enqueued: AtomicU64,
    detail_enqueued: AtomicU64,
    snapshots: AtomicU64,
    interrupted: AtomicU64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_attempt, attempts);
    counter!(record_success, successes);
    counter!(record_retry, retries);
    counter!(record_permanent_failure, permanent_failures);
    counter!(record_emitted, records_emitted);
    counter!(record_list_enqueued, list_enqueued);
    counter!(record_detail_enqueued, detail_enqueued);
    counter!(record_snapshot, snapshots);
    counter!(record_interrupted, interrupted);

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            permanent_failures: self.permanent_failures.load(Ordering::Relaxed),
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            list_enqueued: self.list_enqueued.load(Ordering::Relaxed),
            detail_enqueued: self.detail_enqueued.load(Ordering::Relaxed),
            snapshots: self.snapshots.load(Ordering::Relaxed),
            interrupted: self.interrupted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the crawl counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSummary {
    /// Page-handling attempts started (each retry counts)
    pub attempts: u64,
    pub successes: u64,
    pub retries: u64,
    /// Requests abandoned after exhausting their retry budget
    pub permanent_failures: u64,
    pub records_emitted: u64,
    /// LIST requests admitted by the frontier after seeding
    pub list_enqueued: u64,
    pub detail_enqueued: u64,
    pub snapshots: u64,
    /// Attempts cut short by cancellation
    pub interrupted: u64,
}

/// What a finished (or cancelled) crawl hands back to its caller
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub stats: StatsSummary,

    /// Requests never completed: pending at cancellation or interrupted
    /// mid-attempt. Empty when the frontier drained.
    pub unfinished: Vec<Request>,

    pub diagnostics: Vec<DiagnosticRef>,
    pub duration: Duration,
}

impl CrawlReport {
    /// True when the crawl ended by draining its frontier
    pub fn is_complete(&self) -> bool {
        self.unfinished.is_empty()
    }

    /// Logs the report at info level
    pub fn log_summary(&self) {
        let s = &self.stats;
        tracing::info!(
            "Crawl {} in {:.1}s: {} records, {} attempts ({} ok, {} retries, {} given up)",
            if self.is_complete() {
                "complete"
            } else {
                "interrupted"
            },
            self.duration.as_secs_f64(),
            s.records_emitted,
            s.attempts,
            s.successes,
            s.retries,
            s.permanent_failures,
        );
        tracing::info!(
            "Enqueued {} list pages and {} detail pages; {} diagnostic snapshots",
            s.list_enqueued,
            s.detail_enqueued,
            s.snapshots,
        );

        if !self.unfinished.is_empty() {
            tracing::warn!(
                "{} requests unfinished ({} interrupted mid-attempt)",
                self.unfinished.len(),
                s.interrupted
            );
        }
    }
}
