//! Bounded worker pool
//!
//! Each worker repeatedly takes a request from the frontier, renders it into
//! a fresh session, runs the page state machine and classifies the result.
//! The session is closed on every path, including a panic inside the state
//! machine and cancellation mid-attempt.

use crate::accessor::{DocumentAccessor, PageSession};
use crate::config::Config;
use crate::crawler::frontier::Frontier;
use crate::crawler::handler::PageHandler;
use crate::crawler::request::{AttemptFailure, AttemptOutcome, Request};
use crate::crawler::retry::{RetryDecision, RetryPolicy};
use crate::output::{CrawlStats, DiagnosticsStore, RecordSink};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// State shared by every worker of one crawl
struct Shared<A> {
    accessor: A,
    handler: PageHandler,
    frontier: Arc<Frontier>,
    retry: RetryPolicy,
    diagnostics: Arc<DiagnosticsStore>,
    stats: Arc<CrawlStats>,
}

/// Runs a fixed number of workers against one frontier
pub struct Dispatcher<A> {
    shared: Arc<Shared<A>>,
    workers: usize,
}

impl<A: DocumentAccessor> Dispatcher<A> {
    pub fn new(
        config: &Config,
        accessor: A,
        frontier: Arc<Frontier>,
        sink: Arc<dyn RecordSink>,
        diagnostics: Arc<DiagnosticsStore>,
        stats: Arc<CrawlStats>,
    ) -> Self {
        let handler = PageHandler::new(
            config,
            Arc::clone(&frontier),
            sink,
            Arc::clone(&diagnostics),
            Arc::clone(&stats),
        );

        Self {
            shared: Arc::new(Shared {
                accessor,
                handler,
                frontier,
                retry: RetryPolicy::new(config.crawler.max_retries),
                diagnostics,
                stats,
            }),
            workers: config.crawler.max_concurrency.max(1) as usize,
        }
    }

    /// Runs until the frontier drains or `cancel` fires
    ///
    /// Returns the requests whose attempt was cut short by cancellation.
    /// Pending requests stay in the frontier.
    pub async fn run(&self, cancel: &CancellationToken) -> Vec<Request> {
        let mut workers = JoinSet::new();

        for id in 0..self.workers {
            let shared = Arc::clone(&self.shared);
            let cancel = cancel.clone();
            workers.spawn(async move { shared.work(id, cancel).await });
        }

        let mut interrupted = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(mut unfinished) => interrupted.append(&mut unfinished),
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }

        interrupted
    }
}

impl<A: DocumentAccessor> Shared<A> {
    async fn work(&self, id: usize, cancel: CancellationToken) -> Vec<Request> {
        tracing::debug!("Worker {} started", id);
        let mut interrupted = Vec::new();

        while let Some(request) = self.frontier.next(&cancel).await {
            let outcome = self.attempt(&request, &cancel).await;
            if let Some(unfinished) = self.conclude(request, outcome) {
                interrupted.push(unfinished);
            }
            // Any retry was requeued in `conclude`, before this settle.
            self.frontier.settle();
        }

        tracing::debug!("Worker {} stopped", id);
        interrupted
    }

    /// One execution of `request`
    ///
    /// A panic anywhere in the attempt, render and session release included,
    /// becomes a recoverable failure so the caller always settles the request.
    async fn attempt(&self, request: &Request, cancel: &CancellationToken) -> AttemptOutcome {
        self.stats.record_attempt();
        tracing::debug!(
            "Attempt {} of {} [{}]",
            request.attempt.saturating_add(1),
            request.url,
            request.label
        );

        match AssertUnwindSafe(self.run_attempt(request, cancel))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!("Attempt of {} panicked: {}", request.url, message);
                AttemptOutcome::RecoverableFailure(AttemptFailure::Panicked(message))
            }
        }
    }

    /// Render, state machine and session release
    ///
    /// The state machine runs under its own unwind guard so a panic inside
    /// it still reaches `close`.
    async fn run_attempt(&self, request: &Request, cancel: &CancellationToken) -> AttemptOutcome {
        let rendered = tokio::select! {
            rendered = self.accessor.render(&request.url) => rendered,
            _ = cancel.cancelled() => {
                return AttemptOutcome::RecoverableFailure(AttemptFailure::Cancelled)
            }
        };

        let mut session = match rendered {
            Ok(session) => session,
            Err(e) => {
                return AttemptOutcome::RecoverableFailure(AttemptFailure::Navigation(
                    e.to_string(),
                ))
            }
        };

        let handled = AssertUnwindSafe(self.handler.handle(&mut session, request)).catch_unwind();
        let outcome = tokio::select! {
            handled = handled => match handled {
                Ok(outcome) => outcome,
                Err(panic) => AttemptOutcome::RecoverableFailure(AttemptFailure::Panicked(
                    panic_message(panic.as_ref()),
                )),
            },
            _ = cancel.cancelled() => AttemptOutcome::RecoverableFailure(AttemptFailure::Cancelled),
        };

        if self.is_final_failure(request, &outcome)
            && self.diagnostics.latest_for(request).is_none()
        {
            let reason = failure_reason(&outcome);
            let snapshot = session.snapshot().await;
            self.diagnostics.capture(request, &reason, &snapshot);
            self.stats.record_snapshot();
        }

        session.close().await;
        outcome
    }

    /// True when `outcome` ends the request for good
    fn is_final_failure(&self, request: &Request, outcome: &AttemptOutcome) -> bool {
        match outcome {
            AttemptOutcome::Success => false,
            AttemptOutcome::RecoverableFailure(AttemptFailure::Cancelled) => false,
            AttemptOutcome::RecoverableFailure(_) => {
                self.retry.decide(request) == RetryDecision::GiveUp
            }
            AttemptOutcome::FatalFailure(_) => true,
        }
    }

    /// Applies the retry policy; returns the request if it was interrupted
    fn conclude(&self, request: Request, outcome: AttemptOutcome) -> Option<Request> {
        match outcome {
            AttemptOutcome::Success => {
                self.stats.record_success();
                None
            }
            AttemptOutcome::RecoverableFailure(AttemptFailure::Cancelled) => {
                self.stats.record_interrupted();
                tracing::info!("Interrupted {} [{}]", request.url, request.label);
                Some(request)
            }
            AttemptOutcome::RecoverableFailure(failure) => {
                match self.retry.decide(&request) {
                    RetryDecision::Retry(next) => {
                        self.stats.record_retry();
                        tracing::warn!(
                            "Attempt {}/{} of {} [{}] failed: {}; retrying",
                            request.attempt.saturating_add(1),
                            self.retry.max_attempts(),
                            request.url,
                            request.label,
                            failure
                        );
                        self.frontier.requeue(next);
                    }
                    RetryDecision::GiveUp => self.give_up(&request, &failure),
                }
                None
            }
            AttemptOutcome::FatalFailure(failure) => {
                self.give_up(&request, &failure);
                None
            }
        }
    }

    fn give_up(&self, request: &Request, failure: &AttemptFailure) {
        self.stats.record_permanent_failure();

        // Navigation failures never opened a session, so record the error itself.
        let diagnostic = self.diagnostics.latest_for(request).unwrap_or_else(|| {
            self.stats.record_snapshot();
            let reason = failure.to_string();
            self.diagnostics.capture(request, &reason, reason.as_bytes())
        });

        tracing::error!(
            "Giving up on {} [{}] after {} attempts: {} (diagnostic: {})",
            request.url,
            request.label,
            request.attempt.saturating_add(1),
            failure,
            diagnostic
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "not written".to_string()),
        );
    }
}

fn failure_reason(outcome: &AttemptOutcome) -> String {
    match outcome {
        AttemptOutcome::RecoverableFailure(f) | AttemptOutcome::FatalFailure(f) => f.to_string(),
        AttemptOutcome::Success => String::new(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
