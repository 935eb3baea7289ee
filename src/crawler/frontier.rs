//! Deduplicating work queue shared by all workers
//!
//! The frontier owns two pieces of state behind a single mutex:
//! - the set of identities ever enqueued, which only grows
//! - the FIFO queue of requests not yet started
//!
//! It also counts attempts in flight so that an empty queue is only treated
//! as the end of the crawl once no running attempt can produce more work.

use crate::crawler::request::{Request, RequestKey};
use crate::state::Label;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct FrontierInner {
    seen: HashSet<RequestKey>,
    queue: VecDeque<Request>,
    in_flight: usize,
}

/// Crawl frontier with at-most-once enqueue per (URL, label)
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    changed: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offers a discovered URL to the frontier
    ///
    /// The URL is canonicalized first. The identity check and the insertion
    /// happen in one critical section, so concurrent offers of the same
    /// identity accept exactly one.
    ///
    /// # Returns
    ///
    /// `true` if the request was newly added, `false` if its identity was
    /// seen before or the URL is unusable
    pub fn enqueue(&self, url: &str, label: Label) -> bool {
        let request = match Request::new(url, label) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("Rejected {} request for '{}': {}", label, url, e);
                return false;
            }
        };
        self.admit(request)
    }

    /// Adds an already-built request, keeping its attempt count
    ///
    /// Used when restoring unfinished work; subject to the same dedup check.
    pub fn admit(&self, request: Request) -> bool {
        let added = {
            let mut inner = self.lock();
            if inner.seen.insert(request.key()) {
                inner.queue.push_back(request);
                true
            } else {
                false
            }
        };

        if added {
            self.changed.notify_waiters();
        }
        added
    }

    /// Puts a retried request back at the end of the queue
    ///
    /// Retries are not new discoveries, so the dedup set is not consulted.
    pub fn requeue(&self, request: Request) {
        self.lock().queue.push_back(request);
        self.changed.notify_waiters();
    }

    /// Takes the next pending request and marks it in flight
    ///
    /// Every request returned here must later be matched by one call to
    /// [`Frontier::settle`].
    pub fn pop(&self) -> Option<Request> {
        let mut inner = self.lock();
        let request = inner.queue.pop_front()?;
        inner.in_flight += 1;
        Some(request)
    }

    /// Records that an attempt taken with `pop` has finished
    ///
    /// Any retry must be requeued before settling, otherwise another worker
    /// may observe a drained frontier in between.
    pub fn settle(&self) {
        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// True when nothing is pending and no attempt is in flight
    pub fn is_drained(&self) -> bool {
        let inner = self.lock();
        inner.queue.is_empty() && inner.in_flight == 0
    }

    /// Waits for the next request
    ///
    /// Suspends while the queue is empty but some attempt is still in flight.
    /// Returns None once the frontier is drained or `cancel` fires.
    pub async fn next(&self, cancel: &CancellationToken) -> Option<Request> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if cancel.is_cancelled() {
                return None;
            }

            if let Some(request) = self.pop() {
                return Some(request);
            }

            if self.is_drained() {
                self.changed.notify_waiters();
                return None;
            }

            tokio::select! {
                _ = notified.as_mut() => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    /// Removes and returns every pending request
    pub fn drain_pending(&self) -> Vec<Request> {
        self.lock().queue.drain(..).collect()
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of distinct identities ever enqueued
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }
}
