//! Bounded retry policy
//!
//! A request is attempted at most `max_retries + 1` times. Recoverable
//! failures below that ceiling are requeued with an incremented attempt
//! count; the failure that reaches the ceiling ends the request for good.

use crate::crawler::request::Request;

/// What to do after a recoverable failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeue this request (attempt already incremented)
    Retry(Request),

    /// The ceiling is reached; the request fails permanently
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Total number of attempts a request may receive
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn decide(&self, failed: &Request) -> RetryDecision {
        if failed.attempt < self.max_retries {
            RetryDecision::Retry(failed.retried())
        } else {
            RetryDecision::GiveUp
        }
    }
}
