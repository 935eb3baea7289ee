//! Units of work and the outcome of a single attempt

use crate::state::{Label, PageStep};
use crate::url::canonicalize_url;
use crate::UrlError;
use thiserror::Error;
use url::Url;

/// A page to visit, tagged with the state-machine branch that handles it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Canonical URL
    pub url: Url,

    /// Branch of the page state machine
    pub label: Label,

    /// Zero for the first attempt, incremented on every retry
    pub attempt: u32,
}

/// Frontier identity of a request; the attempt count is not part of it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub url: String,
    pub label: Label,
}

impl Request {
    /// Creates a first-attempt request from a raw URL
    pub fn new(url: &str, label: Label) -> Result<Self, UrlError> {
        Ok(Self {
            url: canonicalize_url(url)?,
            label,
            attempt: 0,
        })
    }

    pub fn key(&self) -> RequestKey {
        RequestKey {
            url: self.url.as_str().to_string(),
            label: self.label,
        }
    }

    /// The same unit of work with its attempt count incremented
    pub fn retried(&self) -> Self {
        Self {
            url: self.url.clone(),
            label: self.label,
            attempt: self.attempt.saturating_add(1),
        }
    }
}

/// Why an attempt did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    #[error("no-cards")]
    NoCards,

    #[error("no-title")]
    NoTitle,

    #[error("navigation: {0}")]
    Navigation(String),

    #[error("sink: {0}")]
    Sink(String),

    #[error("cancelled")]
    Cancelled,

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("no step after {step} on the {label} branch")]
    InvalidStep { step: PageStep, label: Label },
}

/// Result of one execution of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,

    /// Eligible for another attempt
    RecoverableFailure(AttemptFailure),

    /// The request is finished without a result
    FatalFailure(AttemptFailure),
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
