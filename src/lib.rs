//! Listing-Harvester: a classifieds listing crawler
//!
//! This crate discovers listing pages on a classifieds site, paginates them,
//! visits each item's detail page and appends one structured record per item
//! to an output sink. Page rendering is delegated to a pluggable
//! [`accessor::DocumentAccessor`].

pub mod accessor;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Listing-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Document accessor error: {0}")]
    Access(#[from] AccessError),

    #[error("Output sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// Every variant is fatal at crawl scope: a crawl never starts with a
/// configuration that produced one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("No usable egress: {0}")]
    Egress(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors raised by a document accessor while rendering a page
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Navigation to {url} timed out")]
    Timeout { url: String },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Errors raised by an output sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for Listing-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, AttemptOutcome, Frontier, Label, Request};
pub use output::Record;
pub use state::PageStep;
pub use url::canonicalize_url;
