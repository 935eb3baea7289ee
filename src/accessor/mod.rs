//! Document accessor: the rendering boundary of the crawler
//!
//! The crawl core never touches markup directly. It asks a
//! [`DocumentAccessor`] to render a URL into a [`PageSession`] and then drives
//! that session through a small set of primitives: wait for an element, read
//! text, click, resolve links and take a diagnostic snapshot. Locators are
//! opaque strings owned by the configuration; only the accessor interprets
//! them.
//!
//! This module contains:
//! - the accessor and session traits
//! - `HttpAccessor`, a static-markup accessor built on reqwest and scraper
//! - `ProxyRotation`, the round-robin egress pool used by `HttpAccessor`

mod http;
mod proxy;

#[cfg(test)]
pub(crate) mod fake;

pub use http::{HttpAccessor, HttpSession, StaticDocument};
pub use proxy::ProxyRotation;

use crate::AccessError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Opaque element locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&String> for Locator {
    fn from(value: &String) -> Self {
        Self::new(value.as_str())
    }
}

/// Synchronous read-only view of a rendered page
///
/// Implementations must never fail: a missing element is `None` or an empty
/// list.
pub trait RenderedDocument {
    /// Trimmed inner text of the first element matching `target`
    fn text(&self, target: &Locator) -> Option<String>;

    /// Inner text of every element matching `target`, in document order
    fn texts(&self, target: &Locator) -> Vec<String>;
}

/// One rendered page owned by exactly one worker
#[async_trait]
pub trait PageSession: Send {
    /// URL the page was finally served from
    fn url(&self) -> &Url;

    /// Waits up to `timeout` for `target` to be present
    async fn wait_for(&mut self, target: &Locator, timeout: Duration) -> bool;

    /// Trimmed text of `target`, or None when it is absent
    async fn read_text(&mut self, target: &Locator) -> Option<String>;

    /// Clicks `target`
    ///
    /// Returns None when the element is absent and `Some(false)` when it is
    /// present but the click could not be performed.
    async fn click(&mut self, target: &Locator) -> Option<bool>;

    /// Absolute URLs of every element matching `target`
    async fn resolve_links(&mut self, target: &Locator) -> Vec<String>;

    /// Opaque diagnostic blob describing the current page
    async fn snapshot(&mut self) -> Vec<u8>;

    /// Read-only view used by the extraction engine
    fn document(&self) -> Box<dyn RenderedDocument + '_>;

    /// Releases every resource held by the session
    async fn close(self);
}

/// Factory for rendering sessions
#[async_trait]
pub trait DocumentAccessor: Send + Sync + 'static {
    type Session: PageSession + 'static;

    /// Renders `url` into a fresh session
    async fn render(&self, url: &Url) -> Result<Self::Session, AccessError>;
}
