//! Static-markup document accessor
//!
//! `HttpAccessor` renders a page with a single GET request and answers every
//! query with CSS selectors over the delivered markup. It cannot run
//! client-side scripts:
//! - `wait_for` is satisfied iff the element is already in the markup
//! - `click` on a present element always reports failure
//!
//! The parsed tree is rebuilt per query so the session itself only holds
//! plain strings and stays `Send`.

use super::{DocumentAccessor, Locator, PageSession, ProxyRotation, RenderedDocument};
use crate::config::Config;
use crate::url::resolve_link;
use crate::{AccessError, ConfigError};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

/// Accessor that fetches pages over HTTP and queries them with scraper
#[derive(Debug)]
pub struct HttpAccessor {
    egress: ProxyRotation,
}

impl HttpAccessor {
    /// Builds the accessor and its egress pool
    ///
    /// Fails with `ConfigError::Egress` when no usable outbound identity can
    /// be set up; callers treat that as fatal for the whole crawl.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let egress = ProxyRotation::build(
            &config.user_agent,
            config.proxy.as_ref(),
            config.crawler.navigation_timeout(),
        )?;
        Ok(Self { egress })
    }
}

#[async_trait]
impl DocumentAccessor for HttpAccessor {
    type Session = HttpSession;

    async fn render(&self, url: &Url) -> Result<HttpSession, AccessError> {
        let (client, egress) = self.egress.next_client();
        tracing::trace!("Rendering {} via {}", url, egress);

        let response = client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                AccessError::Timeout {
                    url: url.to_string(),
                }
            } else {
                AccessError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AccessError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| AccessError::Navigation {
            url: url.to_string(),
            message: format!("failed to read body: {}", e),
        })?;

        Ok(HttpSession::new(final_url, body))
    }
}

/// A page delivered by `HttpAccessor`
#[derive(Debug, Clone)]
pub struct HttpSession {
    url: Url,
    body: String,
}

impl HttpSession {
    pub fn new(url: Url, body: String) -> Self {
        Self { url, body }
    }

    fn view(&self) -> StaticDocument {
        StaticDocument::parse(&self.body)
    }
}

#[async_trait]
impl PageSession for HttpSession {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn wait_for(&mut self, target: &Locator, _timeout: Duration) -> bool {
        // Static markup never changes after delivery.
        self.view().contains(target)
    }

    async fn read_text(&mut self, target: &Locator) -> Option<String> {
        self.view().text(target)
    }

    async fn click(&mut self, target: &Locator) -> Option<bool> {
        if self.view().contains(target) {
            tracing::debug!("Cannot click {} on static page {}", target, self.url);
            Some(false)
        } else {
            None
        }
    }

    async fn resolve_links(&mut self, target: &Locator) -> Vec<String> {
        self.view().links(target, &self.url)
    }

    async fn snapshot(&mut self) -> Vec<u8> {
        self.body.clone().into_bytes()
    }

    fn document(&self) -> Box<dyn RenderedDocument + '_> {
        Box::new(self.view())
    }

    async fn close(self) {
        tracing::trace!("Closed session for {}", self.url);
    }
}

/// Parsed markup answering locator queries as CSS selectors
///
/// Unparseable selectors behave like selectors that match nothing.
pub struct StaticDocument {
    html: Html,
}

impl StaticDocument {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    fn select_all(&self, target: &Locator) -> Vec<ElementRef<'_>> {
        match Selector::parse(target.as_str()) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(e) => {
                tracing::warn!("Unusable locator '{}': {:?}", target, e);
                Vec::new()
            }
        }
    }

    pub fn contains(&self, target: &Locator) -> bool {
        !self.select_all(target).is_empty()
    }

    /// Resolves the `href` of every matching element, or of its first
    /// descendant anchor when the element itself has none
    pub fn links(&self, target: &Locator, base_url: &Url) -> Vec<String> {
        let anchor = Selector::parse("a[href]").ok();

        self.select_all(target)
            .into_iter()
            .filter_map(|element| {
                element.value().attr("href").or_else(|| {
                    anchor
                        .as_ref()
                        .and_then(|a| element.select(a).next())
                        .and_then(|a| a.value().attr("href"))
                })
            })
            .filter_map(|href| resolve_link(href, base_url))
            .collect()
    }
}

fn inner_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

impl RenderedDocument for StaticDocument {
    fn text(&self, target: &Locator) -> Option<String> {
        self.select_all(target).into_iter().next().map(inner_text)
    }

    fn texts(&self, target: &Locator) -> Vec<String> {
        self.select_all(target).into_iter().map(inner_text).collect()
    }
}
