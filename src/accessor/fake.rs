//! In-memory accessor for unit tests

use super::{DocumentAccessor, Locator, PageSession, RenderedDocument};
use crate::AccessError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Scripted page content keyed by locator string
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: HashMap<String, Vec<String>>,
    links: HashMap<String, Vec<String>>,
    reveals: HashMap<String, Option<String>>,
    wait_delay: Option<Duration>,
    panic_on_wait: bool,
    panic_on_render: bool,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, locator: &str, text: &str) -> Self {
        self.elements
            .entry(locator.to_string())
            .or_default()
            .push(text.to_string());
        self
    }

    pub fn with_texts(mut self, locator: &str, texts: &[&str]) -> Self {
        for text in texts {
            self = self.with_text(locator, text);
        }
        self
    }

    pub fn with_links(mut self, locator: &str, links: &[&str]) -> Self {
        self.links.insert(
            locator.to_string(),
            links.iter().map(|l| l.to_string()).collect(),
        );
        self.elements
            .entry(locator.to_string())
            .or_default()
            .extend(links.iter().map(|_| String::new()));
        self
    }

    /// A control whose text becomes `revealed` once clicked
    pub fn with_reveal(mut self, locator: &str, label: &str, revealed: &str) -> Self {
        self.reveals
            .insert(locator.to_string(), Some(revealed.to_string()));
        self.with_text(locator, label)
    }

    /// A control that is present but refuses clicks
    pub fn with_broken_control(mut self, locator: &str, label: &str) -> Self {
        self.reveals.insert(locator.to_string(), None);
        self.with_text(locator, label)
    }

    /// Every wait sleeps this long before answering
    pub fn with_wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = Some(delay);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_wait = true;
        self
    }

    /// Rendering this page panics before any session exists
    pub fn panicking_render(mut self) -> Self {
        self.panic_on_render = true;
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    pages: Mutex<HashMap<String, FakePage>>,
    renders: Mutex<Vec<String>>,
    open_sessions: AtomicUsize,
    clicks: Mutex<Vec<String>>,
}

/// Accessor serving scripted pages; unknown URLs fail navigation
#[derive(Debug, Clone, Default)]
pub struct FakeAccessor {
    state: Arc<FakeState>,
}

impl FakeAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, page: FakePage) -> Self {
        self.state
            .pages
            .lock()
            .unwrap()
            .insert(url.to_string(), page);
        self
    }

    /// Every URL rendered so far, in order
    pub fn renders(&self) -> Vec<String> {
        self.state.renders.lock().unwrap().clone()
    }

    pub fn render_count(&self, url: &str) -> usize {
        self.renders().iter().filter(|u| u.as_str() == url).count()
    }

    /// Sessions rendered and not yet closed
    pub fn open_sessions(&self) -> usize {
        self.state.open_sessions.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.clicks.lock().unwrap().clone()
    }

    /// Opens a session directly, bypassing navigation bookkeeping
    pub async fn session(&self, url: &str) -> FakeSession {
        self.render(&Url::parse(url).unwrap()).await.unwrap()
    }
}

#[async_trait]
impl DocumentAccessor for FakeAccessor {
    type Session = FakeSession;

    async fn render(&self, url: &Url) -> Result<FakeSession, AccessError> {
        self.state.renders.lock().unwrap().push(url.to_string());
        let page = self.state.pages.lock().unwrap().get(url.as_str()).cloned();
        match page {
            Some(page) if page.panic_on_render => {
                panic!("scripted fault while rendering {}", url);
            }
            Some(page) => {
                self.state.open_sessions.fetch_add(1, Ordering::SeqCst);
                Ok(FakeSession {
                    url: url.clone(),
                    page,
                    clicked: HashSet::new(),
                    state: Arc::clone(&self.state),
                })
            }
            None => Err(AccessError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

pub struct FakeSession {
    url: Url,
    page: FakePage,
    clicked: HashSet<String>,
    state: Arc<FakeState>,
}

impl FakeSession {
    fn current_text(&self, locator: &str) -> Option<String> {
        if self.clicked.contains(locator) {
            if let Some(Some(revealed)) = self.page.reveals.get(locator) {
                return Some(revealed.clone());
            }
        }
        self.page
            .elements
            .get(locator)
            .and_then(|texts| texts.first().cloned())
    }
}

#[async_trait]
impl PageSession for FakeSession {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn wait_for(&mut self, target: &Locator, _timeout: Duration) -> bool {
        if self.page.panic_on_wait {
            panic!("scripted fault while waiting for {}", target);
        }
        if let Some(delay) = self.page.wait_delay {
            tokio::time::sleep(delay).await;
        }
        self.page
            .elements
            .get(target.as_str())
            .map_or(false, |e| !e.is_empty())
    }

    async fn read_text(&mut self, target: &Locator) -> Option<String> {
        self.current_text(target.as_str())
    }

    async fn click(&mut self, target: &Locator) -> Option<bool> {
        if !self.page.elements.contains_key(target.as_str()) {
            return None;
        }
        self.state
            .clicks
            .lock()
            .unwrap()
            .push(target.as_str().to_string());
        match self.page.reveals.get(target.as_str()) {
            Some(None) => Some(false),
            _ => {
                self.clicked.insert(target.as_str().to_string());
                Some(true)
            }
        }
    }

    async fn resolve_links(&mut self, target: &Locator) -> Vec<String> {
        self.page
            .links
            .get(target.as_str())
            .cloned()
            .unwrap_or_default()
    }

    async fn snapshot(&mut self) -> Vec<u8> {
        format!("<snapshot of {}>", self.url).into_bytes()
    }

    fn document(&self) -> Box<dyn RenderedDocument + '_> {
        Box::new(FakeDocument { session: self })
    }

    async fn close(self) {
        self.state.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FakeDocument<'a> {
    session: &'a FakeSession,
}

impl RenderedDocument for FakeDocument<'_> {
    fn text(&self, target: &Locator) -> Option<String> {
        self.session
            .current_text(target.as_str())
            .map(|t| t.trim().to_string())
    }

    fn texts(&self, target: &Locator) -> Vec<String> {
        self.session
            .page
            .elements
            .get(target.as_str())
            .cloned()
            .unwrap_or_default()
    }
}
