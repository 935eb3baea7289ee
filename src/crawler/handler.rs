//! Page state machine
//!
//! Drives one rendered page through the steps of its label's branch (see
//! [`PageStep`]). Best-effort steps (consent overlay, phone reveal) absorb
//! their own failures. Only the element waits and the sink handoff can end
//! an attempt early, and they always end it as a recoverable failure.

use crate::accessor::{Locator, PageSession};
use crate::config::{Config, ExtractionConfig, SelectorConfig};
use crate::crawler::extract::extract_fields;
use crate::crawler::frontier::Frontier;
use crate::crawler::request::{AttemptFailure, AttemptOutcome, Request};
use crate::output::{CrawlStats, DiagnosticsStore, ExtractedFields, Record, RecordSink};
use crate::state::{Label, PageStep};
use std::sync::Arc;
use std::time::Duration;

/// Runs the page state machine for one request at a time
pub struct PageHandler {
    selectors: SelectorConfig,
    extraction: ExtractionConfig,
    wait_timeout: Duration,
    phone_settle: Duration,
    cookie_settle: Duration,
    phone_fallback: String,
    frontier: Arc<Frontier>,
    sink: Arc<dyn RecordSink>,
    diagnostics: Arc<DiagnosticsStore>,
    stats: Arc<CrawlStats>,
}

/// Values carried between DETAIL steps
#[derive(Default)]
struct DetailProgress {
    phone: String,
    fields: ExtractedFields,
}

impl PageHandler {
    pub fn new(
        config: &Config,
        frontier: Arc<Frontier>,
        sink: Arc<dyn RecordSink>,
        diagnostics: Arc<DiagnosticsStore>,
        stats: Arc<CrawlStats>,
    ) -> Self {
        Self {
            selectors: config.selectors.clone(),
            extraction: config.extraction.clone(),
            wait_timeout: config.crawler.wait_timeout(),
            phone_settle: config.crawler.phone_settle(),
            cookie_settle: config.crawler.cookie_settle(),
            phone_fallback: config.crawler.phone_fallback.clone(),
            frontier,
            sink,
            diagnostics,
            stats,
        }
    }

    /// Walks `request` from `Start` to `Done` against an open session
    pub async fn handle<S: PageSession>(
        &self,
        session: &mut S,
        request: &Request,
    ) -> AttemptOutcome {
        let mut step = PageStep::Start;
        let mut detail = DetailProgress::default();

        loop {
            if step.is_terminal() {
                return AttemptOutcome::Success;
            }
            tracing::trace!("{} [{}] step {}", request.url, request.label, step);

            match step {
                PageStep::Start | PageStep::Done => {}
                PageStep::CookieCheck => self.dismiss_cookies(session, request).await,

                PageStep::WaitCards => {
                    if !self.wait(session, &self.selectors.item_card).await {
                        self.capture(session, request, &AttemptFailure::NoCards)
                            .await;
                        return AttemptOutcome::RecoverableFailure(AttemptFailure::NoCards);
                    }
                }
                PageStep::EnqueueItems => {
                    let links = session
                        .resolve_links(&Locator::from(&self.selectors.item_link))
                        .await;
                    let added = self.enqueue_all(&links, Label::Detail);
                    tracing::debug!(
                        "{}: {} item links, {} new",
                        request.url,
                        links.len(),
                        added
                    );
                }
                PageStep::EnqueueNextPage => {
                    let next = session
                        .resolve_links(&Locator::from(&self.selectors.next_page))
                        .await;
                    match next.first() {
                        Some(link) => {
                            self.enqueue_all(std::slice::from_ref(link), Label::List);
                        }
                        None => tracing::debug!("{}: last listing page", request.url),
                    }
                }

                PageStep::WaitTitle => {
                    if !self.wait(session, &self.selectors.title).await {
                        self.capture(session, request, &AttemptFailure::NoTitle)
                            .await;
                        return AttemptOutcome::RecoverableFailure(AttemptFailure::NoTitle);
                    }
                }
                PageStep::RevealPhone => detail.phone = self.reveal_phone(session, request).await,
                PageStep::Extract => detail.fields = self.extract(session),
                PageStep::Emit => {
                    let record = Record::assemble(
                        request.url.as_str(),
                        std::mem::take(&mut detail.phone),
                        std::mem::take(&mut detail.fields),
                        self.extraction.private_seller,
                    );
                    if let Err(e) = self.sink.append(&record) {
                        return AttemptOutcome::RecoverableFailure(AttemptFailure::Sink(
                            e.to_string(),
                        ));
                    }
                    self.stats.record_emitted();
                    tracing::info!("Emitted record for {}: {}", request.url, record.title);
                }
            }

            step = match step.successor(request.label) {
                Some(next) => next,
                None => {
                    return AttemptOutcome::FatalFailure(AttemptFailure::InvalidStep {
                        step,
                        label: request.label,
                    })
                }
            };
        }
    }

    /// Bounded wait for `selector`; the accessor's own timeout is not trusted
    async fn wait<S: PageSession>(&self, session: &mut S, selector: &str) -> bool {
        let target = Locator::new(selector);
        tokio::time::timeout(self.wait_timeout, session.wait_for(&target, self.wait_timeout))
            .await
            .unwrap_or(false)
    }

    async fn dismiss_cookies<S: PageSession>(&self, session: &mut S, request: &Request) {
        match session
            .click(&Locator::from(&self.selectors.cookie_button))
            .await
        {
            None => {}
            Some(true) => tokio::time::sleep(self.cookie_settle).await,
            Some(false) => tracing::debug!("{}: consent overlay not dismissed", request.url),
        }
    }

    /// Triggers the reveal control and reads it back after the settle delay
    async fn reveal_phone<S: PageSession>(&self, session: &mut S, request: &Request) -> String {
        let control = Locator::from(&self.selectors.phone_button);

        match session.click(&control).await {
            None => {
                tracing::debug!("{}: no phone control", request.url);
            }
            Some(false) => {
                tracing::debug!("{}: phone reveal click failed", request.url);
            }
            Some(true) => {
                tokio::time::sleep(self.phone_settle).await;
                if let Some(phone) = session.read_text(&control).await {
                    let phone = phone.trim();
                    if !phone.is_empty() {
                        return phone.to_string();
                    }
                }
                tracing::debug!("{}: phone reveal produced no text", request.url);
            }
        }

        self.phone_fallback.clone()
    }

    fn extract<S: PageSession>(&self, session: &S) -> ExtractedFields {
        let document = session.document();
        extract_fields(document.as_ref(), &self.selectors, &self.extraction)
    }

    fn enqueue_all(&self, links: &[String], label: Label) -> usize {
        let mut added = 0;
        for link in links {
            if self.frontier.enqueue(link, label) {
                added += 1;
                match label {
                    Label::List => self.stats.record_list_enqueued(),
                    Label::Detail => self.stats.record_detail_enqueued(),
                }
            }
        }
        added
    }

    async fn capture<S: PageSession>(
        &self,
        session: &mut S,
        request: &Request,
        failure: &AttemptFailure,
    ) {
        let snapshot = session.snapshot().await;
        self.diagnostics
            .capture(request, &failure.to_string(), &snapshot);
        self.stats.record_snapshot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::fake::{FakeAccessor, FakePage};
    use crate::crawler::test_config;
    use crate::output::MemorySink;

    const LIST_URL: &str = "https://www.example.com/carros/";
    const DETAIL_URL: &str = "https://www.example.com/d/anuncio/clio-ID1.html";

    struct Harness {
        handler: PageHandler,
        frontier: Arc<Frontier>,
        sink: Arc<MemorySink>,
        diagnostics: Arc<DiagnosticsStore>,
    }

    fn harness() -> Harness {
        let config = test_config();
        let frontier = Arc::new(Frontier::new());
        let sink = Arc::new(MemorySink::new());
        let diagnostics = Arc::new(DiagnosticsStore::detached());
        let handler = PageHandler::new(
            &config,
            Arc::clone(&frontier),
            sink.clone(),
            Arc::clone(&diagnostics),
            Arc::new(CrawlStats::new()),
        );
        Harness {
            handler,
            frontier,
            sink,
            diagnostics,
        }
    }

    fn list_page(items: &[&str], next: Option<&str>) -> FakePage {
        let selectors = SelectorConfig::default();
        let mut page = FakePage::new()
            .with_texts(&selectors.item_card, &vec!["card"; items.len()])
            .with_links(&selectors.item_link, items);
        if let Some(next) = next {
            page = page.with_links(&selectors.next_page, &[next]);
        }
        page
    }

    fn clio_page() -> FakePage {
        let selectors = SelectorConfig::default();
        FakePage::new()
            .with_text(&selectors.title, "Renault Clio 2020")
            .with_text(&selectors.price, "8 500 €")
            .with_text(&selectors.location, "Aveiro - Hoje às 10:15")
            .with_texts(
                &selectors.parameters,
                &["Ano: 2020", "Quilómetros: 60000 km", "Modelo: Clio"],
            )
    }

    async fn run(h: &Harness, accessor: &FakeAccessor, url: &str, label: Label) -> AttemptOutcome {
        let request = Request::new(url, label).unwrap();
        let mut session = accessor.session(url).await;
        let outcome = h.handler.handle(&mut session, &request).await;
        session.close().await;
        outcome
    }

    #[tokio::test]
    async fn test_list_page_enqueues_items_and_next_page() {
        let h = harness();
        let accessor = FakeAccessor::new().with_page(
            LIST_URL,
            list_page(
                &[
                    "https://www.example.com/d/anuncio/a-ID1.html",
                    "https://www.example.com/d/anuncio/b-ID2.html",
                    "https://www.example.com/d/anuncio/c-ID3.html",
                ],
                Some("https://www.example.com/carros/?page=2"),
            ),
        );

        let outcome = run(&h, &accessor, LIST_URL, Label::List).await;

        assert_eq!(outcome, AttemptOutcome::Success);
        assert_eq!(h.frontier.len(), 4);
        assert!(h.sink.is_empty());

        let queued = h.frontier.drain_pending();
        let details = queued.iter().filter(|r| r.label == Label::Detail).count();
        let lists: Vec<_> = queued.iter().filter(|r| r.label == Label::List).collect();
        assert_eq!(details, 3);
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].url.as_str(), "https://www.example.com/carros/?page=2");
    }

    #[tokio::test]
    async fn test_last_list_page_enqueues_no_list() {
        let h = harness();
        let accessor = FakeAccessor::new().with_page(
            LIST_URL,
            list_page(&["https://www.example.com/d/anuncio/a-ID1.html"], None),
        );

        let outcome = run(&h, &accessor, LIST_URL, Label::List).await;

        assert!(outcome.is_success());
        let queued = h.frontier.drain_pending();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].label, Label::Detail);
    }

    #[tokio::test]
    async fn test_repeated_item_links_are_enqueued_once() {
        let h = harness();
        let link = "https://www.example.com/d/anuncio/a-ID1.html";
        let accessor = FakeAccessor::new().with_page(LIST_URL, list_page(&[link, link], None));

        run(&h, &accessor, LIST_URL, Label::List).await;

        assert_eq!(h.frontier.len(), 1);
    }

    #[tokio::test]
    async fn test_list_page_without_cards_fails_with_snapshot() {
        let h = harness();
        let accessor = FakeAccessor::new().with_page(LIST_URL, FakePage::new());

        let outcome = run(&h, &accessor, LIST_URL, Label::List).await;

        assert_eq!(
            outcome,
            AttemptOutcome::RecoverableFailure(AttemptFailure::NoCards)
        );
        assert!(h.frontier.is_empty());
        let captured = h.diagnostics.captured();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].reason, "no-cards");
        assert_eq!(captured[0].url, LIST_URL);
    }

    #[tokio::test]
    async fn test_card_wait_is_bounded() {
        let h = harness();
        let selectors = SelectorConfig::default();
        let accessor = FakeAccessor::new().with_page(
            LIST_URL,
            FakePage::new()
                .with_text(&selectors.item_card, "card")
                .with_wait_delay(Duration::from_secs(30)),
        );

        let started = std::time::Instant::now();
        let outcome = run(&h, &accessor, LIST_URL, Label::List).await;

        assert_eq!(
            outcome,
            AttemptOutcome::RecoverableFailure(AttemptFailure::NoCards)
        );
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_detail_page_without_phone_control_uses_fallback() {
        let h = harness();
        let accessor = FakeAccessor::new().with_page(DETAIL_URL, clio_page());

        let outcome = run(&h, &accessor, DETAIL_URL, Label::Detail).await;

        assert_eq!(outcome, AttemptOutcome::Success);
        let records = h.sink.records();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.url, DETAIL_URL);
        assert_eq!(record.title, "Renault Clio 2020");
        assert_eq!(record.price, "8 500 €");
        assert_eq!(record.city, "Aveiro");
        assert_eq!(record.year, "2020");
        assert_eq!(record.mileage, "60000 km");
        assert_eq!(record.model, "Clio");
        assert_eq!(record.phone, "not available");
        assert!(record.is_private_seller);
        assert!(h.frontier.is_empty());
    }

    #[tokio::test]
    async fn test_detail_page_reveals_phone() {
        let h = harness();
        let selectors = SelectorConfig::default();
        let accessor = FakeAccessor::new().with_page(
            DETAIL_URL,
            clio_page().with_reveal(&selectors.phone_button, "Mostrar", " 912 345 678 "),
        );

        let outcome = run(&h, &accessor, DETAIL_URL, Label::Detail).await;

        assert!(outcome.is_success());
        assert_eq!(h.sink.records()[0].phone, "912 345 678");
        assert!(accessor.clicks().contains(&selectors.phone_button));
    }

    #[tokio::test]
    async fn test_failed_phone_click_falls_back() {
        let h = harness();
        let selectors = SelectorConfig::default();
        let accessor = FakeAccessor::new().with_page(
            DETAIL_URL,
            clio_page().with_broken_control(&selectors.phone_button, "Mostrar"),
        );

        let outcome = run(&h, &accessor, DETAIL_URL, Label::Detail).await;

        assert!(outcome.is_success());
        assert_eq!(h.sink.records()[0].phone, "not available");
    }

    #[tokio::test]
    async fn test_stuck_consent_overlay_is_ignored() {
        let h = harness();
        let selectors = SelectorConfig::default();
        let accessor = FakeAccessor::new().with_page(
            DETAIL_URL,
            clio_page().with_broken_control(&selectors.cookie_button, "Aceitar"),
        );

        let outcome = run(&h, &accessor, DETAIL_URL, Label::Detail).await;

        assert!(outcome.is_success());
        assert_eq!(accessor.clicks()[0], selectors.cookie_button);
    }

    #[tokio::test]
    async fn test_detail_page_without_title_fails() {
        let h = harness();
        let selectors = SelectorConfig::default();
        let accessor = FakeAccessor::new().with_page(
            DETAIL_URL,
            FakePage::new().with_text(&selectors.price, "8 500 €"),
        );

        let outcome = run(&h, &accessor, DETAIL_URL, Label::Detail).await;

        assert_eq!(
            outcome,
            AttemptOutcome::RecoverableFailure(AttemptFailure::NoTitle)
        );
        assert!(h.sink.is_empty());
        assert_eq!(h.diagnostics.captured()[0].reason, "no-title");
    }
}
