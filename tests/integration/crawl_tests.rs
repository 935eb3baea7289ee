//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing and detail pages and run the
//! full crawl cycle end-to-end through the HTTP accessor.

use listing_harvester::config::{parse_config, Config};
use listing_harvester::crawler::{run_crawl, Label, Request};
use listing_harvester::output::{load_checkpoint, save_checkpoint};
use listing_harvester::{ConfigError, Record};
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a test configuration seeded with `seed` and writing under `dir`
fn create_test_config(seed: &str, dir: &Path, format: &str) -> Config {
    let records = match format {
        "sqlite" => dir.join("records.db"),
        _ => dir.join("records.jsonl"),
    };
    parse_config(&format!(
        r#"
seeds = ["{seed}"]

[crawler]
max-concurrency = 3
max-retries = 1
navigation-timeout-secs = 5
wait-timeout-ms = 500
phone-settle-ms = 10
cookie-settle-ms = 10

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[output]
format = "{format}"
records-path = "{records}"
diagnostics-dir = "{diagnostics}"
checkpoint-path = "{checkpoint}"
"#,
        seed = seed,
        format = format,
        records = records.display(),
        diagnostics = dir.join("diagnostics").display(),
        checkpoint = dir.join("checkpoint.json").display(),
    ))
    .expect("Failed to build test config")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn listing_page(items: &[&str], next: Option<&str>) -> ResponseTemplate {
    let mut body = String::new();
    for item in items {
        body.push_str(&format!(
            r#"<div data-cy="l-card"><a href="{}"><h6>Anúncio</h6></a></div>"#,
            item
        ));
    }
    if let Some(next) = next {
        body.push_str(&format!(
            r#"<a data-testid="pagination-forward" href="{}">Seguinte</a>"#,
            next
        ));
    }
    html(body)
}

fn detail_page(title: &str, price: &str, parameters: &[&str]) -> ResponseTemplate {
    let parameters: String = parameters
        .iter()
        .map(|p| format!("<li><p>{}</p></li>", p))
        .collect();
    html(format!(
        r#"
        <h1> {title} </h1>
        <div data-testid="ad-price-container"><h3>{price}</h3></div>
        <div data-cy="ad_description"><div>Carro bem estimado.</div></div>
        <span data-testid="location-date">Aveiro - Hoje às 10:15</span>
        <ul data-testid="main-parameters">{parameters}</ul>
        <h4 data-testid="user-profile-user-name">Rui</h4>
        <button data-testid="show-phone">Mostrar</button>
        "#,
        title = title,
        price = price,
        parameters = parameters,
    ))
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn read_records(path: &Path) -> Vec<Record> {
    std::fs::read_to_string(path)
        .expect("Failed to read records")
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid record line"))
        .collect()
}

#[tokio::test]
async fn test_full_crawl_follows_pagination_and_details() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount(
        &server,
        "/carros/",
        listing_page(
            &["/d/anuncio/clio-ID1.html", "/d/anuncio/golf-ID2.html"],
            Some("/carros/pagina-2/"),
        ),
    )
    .await;
    mount(
        &server,
        "/carros/pagina-2/",
        // Repeats a card from the first page, which must not be visited twice.
        listing_page(&["/d/anuncio/clio-ID1.html", "/d/anuncio/208-ID3.html"], None),
    )
    .await;
    mount(
        &server,
        "/d/anuncio/clio-ID1.html",
        detail_page(
            "Renault Clio 2020",
            "8 500 €",
            &["Ano: 2020", "Quilómetros: 60000 km", "Modelo: Clio"],
        ),
    )
    .await;
    mount(
        &server,
        "/d/anuncio/golf-ID2.html",
        detail_page("VW Golf", "12 000 €", &["Ano: 2019"]),
    )
    .await;
    mount(
        &server,
        "/d/anuncio/208-ID3.html",
        detail_page("Peugeot 208", "9 900 €", &[]),
    )
    .await;

    let seed = format!("{}/carros/", server.uri());
    let config = create_test_config(&seed, dir.path(), "jsonl");

    let report = run_crawl(&config, true, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert!(report.is_complete());
    assert_eq!(report.stats.records_emitted, 3);
    assert_eq!(report.stats.list_enqueued, 1);
    assert_eq!(report.stats.detail_enqueued, 3);
    assert_eq!(report.stats.permanent_failures, 0);

    let mut records = read_records(&dir.path().join("records.jsonl"));
    records.sort_by(|a, b| a.title.cmp(&b.title));
    assert_eq!(records.len(), 3);

    let clio = &records[1];
    assert_eq!(clio.title, "Renault Clio 2020");
    assert_eq!(clio.url, format!("{}/d/anuncio/clio-ID1.html", server.uri()));
    assert_eq!(clio.price, "8 500 €");
    assert_eq!(clio.city, "Aveiro");
    assert_eq!(clio.year, "2020");
    assert_eq!(clio.mileage, "60000 km");
    assert_eq!(clio.model, "Clio");
    assert_eq!(clio.seller, "Rui");
    assert_eq!(clio.description, "Carro bem estimado.");
    // Static pages cannot run the reveal script.
    assert_eq!(clio.phone, "not available");
    assert!(clio.is_private_seller);

    let peugeot = &records[0];
    assert_eq!(peugeot.title, "Peugeot 208");
    assert_eq!(peugeot.year, "");
    assert_eq!(peugeot.model, "");

    assert!(!dir.path().join("checkpoint.json").exists());
}

#[tokio::test]
async fn test_failing_pages_are_retried_then_abandoned() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount(
        &server,
        "/carros/",
        listing_page(&["/d/anuncio/ok-ID1.html", "/d/anuncio/broken-ID2.html"], None),
    )
    .await;
    mount(
        &server,
        "/d/anuncio/ok-ID1.html",
        detail_page("Seat Ibiza", "7 000 €", &[]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/d/anuncio/broken-ID2.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let seed = format!("{}/carros/", server.uri());
    let config = create_test_config(&seed, dir.path(), "jsonl");

    let report = run_crawl(&config, true, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert!(report.is_complete());
    assert_eq!(report.stats.records_emitted, 1);
    assert_eq!(report.stats.retries, 1);
    assert_eq!(report.stats.permanent_failures, 1);

    assert_eq!(report.diagnostics.len(), 1);
    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.label, "DETAIL");
    assert!(diagnostic.reason.contains("503"));
    assert!(diagnostic.path.as_ref().unwrap().exists());

    assert_eq!(read_records(&dir.path().join("records.jsonl")).len(), 1);
}

#[tokio::test]
async fn test_listing_without_cards_captures_markup() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount(
        &server,
        "/carros/",
        html("<p>Pedimos desculpa, algo correu mal.</p>".to_string()),
    )
    .await;

    let seed = format!("{}/carros/", server.uri());
    let config = create_test_config(&seed, dir.path(), "jsonl");

    let report = run_crawl(&config, true, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.stats.attempts, 2);
    assert_eq!(report.stats.permanent_failures, 1);
    assert_eq!(report.diagnostics.len(), 2);

    let snapshot = std::fs::read_to_string(report.diagnostics[0].path.as_ref().unwrap()).unwrap();
    assert!(snapshot.contains("algo correu mal"));
}

#[tokio::test]
async fn test_cancelled_crawl_saves_checkpoint_and_resumes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount(
        &server,
        "/carros/",
        listing_page(&["/d/anuncio/clio-ID1.html"], None),
    )
    .await;
    mount(
        &server,
        "/d/anuncio/clio-ID1.html",
        detail_page("Renault Clio 2020", "8 500 €", &[]),
    )
    .await;

    let seed = format!("{}/carros/", server.uri());
    let config = create_test_config(&seed, dir.path(), "jsonl");
    let checkpoint = dir.path().join("checkpoint.json");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = run_crawl(&config, true, cancel).await.expect("Crawl failed");

    assert!(!report.is_complete());
    let saved = load_checkpoint(&checkpoint).unwrap().expect("checkpoint saved");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].label, Label::List);

    let report = run_crawl(&config, true, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert!(report.is_complete());
    assert_eq!(report.stats.records_emitted, 1);
    assert!(!checkpoint.exists());
}

#[tokio::test]
async fn test_resume_starts_from_checkpoint_not_seeds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount(
        &server,
        "/d/anuncio/golf-ID2.html",
        detail_page("VW Golf", "12 000 €", &["Ano: 2019"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/carros/"))
        .respond_with(listing_page(&[], None))
        .expect(0)
        .mount(&server)
        .await;

    let seed = format!("{}/carros/", server.uri());
    let config = create_test_config(&seed, dir.path(), "sqlite");
    let detail = Request::new(
        &format!("{}/d/anuncio/golf-ID2.html", server.uri()),
        Label::Detail,
    )
    .unwrap();
    save_checkpoint(&dir.path().join("checkpoint.json"), &[detail]).unwrap();

    let report = run_crawl(&config, true, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert!(report.is_complete());
    assert_eq!(report.stats.records_emitted, 1);

    let conn = rusqlite::Connection::open(dir.path().join("records.db")).unwrap();
    let (titulo, ano): (String, String) = conn
        .query_row("SELECT titulo, ano FROM records", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(titulo, "VW Golf");
    assert_eq!(ano, "2019");
}

#[tokio::test]
async fn test_required_proxy_without_urls_aborts_startup() {
    let result = parse_config(
        r#"
[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[proxy]
required = true

[output]
records-path = "./records.jsonl"
"#,
    );

    assert!(matches!(result, Err(ConfigError::Egress(_))));
}
