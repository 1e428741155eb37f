//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use curio::config::{parse_config, Config};
use curio::crawler::{run_crawl, Crawler, ShutdownSignal, StopReason};
use curio::index::{IndexPaths, Indexer, SearchOptions};
use curio::state::{FileStateStore, StateStore};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `base_url` with storage in `dir`
///
/// `crawler_extra` is appended to the `[crawler]` section.
fn create_test_config(base_url: &str, dir: &TempDir, crawler_extra: &str) -> Config {
    let toml = format!(
        r#"
[crawler]
min-delay-ms = 1
max-retries = 2
retry-base-delay-ms = 1
request-timeout-secs = 5
allow-private-hosts = true
{crawler_extra}

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[storage]
state-path = "{state}"
index-path = "{index}"
documents-path = "{documents}"

[[site]]
domain = "127.0.0.1"
seeds = ["{base_url}/"]
"#,
        crawler_extra = crawler_extra,
        state = dir.path().join("state.json").display(),
        index = dir.path().join("index.json").display(),
        documents = dir.path().join("documents.json").display(),
        base_url = base_url,
    );
    parse_config(&toml).expect("Failed to parse test config")
}

fn open_indexer(dir: &TempDir) -> Indexer {
    Indexer::open(IndexPaths::new(
        dir.path().join("index.json"),
        dir.path().join("documents.json"),
    ))
}

fn create_test_crawler(config: Config, dir: &TempDir) -> Crawler {
    Crawler::new(
        config,
        Box::new(FileStateStore::new(dir.path().join("state.json"))),
        open_indexer(dir),
        ShutdownSignal::new(),
    )
    .expect("Failed to create crawler")
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ),
        "text/html",
    )
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page_path: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    mount_page(
        &mock_server,
        "/",
        html_page(
            "Home",
            &format!(
                r#"<p>Welcome to the lighthouse archive.</p>
                <a href="/page1">Page 1</a>
                <a href="{}/page2#section">Page 2</a>
                <a href="http://elsewhere.example/">Elsewhere</a>
                <a href="mailto:keeper@example.com">Mail</a>"#,
                base_url
            ),
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        html_page("Lighthouse Keepers", "<p>Keepers trimmed the lamp wicks nightly.</p>"),
    )
    .await;
    mount_page(
        &mock_server,
        "/page2",
        html_page("Fog Signals", "<p>Fog horns sounded every thirty seconds.</p>"),
    )
    .await;

    let config = create_test_config(&base_url, &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.reason, StopReason::FrontierExhausted);
    assert_eq!(report.documents_indexed, 3);
    assert_eq!(report.requests_made, 3);
    assert_eq!(report.errors, 0);
    assert!(report.stats.rejected >= 1);
    assert_eq!(report.stats.max_depth_reached, 1);

    let indexer = crawler.indexer();
    assert_eq!(indexer.len(), 3);
    assert!(indexer.has_document(&format!("{}/page2", base_url)));

    let response = indexer.search("keepers", &SearchOptions::default());
    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].title, "Lighthouse Keepers");
    assert_eq!(response.results[0].domain, "127.0.0.1");

    // Final checkpoint wrote everything
    assert!(dir.path().join("state.json").exists());
    assert_eq!(open_indexer(&dir).len(), 3);
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nDisallow: /admin").await;
    mount_page(
        &mock_server,
        "/",
        html_page(
            "Home",
            r#"<a href="/allowed">Allowed Page</a><a href="/admin">Admin Page</a>"#,
        ),
    )
    .await;
    mount_page(&mock_server, "/allowed", html_page("Allowed", "<p>Allowed content</p>")).await;
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(html_page("Admin", "<p>Secret</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.stats.robots_blocked, 1);
    assert_eq!(report.documents_indexed, 2);
    assert!(!crawler
        .indexer()
        .has_document(&format!("{}/admin", mock_server.uri())));
}

#[tokio::test]
async fn test_missing_robots_is_permissive() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // No robots.txt mock: wiremock answers 404
    mount_page(&mock_server, "/", html_page("Home", "<p>Open to all</p>")).await;

    let config = create_test_config(&mock_server.uri(), &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.documents_indexed, 1);
    assert_eq!(report.stats.robots_blocked, 0);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Recovered", "<p>Back online</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.documents_indexed, 1);
    assert_eq!(report.errors, 0);
}

#[tokio::test]
async fn test_rate_limited_honours_retry_after() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", html_page("Home", "<p>Patience pays</p>")).await;

    let config = create_test_config(&mock_server.uri(), &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let started = std::time::Instant::now();
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.documents_indexed, 1);
    assert!(started.elapsed() >= std::time::Duration::from_secs(1));
}

#[tokio::test]
async fn test_not_found_is_terminal() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.reason, StopReason::FrontierExhausted);
    assert_eq!(report.documents_indexed, 0);
    assert_eq!(report.errors, 1);

    let failed = &crawler.state().failed[&format!("{}/", mock_server.uri())];
    assert_eq!(failed.error, "HTTP 404");
}

#[tokio::test]
async fn test_non_html_is_skipped() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    mount_page(
        &mock_server,
        "/",
        html_page("Home", r#"<a href="/document.pdf">PDF Document</a>"#),
    )
    .await;
    mount_page(
        &mock_server,
        "/document.pdf",
        ResponseTemplate::new(200).set_body_raw(vec![0x25, 0x50, 0x44, 0x46], "application/pdf"),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.documents_indexed, 1);
    assert_eq!(report.errors, 0);
}

#[tokio::test]
async fn test_redirect_final_url_is_document_key() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    mount_page(
        &mock_server,
        "/",
        ResponseTemplate::new(301).insert_header("Location", format!("{}/welcome", base_url).as_str()),
    )
    .await;
    mount_page(&mock_server, "/welcome", html_page("Welcome", "<p>You made it</p>")).await;

    let config = create_test_config(&base_url, &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.documents_indexed, 1);
    assert!(crawler
        .indexer()
        .has_document(&format!("{}/welcome", base_url)));
    assert!(crawler.state().is_seen(&format!("{}/welcome", base_url)));
}

#[tokio::test]
async fn test_redirect_off_whitelist_is_refused() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "http://elsewhere.example/landing"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.documents_indexed, 0);
    assert_eq!(report.errors, 1);
}

#[tokio::test]
async fn test_depth_limit() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    mount_page(&mock_server, "/", html_page("Root", r#"<a href="/one">One</a>"#)).await;
    mount_page(&mock_server, "/one", html_page("One", r#"<a href="/two">Two</a>"#)).await;
    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(html_page("Two", "<p>Too deep</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir, "max-depth = 1");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.documents_indexed, 2);
    assert_eq!(report.stats.max_depth_reached, 1);
}

#[tokio::test]
async fn test_resume_after_document_cap() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    // Robots is cached in the crawl state, so the second run reuses it
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<a href="/page1">Page 1</a><a href="/page2">Page 2</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/page1", html_page("Page 1", "<p>First</p>")).await;
    mount_page(&mock_server, "/page2", html_page("Page 2", "<p>Second</p>")).await;

    let capped = create_test_config(&base_url, &dir, "max-documents = 1");
    let report = run_crawl(capped, Some("first".to_string()), false, ShutdownSignal::new())
        .await
        .expect("First crawl failed");
    assert_eq!(report.reason, StopReason::DocumentCap(1));

    let saved = FileStateStore::new(dir.path().join("state.json"))
        .load()
        .unwrap()
        .expect("State was not saved");
    assert_eq!(saved.queue.len(), 2);
    assert_eq!(saved.config_hash.as_deref(), Some("first"));

    let uncapped = create_test_config(&base_url, &dir, "");
    let report = run_crawl(uncapped, Some("second".to_string()), false, ShutdownSignal::new())
        .await
        .expect("Resumed crawl failed");

    assert_eq!(report.reason, StopReason::FrontierExhausted);
    assert_eq!(report.documents_indexed, 2);
    assert_eq!(report.stats.documents_indexed, 3);
    assert_eq!(open_indexer(&dir).len(), 3);
}

#[tokio::test]
async fn test_fresh_discards_previous_crawl() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<p>Hello again</p>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &dir, "");
    run_crawl(config.clone(), None, false, ShutdownSignal::new())
        .await
        .unwrap();

    // Without --fresh the seed is already seen and nothing is fetched
    let report = run_crawl(config.clone(), None, false, ShutdownSignal::new())
        .await
        .unwrap();
    assert_eq!(report.requests_made, 0);

    let report = run_crawl(config, None, true, ShutdownSignal::new())
        .await
        .unwrap();
    assert_eq!(report.requests_made, 1);
    assert_eq!(report.stats.documents_indexed, 1);
}

#[tokio::test]
async fn test_corrupt_state_is_set_aside() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("state.json"), b"{ definitely not json").unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    mount_page(&mock_server, "/", html_page("Home", "<p>Fresh start</p>")).await;

    let config = create_test_config(&mock_server.uri(), &dir, "");
    let report = run_crawl(config, None, false, ShutdownSignal::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.documents_indexed, 1);
    assert_eq!(
        fs::read(dir.path().join("state.json.corrupt")).unwrap(),
        b"{ definitely not json"
    );
}

#[tokio::test]
async fn test_shutdown_keeps_frontier() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", "<p>Never fetched</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let shutdown = ShutdownSignal::new();
    shutdown.trigger();

    let config = create_test_config(&mock_server.uri(), &dir, "");
    let report = run_crawl(config, None, false, shutdown)
        .await
        .expect("Crawl failed");
    assert_eq!(report.reason, StopReason::Shutdown);

    let saved = FileStateStore::new(dir.path().join("state.json"))
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(saved.queue.len(), 1);
}

#[tokio::test]
async fn test_robots_fetch_respects_host_delay() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nAllow: /").await;
    mount_page(&mock_server, "/", html_page("Home", "<p>Single page</p>")).await;

    let mut config = create_test_config(&mock_server.uri(), &dir, "");
    config.crawler.min_delay_ms = 400;
    let mut crawler = create_test_crawler(config, &dir);

    let started = std::time::Instant::now();
    let report = crawler.crawl().await.expect("Crawl failed");

    // robots.txt and the page are two requests to one host
    assert_eq!(report.documents_indexed, 1);
    assert!(started.elapsed() >= std::time::Duration::from_millis(400));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_redirect_into_disallowed_path_is_blocked() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_robots(&mock_server, "User-agent: *\nDisallow: /private").await;
    mount_page(
        &mock_server,
        "/",
        ResponseTemplate::new(301).insert_header("Location", format!("{}/private/x", base_url).as_str()),
    )
    .await;
    mount_page(&mock_server, "/private/x", html_page("Private", "<p>Members only</p>")).await;

    let config = create_test_config(&base_url, &dir, "");
    let mut crawler = create_test_crawler(config, &dir);
    let report = crawler.crawl().await.expect("Crawl failed");

    assert_eq!(report.documents_indexed, 0);
    assert_eq!(report.stats.robots_blocked, 1);
    assert!(!crawler
        .indexer()
        .has_document(&format!("{}/private/x", base_url)));
    assert!(crawler.state().is_seen(&format!("{}/private/x", base_url)));
}
