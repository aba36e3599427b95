//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use futures::future::join_all;
use quote_harvest::config::{
    BackoffStrategy, Config, CrawlerConfig, OutputConfig, RetryConfig, UserAgentConfig,
};
use quote_harvest::crawler::{
    build_http_client, Coordinator, DetailResolver, ErrorKind, FetchErrorKind, Fetcher, Phase,
    Scheduler,
};
use quote_harvest::state::RunCounters;
use quote_harvest::{HarvestError, Reference};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: format!("{}/", base_url),
            request_timeout_ms: 2_000,
            max_concurrent_requests: 4,
            rate_limit_delay_ms: 0,
            max_pages: 50,
        },
        retry: RetryConfig {
            attempts: 3,
            strategy: BackoffStrategy::Linear,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/bot".to_string(),
            header: None,
        },
        output: OutputConfig::default(),
    }
}

struct Quote<'a> {
    text: &'a str,
    author: &'a str,
    slug: Option<&'a str>,
    tags: &'a [&'a str],
}

fn quote<'a>(text: &'a str, author: &'a str, slug: Option<&'a str>) -> Quote<'a> {
    Quote {
        text,
        author,
        slug,
        tags: &[],
    }
}

fn listing_html(quotes: &[Quote<'_>], next: Option<&str>) -> String {
    let mut html = String::from("<html><body><div class=\"col-md-8\">");
    for q in quotes {
        html.push_str("<div class=\"quote\">");
        html.push_str(&format!("<span class=\"text\">{}</span>", q.text));
        html.push_str(&format!(
            "<span>by <small class=\"author\">{}</small>",
            q.author
        ));
        if let Some(slug) = q.slug {
            html.push_str(&format!(" <a href=\"/author/{}\">(about)</a>", slug));
        }
        html.push_str("</span><div class=\"tags\">Tags:");
        for tag in q.tags {
            html.push_str(&format!(" <a class=\"tag\" href=\"/tag/{0}/\">{0}</a>", tag));
        }
        html.push_str("</div></div>");
    }
    if let Some(next) = next {
        html.push_str(&format!(
            "<nav><ul class=\"pager\"><li class=\"next\"><a href=\"{}\">Next</a></li></ul></nav>",
            next
        ));
    }
    html.push_str("</div></body></html>");
    html
}

fn author_html(name: &str, born: &str, location: &str) -> String {
    format!(
        r#"<html><body><div class="author-details">
        <h3 class="author-title">{}</h3>
        <p><strong>Born:</strong> <span class="author-born-date">{}</span>
        <span class="author-born-location">{}</span></p>
        </div></body></html>"#,
        name, born, location
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_author(server: &MockServer, slug: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/author/{}", slug)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(author_html(slug, "January 1, 1900", "in Nowhere"))
                .set_delay(delay),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_page_crawl_fetches_each_author_once() {
    let server = MockServer::start().await;

    let page1 = listing_html(
        &[
            Quote {
                text: "“A”",
                author: "Albert Einstein",
                slug: Some("Albert-Einstein"),
                tags: &["change", "thinking"],
            },
            quote("“B”", "Jane Austen", Some("Jane-Austen")),
        ],
        Some("/page/2/"),
    );
    let page2 = listing_html(&[quote("“C”", "Albert Einstein", Some("Albert-Einstein"))], None);

    mount_page(&server, "/", page1, 1).await;
    mount_page(&server, "/page/2/", page2, 1).await;
    mount_page(
        &server,
        "/author/Albert-Einstein",
        author_html("Albert Einstein", "March 14, 1879", "in Ulm, Germany"),
        1,
    )
    .await;
    mount_page(
        &server,
        "/author/Jane-Austen",
        author_html("Jane Austen", "December 16, 1775", "in Steventon Rectory, Hampshire, The United Kingdom"),
        1,
    )
    .await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri()), CancellationToken::new()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert!(!report.cancelled);
    assert!(report.diagnostics.is_empty());

    let texts: Vec<&str> = report.records.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["“A”", "“B”", "“C”"]);
    assert_eq!(report.records[0].tags, vec!["change", "thinking"]);

    let einstein = report.records[2].author().unwrap();
    assert_eq!(einstein.full_name, "Albert Einstein");
    assert_eq!(einstein.date_of_birth, "March 14, 1879");
    assert_eq!(einstein.place_of_birth, "in Ulm, Germany");
    assert_eq!(report.records[0].author(), report.records[2].author());
    assert_eq!(
        report.records[1].author().unwrap().full_name,
        "Jane Austen"
    );

    assert_eq!(report.statistics.pages_fetched, 2);
    assert_eq!(report.statistics.detail_fetches, 2);
    assert_eq!(report.statistics.requests, 4);
    assert_eq!(report.statistics.retries, 0);
    assert_eq!(report.statistics.records, 3);
}

#[tokio::test]
async fn test_concurrent_resolves_share_one_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/author/Jane-Austen"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(author_html("Jane Austen", "December 16, 1775", "in Steventon"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let client = build_http_client(&config.crawler, &config.user_agent).unwrap();
    let fetcher = Fetcher::new(
        client,
        Scheduler::new(4, Duration::ZERO, CancellationToken::new()),
        config.retry.clone(),
        Arc::new(RunCounters::new()),
    );
    let resolver = DetailResolver::new(fetcher.clone());
    let reference = Reference::parse(&format!("{}/author/Jane-Austen", server.uri())).unwrap();

    let outcomes = join_all((0..20).map(|_| {
        let resolver = resolver.clone();
        let reference = reference.clone();
        async move { resolver.resolve(&reference).await }
    }))
    .await;

    let first = outcomes[0].as_ref().unwrap().clone();
    for outcome in &outcomes {
        assert_eq!(outcome.as_ref().unwrap(), &first);
    }
    assert_eq!(first.full_name, "Jane Austen");
    assert_eq!(resolver.len(), 1);
    assert_eq!(resolver.state_of(&reference), Some("resolved"));

    let counters = fetcher.counters().snapshot();
    assert_eq!(counters.detail_fetches, 1);
    assert_eq!(counters.requests, 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        listing_html(&[quote("“Only”", "Anon", None)], None),
        1,
    )
    .await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri()), CancellationToken::new()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].author().is_none());
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.statistics.requests, 3);
    assert_eq!(report.statistics.retries, 2);
    assert_eq!(report.statistics.non_success_responses, 2);
}

#[tokio::test]
async fn test_retry_exhaustion_is_fatal_for_listing_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri()), CancellationToken::new()).unwrap();
    let result = coordinator.run().await;

    match result {
        Err(HarvestError::PageFetch {
            source,
            pages_completed,
            records_accumulated,
            ..
        }) => {
            assert_eq!(source.kind, FetchErrorKind::Transient);
            assert_eq!(source.attempts, 3);
            assert_eq!(pages_completed, 0);
            assert_eq!(records_accumulated, 0);
        }
        other => panic!("expected PageFetch error, got {:?}", other.map(|r| r.records.len())),
    }
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing_html(&[quote("“First”", "Anon", None)], Some("/page/2/")),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page/2/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri()), CancellationToken::new()).unwrap();
    let result = coordinator.run().await;

    match result {
        Err(HarvestError::PageFetch {
            url,
            source,
            pages_completed,
            records_accumulated,
        }) => {
            assert!(url.ends_with("/page/2/"));
            assert_eq!(source.kind, FetchErrorKind::Permanent { status: Some(404) });
            assert_eq!(source.attempts, 1);
            assert_eq!(pages_completed, 1);
            assert_eq!(records_accumulated, 1);
        }
        other => panic!("expected PageFetch error, got {:?}", other.map(|r| r.records.len())),
    }
    assert_eq!(coordinator.context().counters().snapshot().retries, 0);
}

#[tokio::test]
async fn test_failed_detail_is_sticky_and_reported_once() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing_html(
            &[
                quote("“One”", "Ghost Writer", Some("Ghost-Writer")),
                quote("“Two”", "Ghost Writer", Some("Ghost-Writer")),
            ],
            Some("/page/2/"),
        ),
        1,
    )
    .await;
    mount_page(
        &server,
        "/page/2/",
        listing_html(&[quote("“Three”", "Ghost Writer", Some("Ghost-Writer"))], None),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/author/Ghost-Writer"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri()), CancellationToken::new()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.records.len(), 3);
    assert!(report.records.iter().all(|r| r.author().is_none()));
    assert_eq!(report.records[0].author_name, "Ghost Writer");

    assert_eq!(report.diagnostics.len(), 1);
    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.phase, Phase::Detail);
    assert_eq!(diagnostic.kind, ErrorKind::PermanentHttp);
    assert!(diagnostic.reference.ends_with("/author/Ghost-Writer"));

    assert_eq!(report.statistics.detail_fetches, 1);
}

#[tokio::test]
async fn test_unparseable_detail_page_is_a_parse_diagnostic() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing_html(&[quote("“Q”", "Nobody", Some("Nobody"))], None),
        1,
    )
    .await;
    mount_page(
        &server,
        "/author/Nobody",
        "<html><body><p>moved</p></body></html>".to_string(),
        1,
    )
    .await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri()), CancellationToken::new()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].author().is_none());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, ErrorKind::Parse);
}

#[tokio::test]
async fn test_revisit_guard_stops_pagination() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing_html(&[quote("“Loop”", "Anon", None)], Some("/")),
        1,
    )
    .await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri()), CancellationToken::new()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.statistics.pages_fetched, 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, ErrorKind::Pagination);
}

#[tokio::test]
async fn test_page_limit_stops_pagination() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing_html(&[quote("“First”", "Anon", None)], Some("/page/2/")),
        1,
    )
    .await;
    mount_page(&server, "/page/2/", listing_html(&[], None), 0).await;

    let mut config = create_test_config(&server.uri());
    config.crawler.max_pages = 1;

    let coordinator = Coordinator::new(config, CancellationToken::new()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].kind, ErrorKind::Pagination);
    assert!(report.diagnostics[0].reference.ends_with("/page/2/"));
}

#[tokio::test]
async fn test_pre_cancelled_run_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();

    let coordinator = Coordinator::new(create_test_config(&server.uri()), token).unwrap();
    let report = coordinator.run().await.unwrap();

    assert!(report.cancelled);
    assert!(report.records.is_empty());
    assert_eq!(report.statistics.requests, 0);
}

#[tokio::test]
async fn test_cancellation_interrupts_retry_backoff() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.retry.base_delay_ms = 30_000;
    config.retry.max_delay_ms = 30_000;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let coordinator = Coordinator::new(config, token).unwrap();
    let report = tokio::time::timeout(Duration::from_secs(5), coordinator.run())
        .await
        .expect("cancellation should end the backoff sleep")
        .unwrap();

    assert!(report.cancelled);
    assert!(report.records.is_empty());
    assert_eq!(report.statistics.requests, 1);
}

#[tokio::test]
async fn test_user_agent_header_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestBot/1.0.0 (+https://example.com/bot)"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_html(&[quote("“Hi”", "Anon", None)], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri()), CancellationToken::new()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_record_order_ignores_detail_latency() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing_html(
            &[
                quote("one", "Slow", Some("Slow")),
                quote("two", "Fast", Some("Fast")),
                quote("three", "Mid", Some("Mid")),
            ],
            None,
        ),
        1,
    )
    .await;
    mount_author(&server, "Slow", Duration::from_millis(400)).await;
    mount_author(&server, "Fast", Duration::ZERO).await;
    mount_author(&server, "Mid", Duration::from_millis(150)).await;

    let coordinator =
        Coordinator::new(create_test_config(&server.uri()), CancellationToken::new()).unwrap();
    let report = coordinator.run().await.unwrap();

    let order: Vec<(&str, Option<&str>)> = report
        .records
        .iter()
        .map(|r| (r.text.as_str(), r.author().map(|a| a.full_name.as_str())))
        .collect();
    assert_eq!(
        order,
        vec![
            ("one", Some("Slow")),
            ("two", Some("Fast")),
            ("three", Some("Mid")),
        ]
    );
}

#[tokio::test]
async fn test_cancellation_during_detail_fan_out_drops_page() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing_html(&[quote("one", "Fast", Some("Fast"))], Some("/page/2/")),
        1,
    )
    .await;
    mount_page(
        &server,
        "/page/2/",
        listing_html(
            &[
                quote("two", "Fast", Some("Fast")),
                quote("three", "Slow", Some("Slow")),
            ],
            None,
        ),
        1,
    )
    .await;
    mount_author(&server, "Fast", Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/author/Slow"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.retry.base_delay_ms = 10_000;
    config.retry.max_delay_ms = 10_000;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        trigger.cancel();
    });

    let coordinator = Coordinator::new(config, token).unwrap();
    let report = tokio::time::timeout(Duration::from_secs(5), coordinator.run())
        .await
        .expect("cancellation should end the detail backoff")
        .unwrap();

    assert!(report.cancelled);
    let texts: Vec<&str> = report.records.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["one"]);
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.statistics.pages_fetched, 2);

    let slow = Reference::parse(&format!("{}/author/Slow", server.uri())).unwrap();
    assert_eq!(coordinator.resolver().state_of(&slow), None);
}

#[tokio::test]
async fn test_detail_fetches_share_request_ceiling() {
    let server = MockServer::start().await;

    let slugs = ["A1", "A2", "A3", "A4", "A5", "A6"];
    let quotes: Vec<Quote<'_>> = slugs
        .iter()
        .map(|slug| quote(slug, slug, Some(*slug)))
        .collect();
    mount_page(&server, "/", listing_html(&quotes, None), 1).await;
    for slug in slugs {
        mount_author(&server, slug, Duration::from_millis(200)).await;
    }

    let mut config = create_test_config(&server.uri());
    config.crawler.max_concurrent_requests = 2;

    let coordinator = Coordinator::new(config, CancellationToken::new()).unwrap();
    let started = Instant::now();
    let report = coordinator.run().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.records.len(), 6);
    assert!(report.records.iter().all(|r| r.author().is_some()));
    assert_eq!(report.statistics.detail_fetches, 6);

    // Six 200ms responses through two slots need at least three rounds
    assert!(
        elapsed >= Duration::from_millis(600),
        "details were not held at the ceiling: {:?}",
        elapsed
    );
}
