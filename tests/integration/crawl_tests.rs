//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use async_trait::async_trait;
use gleaner::config::{CrawlConfig, PolitenessConfig};
use gleaner::crawler::FailureKind;
use gleaner::render::{RenderOptions, Renderer};
use gleaner::{CrawlError, Crawler, RenderError, RenderResult};
use std::collections::HashSet;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no politeness delays
fn create_test_config(seed: &str) -> CrawlConfig {
    let mut config = CrawlConfig::new(seed);
    config.politeness = PolitenessConfig {
        parallelism: 1,
        delay_ms: 0,
        random_delay_ms: 0,
        max_concurrency: 4,
    };
    config
}

/// Builds an HTML page with `words` words of main content and the given links
fn html_page(title: &str, words: usize, links: &[&str]) -> String {
    let text = (0..words)
        .map(|i| format!("word{}", i))
        .collect::<Vec<_>>()
        .join(" ");
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();

    format!(
        "<html><head><title>{}</title></head><body>\
         <nav><a href=\"/\">Home</a></nav>\
         <main><p>{}</p></main>{}\
         <footer>Copyright</footer></body></html>",
        title, text, anchors
    )
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_response(body))
        .mount(server)
        .await;
}

/// Renderer returning canned HTML without launching a browser
struct FakeRenderer {
    html: Option<String>,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, url: &str, _options: &RenderOptions) -> RenderResult<String> {
        self.html.clone().ok_or_else(|| RenderError::Navigation {
            url: url.to_string(),
            message: "browser unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn test_single_page_crawl() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", html_page("Home", 40, &["/about"])).await;

    let mut config = create_test_config(&mock_server.uri());
    config.max_pages = 1;

    let crawler = Crawler::new().unwrap();
    let result = crawler.crawl(&config).await.unwrap();

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].url, format!("{}/", mock_server.uri()));
    assert_eq!(result.pages_crawled, 1);
    assert_eq!(result.title, "Home");
    assert!(result.content.contains("word0"));
    assert!(!result.content.contains("Copyright"));
    assert!(result.pages[0].word_count >= 40);
}

#[tokio::test]
async fn test_forbidden_seed_fails_job() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let error = Crawler::new().unwrap().crawl(&config).await.unwrap_err();

    assert!(matches!(error, CrawlError::Blocked { .. }));
    assert!(error.to_string().contains("forbidden"));
}

#[tokio::test]
async fn test_rate_limited_seed_fails_job() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let error = Crawler::new().unwrap().crawl(&config).await.unwrap_err();

    assert!(matches!(error, CrawlError::RateLimited { .. }));
}

#[tokio::test]
async fn test_server_error_seed_fails_job() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let error = Crawler::new().unwrap().crawl(&config).await.unwrap_err();

    assert!(matches!(error, CrawlError::OriginServer { status: 503, .. }));
    assert!(error.to_string().contains("server error"));
}

#[tokio::test]
async fn test_unreachable_seed_fails_job() {
    // Nothing listens on port 9 of the loopback interface
    let config = create_test_config("http://127.0.0.1:9/");
    let result = Crawler::new().unwrap().crawl(&config).await;

    assert!(matches!(
        result,
        Err(CrawlError::SeedFailed { .. }) | Err(CrawlError::Network { .. })
    ));
}

#[tokio::test]
async fn test_thin_seed_is_not_processed() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", html_page("Thin", 5, &[])).await;

    let config = create_test_config(&mock_server.uri());
    let error = Crawler::new().unwrap().crawl(&config).await.unwrap_err();

    assert!(matches!(error, CrawlError::NoPagesProcessed { .. }));
}

#[tokio::test]
async fn test_trailing_slash_variants_fetched_once() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", html_page("Home", 40, &["/x/", "/x", "/x#top"])).await;

    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html_response(html_page("X", 40, &["/x/"])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x/"))
        .respond_with(html_response(html_page("X", 40, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.follow_links = true;

    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    let urls: Vec<_> = result.pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", mock_server.uri()),
            format!("{}/x", mock_server.uri())
        ]
    );
}

#[tokio::test]
async fn test_follow_links_respects_budget() {
    let mock_server = MockServer::start().await;
    let links = ["/a", "/b", "/c", "/d", "/e"];
    mount_page(&mock_server, "/", html_page("Home", 40, &links)).await;
    for link in links {
        mount_page(&mock_server, link, html_page(link, 40, &["/", "/a", "/b"])).await;
    }

    let mut config = create_test_config(&mock_server.uri());
    config.follow_links = true;
    config.max_pages = 3;

    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    assert_eq!(result.pages.len(), 3);
    assert_eq!(result.pages_crawled, 3);
    assert_eq!(result.pages[0].url, format!("{}/", mock_server.uri()));

    let unique: HashSet<_> = result.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(unique.len(), result.pages.len());
}

#[tokio::test]
async fn test_full_site_crawl_without_duplicates() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", html_page("Home", 40, &["/a", "/b"])).await;
    mount_page(&mock_server, "/a", html_page("A", 40, &["/", "/b", "/c/"])).await;
    mount_page(&mock_server, "/b", html_page("B", 40, &["/a", "/c"])).await;
    mount_page(&mock_server, "/c", html_page("C", 40, &["/", "/a/"])).await;

    let mut config = create_test_config(&mock_server.uri());
    config.follow_links = true;

    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    let urls: HashSet<_> = result.pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(result.pages.len(), 4);
    assert_eq!(urls.len(), 4);
    assert!(result.failures.is_empty());
}

#[tokio::test]
async fn test_foreign_and_excluded_links_skipped() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        html_page(
            "Home",
            40,
            &[
                "http://elsewhere.invalid/page",
                "/assets/app.js",
                "/api/items",
                "/docs",
            ],
        ),
    )
    .await;
    mount_page(&mock_server, "/docs", html_page("Docs", 40, &[])).await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(html_response(html_page("Api", 40, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.follow_links = true;

    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    assert_eq!(result.pages.len(), 2);
    assert!(result.pages.iter().all(|p| p.url.starts_with(&mock_server.uri())));
}

#[tokio::test]
async fn test_feed_and_search_endpoints_skipped() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        html_page("Home", 40, &["/feed/", "/blog/feed", "/search?q=rust", "/?s=term", "/api/", "/docs"]),
    )
    .await;
    mount_page(&mock_server, "/docs", html_page("Docs", 40, &[])).await;

    for route in ["/feed", "/feed/", "/blog/feed", "/search", "/api", "/api/"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html_response(html_page("Endpoint", 40, &[])))
            .expect(0)
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config(&mock_server.uri());
    config.follow_links = true;

    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    let urls: Vec<_> = result.pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", mock_server.uri()),
            format!("{}/docs", mock_server.uri())
        ]
    );
}

#[tokio::test]
async fn test_redirected_seed_captured_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/home"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(html_response(html_page("Home", 40, &["/home", "/", "/about"])))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/about", html_page("About", 40, &["/home"])).await;

    let mut config = create_test_config(&mock_server.uri());
    config.follow_links = true;

    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    let urls: Vec<_> = result.pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/home", mock_server.uri()),
            format!("{}/about", mock_server.uri())
        ]
    );
}

#[tokio::test]
async fn test_allowed_paths_restrict_links() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/docs", html_page("Docs", 40, &["/docs/guide", "/blog/post"])).await;
    mount_page(&mock_server, "/docs/guide", html_page("Guide", 40, &[])).await;

    Mock::given(method("GET"))
        .and(path("/blog/post"))
        .respond_with(html_response(html_page("Post", 40, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&format!("{}/docs", mock_server.uri()));
    config.follow_links = true;
    config.allowed_paths = vec!["/docs".to_string()];

    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();
    assert_eq!(result.pages.len(), 2);
}

#[tokio::test]
async fn test_non_html_content_skipped() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", html_page("Home", 40, &["/download"])).await;

    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0u8; 256], "application/octet-stream"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.follow_links = true;

    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages_found, 1);
    assert!(result.failures.is_empty());
}

#[tokio::test]
async fn test_link_failures_are_not_fatal() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", html_page("Home", 40, &["/broken", "/private"])).await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.follow_links = true;

    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    assert_eq!(result.pages.len(), 1);
    let kinds: HashSet<_> = result.failures.iter().map(|f| f.kind).collect();
    assert!(kinds.contains(&FailureKind::OriginServerError));
    assert!(kinds.contains(&FailureKind::Blocked));
}

#[tokio::test]
async fn test_latin1_page_is_transcoded() {
    let mock_server = MockServer::start().await;

    let mut body = b"<html><head><title>Caf\xe9</title></head><body><main><p>".to_vec();
    body.extend_from_slice(b"Le caf\xe9 du coin sert un excellent petit d\xe9jeuner chaque matin, ");
    body.extend_from_slice(b"avec des croissants frais et du pain de campagne.</p></main></body></html>");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=iso-8859-1"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    assert_eq!(result.title, "Café");
    assert!(result.content.contains("déjeuner"));
}

#[tokio::test]
async fn test_rendered_seed_skips_plain_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html_page("Plain", 40, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/next", html_page("Next", 40, &[])).await;

    let mut config = create_test_config(&mock_server.uri());
    config.render_js = true;
    config.follow_links = true;

    let renderer = FakeRenderer {
        html: Some(html_page("Rendered", 40, &["/next"])),
    };
    let crawler = Crawler::new().unwrap().with_renderer(Arc::new(renderer));
    let result = crawler.crawl(&config).await.unwrap();

    assert_eq!(result.title, "Rendered");
    assert_eq!(result.pages.len(), 2);
    assert_eq!(result.pages[1].url, format!("{}/next", mock_server.uri()));
}

#[tokio::test]
async fn test_failed_render_falls_back_to_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html_page("Plain", 40, &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.render_js = true;

    let crawler = Crawler::new()
        .unwrap()
        .with_renderer(Arc::new(FakeRenderer { html: None }));
    let result = crawler.crawl(&config).await.unwrap();

    assert_eq!(result.title, "Plain");
}

#[tokio::test]
async fn test_concurrent_jobs_do_not_share_state() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", html_page("Home", 40, &["/a"])).await;
    mount_page(&mock_server, "/a", html_page("A", 40, &[])).await;

    let mut config = create_test_config(&mock_server.uri());
    config.follow_links = true;

    let crawler = Crawler::new().unwrap();
    let (first, second) = tokio::join!(crawler.crawl(&config), crawler.crawl(&config));

    assert_eq!(first.unwrap().pages.len(), 2);
    assert_eq!(second.unwrap().pages.len(), 2);
}

#[tokio::test]
async fn test_browser_headers_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(wiremock::matchers::header("sec-fetch-mode", "navigate"))
        .and(wiremock::matchers::header(
            "referer",
            format!("{}/", mock_server.uri()).as_str(),
        ))
        .respond_with(html_response(html_page("Home", 40, &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();
    assert_eq!(result.pages.len(), 1);
}

#[tokio::test]
async fn test_products_collected_from_listing() {
    let mock_server = MockServer::start().await;

    let body = r#"<html><head><title>Shop</title></head><body><main>
        <p>Browse our selection of handmade ceramics, glazed and fired in our studio every week.</p>
        <div class="product-card"><h3>Blue Mug</h3><span class="price">$18.00</span><a href="/p/blue-mug">View</a></div>
        <div class="product-card"><h3>Tea Bowl</h3><span class="price">$1,240.50</span><a href="/p/tea-bowl">View</a></div>
        </main></body></html>"#;
    mount_page(&mock_server, "/", body.to_string()).await;

    let config = create_test_config(&mock_server.uri());
    let result = Crawler::new().unwrap().crawl(&config).await.unwrap();

    let names: Vec<_> = result.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Blue Mug", "Tea Bowl"]);
    assert_eq!(result.products[1].price.as_deref(), Some("1240.50"));
}
