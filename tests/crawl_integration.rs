//! End-to-end crawl tests: ping, analyze, and full data collection against a
//! mock API root.

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wparchive_core::{CancelFlag, CrawlConfig, CrawlError, Crawler, RouteCatalog, RouteCategory};

fn test_crawler() -> Crawler {
    let config = CrawlConfig::default()
        .with_force_https(false)
        .with_retry_count(1);
    Crawler::new(config, CancelFlag::new())
}

/// The domain string for a mock server: host and port, no scheme.
fn domain_of(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

fn route_entry(server: &MockServer, route: &str) -> serde_json::Value {
    json!({
        "namespace": route.trim_start_matches('/'),
        "_links": { "self": { "href": format!("{}/wp-json{route}", server.uri()) } }
    })
}

#[tokio::test]
async fn test_ping_reports_route_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Test Site",
            "routes": { "/": {}, "/wp/v2": {}, "/wp/v2/posts": {} }
        })))
        .mount(&server)
        .await;

    let report = test_crawler().ping(&domain_of(&server)).await.unwrap();
    assert_eq!(report.route_count, 3);
    assert!(report.url.ends_with("/wp-json/"));
}

#[tokio::test]
async fn test_ping_rejects_invalid_domain_without_requests() {
    let err = test_crawler().ping("not a domain").await.unwrap_err();
    assert!(matches!(err, CrawlError::Domain(_)));
}

#[tokio::test]
async fn test_ping_surfaces_non_200_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = test_crawler().ping(&domain_of(&server)).await.unwrap_err();
    assert!(matches!(err, CrawlError::IndexStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_ping_surfaces_missing_routes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "no routes" })))
        .mount(&server)
        .await;

    let err = test_crawler().ping(&domain_of(&server)).await.unwrap_err();
    assert!(matches!(err, CrawlError::MissingRoutes { .. }));
}

#[tokio::test]
async fn test_analyze_buckets_known_and_probes_unknown() {
    let server = MockServer::start().await;
    let index = json!({
        "routes": {
            "/wp/v2/posts": route_entry(&server, "/wp/v2/posts"),
            "/wp/v2/settings": route_entry(&server, "/wp/v2/settings"),
            "/custom/v1/secrets": route_entry(&server, "/custom/v1/secrets"),
        }
    });
    Mock::given(method("GET"))
        .and(path("/wp-json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(index))
        .mount(&server)
        .await;
    // The probe for the uncataloged route answers 401.
    Mock::given(method("GET"))
        .and(path("/wp-json/custom/v1/secrets"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let catalog = RouteCatalog::builtin();
    let report = test_crawler()
        .analyze(&domain_of(&server), &catalog)
        .await
        .unwrap();

    assert_eq!(report.total_routes, 3);
    assert_eq!(
        report.known.get("/wp/v2/posts"),
        Some(&RouteCategory::PublicList)
    );
    assert_eq!(
        report.known.get("/wp/v2/settings"),
        Some(&RouteCategory::Protected)
    );
    assert_eq!(report.unknown_routes, vec!["/custom/v1/secrets".to_string()]);
    assert_eq!(
        report.resolved.get("/custom/v1/secrets"),
        Some(&RouteCategory::Protected)
    );
    assert_eq!(report.statistics.protected, 2);
    assert_eq!(report.statistics.public_list, 1);
    assert!(report.catalog_update.contains("/custom/v1/secrets"));
}

#[tokio::test]
async fn test_collect_data_extracts_public_routes() {
    let server = MockServer::start().await;
    let index = json!({
        "routes": {
            "/wp/v2/posts": route_entry(&server, "/wp/v2/posts"),
            "/wp/v2/types": route_entry(&server, "/wp/v2/types"),
            "/wp/v2/settings": route_entry(&server, "/wp/v2/settings"),
            "/custom/v1/things": route_entry(&server, "/custom/v1/things"),
        }
    });
    Mock::given(method("GET"))
        .and(path("/wp-json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(index))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-WP-TotalPages", "1")
                .set_body_json(json!([{ "id": 1 }, { "id": 2 }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "post": {}, "page": {} })))
        .mount(&server)
        .await;
    // Serves both the classification probe and the page requests.
    Mock::given(method("GET"))
        .and(path("/wp-json/custom/v1/things"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 7 }])))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let catalog = RouteCatalog::builtin();
    let stats = test_crawler()
        .collect_data(&domain_of(&server), &catalog, out.path(), true)
        .await
        .unwrap();

    assert_eq!(stats.total_routes, 4);
    assert_eq!(stats.processed, 3);
    assert_eq!(stats.skipped, 1); // the protected settings route
    assert_eq!(
        stats.resolved.get("/custom/v1/things"),
        Some(&RouteCategory::PublicList)
    );

    let data = out.path().join("data");
    assert!(data.join("wp-json.json").exists());

    let posts = std::fs::read_to_string(data.join("wp_v2_posts.jsonl")).unwrap();
    assert_eq!(posts.lines().count(), 2);
    let types = std::fs::read_to_string(data.join("wp_v2_types.jsonl")).unwrap();
    assert_eq!(types.lines().count(), 1);
    let things = std::fs::read_to_string(data.join("custom_v1_things.jsonl")).unwrap();
    assert_eq!(things.lines().count(), 1);
    assert!(!data.join("wp_v2_settings.jsonl").exists());
}

#[tokio::test]
async fn test_collect_data_skips_unknown_routes_when_disabled() {
    let server = MockServer::start().await;
    let index = json!({
        "routes": {
            "/custom/v1/things": route_entry(&server, "/custom/v1/things"),
        }
    });
    Mock::given(method("GET"))
        .and(path("/wp-json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(index))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let catalog = RouteCatalog::builtin();
    let stats = test_crawler()
        .collect_data(&domain_of(&server), &catalog, out.path(), false)
        .await
        .unwrap();

    assert_eq!(stats.processed, 0);
    assert_eq!(stats.skipped, 1);
    // Only the index itself was fetched.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_collect_data_scopes_route_failure_to_that_route() {
    let server = MockServer::start().await;
    let index = json!({
        "routes": {
            "/wp/v2/posts": route_entry(&server, "/wp/v2/posts"),
            "/wp/v2/tags": route_entry(&server, "/wp/v2/tags"),
        }
    });
    Mock::given(method("GET"))
        .and(path("/wp-json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(index))
        .mount(&server)
        .await;
    // Posts fails hard; tags succeeds.
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let catalog = RouteCatalog::builtin();
    let stats = test_crawler()
        .collect_data(&domain_of(&server), &catalog, out.path(), false)
        .await
        .unwrap();

    // Both routes count as processed; the failed one is just incomplete.
    assert_eq!(stats.processed, 2);
    let tags = std::fs::read_to_string(out.path().join("data/wp_v2_tags.jsonl")).unwrap();
    assert_eq!(tags.lines().count(), 1);
}
