//! Integration tests for probe-based route classification.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wparchive_core::crawler::RouteClassifier;
use wparchive_core::{ApiClient, CancelFlag, CrawlConfig, RouteCategory};

fn test_client() -> ApiClient {
    ApiClient::new(
        &CrawlConfig::default().with_retry_count(1),
        CancelFlag::new(),
    )
}

#[tokio::test]
async fn test_list_body_classifies_public_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/custom/v1/things"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "id": 1 }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client();
    let classifier = RouteClassifier::new(&client);
    let url = format!("{}/wp-json/custom/v1/things", server.uri());
    let category = classifier.classify("/custom/v1/things", &url).await;
    assert_eq!(category, RouteCategory::PublicList);
}

#[tokio::test]
async fn test_object_body_classifies_public_dict() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/custom/v1/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "name": "x" })))
        .mount(&server)
        .await;

    let client = test_client();
    let classifier = RouteClassifier::new(&client);
    let url = format!("{}/wp-json/custom/v1/info", server.uri());
    let category = classifier.classify("/custom/v1/info", &url).await;
    assert_eq!(category, RouteCategory::PublicDict);
}

#[tokio::test]
async fn test_auth_denied_classifies_protected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/custom/v1/secrets"))
        .respond_with(ResponseTemplate::new(401).set_body_json(
            serde_json::json!({ "code": "rest_forbidden" }),
        ))
        .mount(&server)
        .await;

    let client = test_client();
    let classifier = RouteClassifier::new(&client);
    let url = format!("{}/wp-json/custom/v1/secrets", server.uri());
    assert_eq!(
        classifier.classify("/custom/v1/secrets", &url).await,
        RouteCategory::Protected
    );

    Mock::given(method("GET"))
        .and(path("/wp-json/custom/v1/admin"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let url = format!("{}/wp-json/custom/v1/admin", server.uri());
    assert_eq!(
        classifier.classify("/custom/v1/admin", &url).await,
        RouteCategory::Protected
    );
}

#[tokio::test]
async fn test_not_found_classifies_useless() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/custom/v1/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client();
    let classifier = RouteClassifier::new(&client);
    let url = format!("{}/wp-json/custom/v1/gone", server.uri());
    assert_eq!(
        classifier.classify("/custom/v1/gone", &url).await,
        RouteCategory::Useless
    );
}

#[tokio::test]
async fn test_single_item_route_skips_probe() {
    // No mock mounted; the request log below proves no probe went out.
    let server = MockServer::start().await;

    let client = test_client();
    let classifier = RouteClassifier::new(&client);
    let url = format!("{}/wp-json/wp/v2/posts/(?P<id>[\\d]+)", server.uri());
    assert_eq!(
        classifier.classify(r"/wp/v2/posts/(?P<id>[\d]+)", &url).await,
        RouteCategory::Useless
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_probe_failure_leaves_route_unresolved() {
    // Nothing listens here; the connection is refused immediately.
    let client = test_client();
    let classifier = RouteClassifier::new(&client);
    assert_eq!(
        classifier
            .classify("/custom/v1/things", "http://127.0.0.1:1/wp-json/custom/v1/things")
            .await,
        RouteCategory::Unknown
    );
}
