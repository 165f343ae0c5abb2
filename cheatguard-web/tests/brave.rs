use cheatguard_web::brave::BraveSearch;
use cheatguard_web::{QueryDispatcher, SearchProvider, SearchRequest};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn results() -> serde_json::Value {
    json!({
        "web": {
            "results": [
                { "title": "A", "url": "https://a.test/1" },
                { "cluster": [
                    { "title": "B1", "url": "https://b.test/2" },
                    { "title": "B2", "url": "https://b.test/3" }
                ] },
                { "title": "C", "url": "https://c.test/4" }
            ]
        }
    })
}

#[tokio::test]
async fn brave_sends_token_and_site_filtered_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/res/v1/web/search"))
        .and(header("x-subscription-token", "brave-test"))
        .and(query_param("q", "cheating (site:arxiv.org) -site:reddit.com"))
        .and(query_param("count", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results()))
        .expect(1)
        .mount(&server)
        .await;

    let brave = BraveSearch::with_base(&server.uri(), "brave-test".into()).unwrap();
    let dispatcher = QueryDispatcher::new(Arc::new(brave));
    let request = SearchRequest::new("cheating")
        .include(["arxiv.org"])
        .exclude(["reddit.com"]);

    let urls = dispatcher.dispatch(&request).await;
    assert_eq!(
        urls,
        vec!["https://a.test/1", "https://b.test/2", "https://b.test/3"]
    );
}

#[tokio::test]
async fn brave_failure_yields_no_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/res/v1/web/search"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "message": "rate limited" })))
        .mount(&server)
        .await;

    let brave = BraveSearch::with_base(&server.uri(), "brave-test".into()).unwrap();
    assert!(brave.search("q", 3).await.is_err());

    let dispatcher = QueryDispatcher::new(Arc::new(brave));
    assert!(dispatcher.dispatch(&SearchRequest::new("q")).await.is_empty());
}

#[test]
fn empty_token_is_rejected() {
    assert!(BraveSearch::new("  ".into()).is_err());
}
