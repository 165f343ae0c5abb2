use cheatguard_http::{Auth, HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn get_text_sends_custom_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .and(header("user-agent", "Mozilla/5.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
    let client = HttpClient::unanchored().unwrap();
    let body = client
        .get_text(
            &format!("{}/article", server.uri()),
            RequestOpts {
                headers: Some(headers),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(body, "<p>hi</p>");
}

#[tokio::test]
async fn get_text_follows_the_declared_charset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cp1252"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            b"\x93quoted\x94 na\xEFve".to_vec(),
            "text/html; charset=windows-1252",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/utf8"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "naïve".as_bytes().to_vec(),
            "text/html",
        ))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let cp1252 = client.get_text("cp1252", RequestOpts::default()).await.unwrap();
    let utf8 = client.get_text("utf8", RequestOpts::default()).await.unwrap();

    assert_eq!(cp1252, "\u{201c}quoted\u{201d} naïve");
    assert_eq!(utf8, "naïve");
}

#[tokio::test]
async fn non_success_status_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let err = client
        .get_text("missing", RequestOpts::default())
        .await
        .unwrap_err();

    match err {
        HttpError::Api { status, message, .. } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(message, "nope");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri())
        .unwrap()
        .with_timeout(Duration::from_millis(100));
    let err = client
        .get_text("slow", RequestOpts::default())
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn header_auth_and_query_are_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(header("x-subscription-token", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let got: Value = client
        .get_json(
            "search",
            RequestOpts {
                auth: Some(Auth::Header {
                    name: reqwest::header::HeaderName::from_static("x-subscription-token"),
                    value: HeaderValue::from_static("secret"),
                }),
                query: Some(vec![("q", "rust".into())]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(got["ok"], true);
}

#[tokio::test]
async fn form_posts_decode_json_replies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "a1"})),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let got: Value = client
        .post_form(
            "token",
            &[("grant_type", "refresh_token"), ("refresh_token", "r1")],
            RequestOpts::default(),
        )
        .await
        .unwrap();

    assert_eq!(got["access_token"], "a1");
}

#[tokio::test]
async fn bearer_tokens_are_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).unwrap();
    let got: Value = client
        .post_json("echo", Some(" 'tok' "), &serde_json::json!({"a": 1}))
        .await
        .unwrap();

    assert!(got.as_object().unwrap().is_empty());
}
