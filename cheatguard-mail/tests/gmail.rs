use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use cheatguard_mail::{
    GmailNotifier, MailError, Notifier, OAuthClient, OAuthEndpoints, StoredToken, TokenStore,
};
use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn oauth(server: &MockServer) -> OAuthClient {
    OAuthClient::new(
        "client-id".into(),
        "client-secret".into(),
        OAuthEndpoints {
            auth_uri: format!("{}/auth", server.uri()),
            token_uri: format!("{}/token", server.uri()),
        },
    )
    .unwrap()
}

fn token(access: &str, expires_in: i64) -> StoredToken {
    StoredToken {
        access_token: access.into(),
        refresh_token: Some("refresh-1".into()),
        expires_at: Some(Utc::now() + Duration::seconds(expires_in)),
        scope: Some(cheatguard_mail::GMAIL_SEND_SCOPE.into()),
        token_type: Some("Bearer".into()),
    }
}

async fn notifier(server: &MockServer, store: TokenStore) -> GmailNotifier {
    GmailNotifier::with_base(
        &server.uri(),
        oauth(server),
        store,
        "bot@example.com".into(),
        "me@example.com".into(),
    )
    .unwrap()
}

fn decoded_raw(req: &Request) -> String {
    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
    let raw = body["raw"].as_str().unwrap();
    String::from_utf8(URL_SAFE.decode(raw).unwrap()).unwrap()
}

#[tokio::test]
async fn fresh_token_is_used_directly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .and(header("authorization", "Bearer access-fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "m1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store.save(&token("access-fresh", 3600)).await.unwrap();

    notifier(&server, store)
        .await
        .send("Digest", "{\n    \"title\": \"A\"\n}")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let msg = decoded_raw(&requests[0]);
    assert!(msg.contains("To: me@example.com\r\n"));
    assert!(msg.contains("From: bot@example.com\r\n"));
    assert!(msg.contains("Subject: Digest\r\n"));
    assert!(msg.ends_with("{\r\n    \"title\": \"A\"\r\n}"));
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-new",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .and(header("authorization", "Bearer access-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "m2" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store.save(&token("access-old", -5)).await.unwrap();

    notifier(&server, store.clone())
        .await
        .send("Digest", "body")
        .await
        .unwrap();

    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved.access_token, "access-new");
    assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));
    assert!(saved.is_fresh());
}

#[tokio::test]
async fn refresh_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store.save(&token("access-old", -5)).await.unwrap();

    let err = notifier(&server, store)
        .await
        .send("Digest", "body")
        .await
        .unwrap_err();
    assert!(matches!(err, MailError::Http(_)));
    assert!(err.to_string().contains("invalid_grant"));
}

#[tokio::test]
async fn gmail_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Insufficient Permission" }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(dir.path().join("token.json"));
    store.save(&token("access-fresh", 3600)).await.unwrap();

    let err = notifier(&server, store)
        .await
        .send("Digest", "body")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Insufficient Permission"));
}

#[test]
fn notifier_requires_addresses() {
    let oauth = OAuthClient::new("id".into(), "secret".into(), OAuthEndpoints::default()).unwrap();
    let store = TokenStore::new("token.json");
    let err = GmailNotifier::new(oauth, store, "".into(), "me@example.com".into()).err();
    assert!(matches!(err, Some(MailError::Config(_))));
}
