//! Installed-app OAuth2 for Google APIs.
//!
//! Token lifecycle: reuse a fresh stored token, refresh an expired one, or
//! fall back to a browser consent whose redirect lands on a one-shot
//! loopback listener.

use crate::MailError;
use crate::token::{StoredToken, TokenStore};
use cheatguard_http::{HttpClient, RequestOpts};
use chrono::{Duration, Utc};
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(2);

const CONSENT_DONE_PAGE: &str = "<html><body><p>Authorization complete. You can close this window.</p></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub auth_uri: String,
    pub token_uri: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            auth_uri: "https://accounts.google.com/o/oauth2/auth".into(),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            scope: self.scope,
            token_type: self.token_type,
        }
    }
}

#[derive(Clone)]
pub struct OAuthClient {
    http: HttpClient,
    client_id: String,
    client_secret: String,
    endpoints: OAuthEndpoints,
}

impl OAuthClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        endpoints: OAuthEndpoints,
    ) -> Result<Self, MailError> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(MailError::Config(
                "OAuth client id and secret are required".into(),
            ));
        }
        Ok(Self {
            http: HttpClient::unanchored()?,
            client_id,
            client_secret,
            endpoints,
        })
    }

    /// Consent URL the user opens in a browser.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url, MailError> {
        let mut url = Url::parse(&self.endpoints.auth_uri)
            .map_err(|e| MailError::Config(format!("auth_uri: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", GMAIL_SEND_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        Ok(url)
    }

    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<StoredToken, MailError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let resp: TokenResponse = self
            .http
            .post_form(&self.endpoints.token_uri, &form, RequestOpts::default())
            .await?;
        tracing::info!(target: "mail.oauth", "oauth.code.exchanged");
        Ok(resp.into_stored(None))
    }

    /// Trade a refresh token for a new access token. The refresh token is
    /// carried over when the server does not rotate it.
    pub async fn refresh(&self, token: &StoredToken) -> Result<StoredToken, MailError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| MailError::Auth("no refresh token stored".into()))?;
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let resp: TokenResponse = self
            .http
            .post_form(&self.endpoints.token_uri, &form, RequestOpts::default())
            .await?;
        tracing::info!(target: "mail.oauth", "oauth.token.refreshed");
        Ok(resp.into_stored(token.refresh_token.clone()))
    }

    /// Run the browser consent against a loopback redirect and exchange the code.
    pub async fn authorize_loopback(&self) -> Result<StoredToken, MailError> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");
        let state = uuid::Uuid::new_v4().simple().to_string();
        let url = self.authorization_url(&redirect_uri, &state)?;

        tracing::info!(target: "mail.oauth", port, "oauth.consent.waiting");
        eprintln!("Open this URL in your browser to authorize mail delivery:\n\n{url}\n");

        let code = wait_for_code(listener, &state).await?;
        self.exchange_code(&code, &redirect_uri).await
    }

    /// A usable access token: stored, refreshed, or freshly authorized.
    /// Any new token is persisted before it is returned.
    pub async fn access_token(&self, store: &TokenStore) -> Result<String, MailError> {
        let stored = store.load().await?;
        let token = match stored {
            Some(t) if t.is_fresh() => return Ok(t.access_token),
            Some(t) if t.can_refresh() => self.refresh(&t).await?,
            _ => self.authorize_loopback().await?,
        };
        store.save(&token).await?;
        Ok(token.access_token)
    }
}

type Outcome = Result<String, MailError>;

#[derive(Clone)]
struct RedirectState {
    expected_state: Arc<str>,
    outcome: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

#[derive(Debug, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn consent_redirect(
    State(app): State<RedirectState>,
    Query(params): Query<RedirectParams>,
) -> (StatusCode, Html<&'static str>) {
    let outcome = match (params.error, params.code) {
        (Some(err), _) => Err(MailError::Auth(format!("consent refused: {err}"))),
        (None, None) => return (StatusCode::NOT_FOUND, Html("")),
        (None, Some(code)) if params.state.as_deref() == Some(&*app.expected_state) => Ok(code),
        (None, Some(_)) => Err(MailError::Auth("state mismatch in redirect".into())),
    };
    let status = if outcome.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    let sender = app.outcome.lock().ok().and_then(|mut slot| slot.take());
    if let Some(sender) = sender {
        let _ = sender.send(outcome);
    }
    (status, Html(CONSENT_DONE_PAGE))
}

/// Serve the redirect URI on `listener` until a request carries `code` (or
/// `error`) for `state`. Requests without either get a 404 and are ignored.
pub async fn wait_for_code(listener: TcpListener, state: &str) -> Result<String, MailError> {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let app = Router::new()
        .route("/", get(consent_redirect))
        .with_state(RedirectState {
            expected_state: Arc::from(state),
            outcome: Arc::new(Mutex::new(Some(outcome_tx))),
        });

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let outcome = outcome_rx
        .await
        .map_err(|_| MailError::Auth("redirect listener stopped before consent".into()));
    let _ = stop_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::debug!(target: "mail.oauth", error = %e, "oauth.redirect.server_error"),
        Ok(Err(e)) => tracing::debug!(target: "mail.oauth", error = %e, "oauth.redirect.join_failed"),
        Err(_) => tracing::debug!(target: "mail.oauth", "oauth.redirect.shutdown_timeout"),
    }
    outcome?
}
