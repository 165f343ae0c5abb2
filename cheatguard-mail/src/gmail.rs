use crate::mime::{build_message, encode_raw};
use crate::oauth::OAuthClient;
use crate::token::TokenStore;
use crate::{MailError, Notifier};
use async_trait::async_trait;
use cheatguard_http::HttpClient;
use serde::{Deserialize, Serialize};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/";

#[derive(Serialize)]
struct SendRequest {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Sends plain-text mail from `sender` to `receiver` through the Gmail API.
#[derive(Clone)]
pub struct GmailNotifier {
    http: HttpClient,
    oauth: OAuthClient,
    store: TokenStore,
    sender: String,
    receiver: String,
}

impl GmailNotifier {
    pub fn new(
        oauth: OAuthClient,
        store: TokenStore,
        sender: String,
        receiver: String,
    ) -> Result<Self, MailError> {
        Self::with_base(GMAIL_API_BASE, oauth, store, sender, receiver)
    }

    pub fn with_base(
        base: &str,
        oauth: OAuthClient,
        store: TokenStore,
        sender: String,
        receiver: String,
    ) -> Result<Self, MailError> {
        if sender.trim().is_empty() || receiver.trim().is_empty() {
            return Err(MailError::Config("sender and receiver are required".into()));
        }
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        Ok(Self {
            http: HttpClient::new(&base)?,
            oauth,
            store,
            sender,
            receiver,
        })
    }
}

#[async_trait]
impl Notifier for GmailNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError> {
        let token = self.oauth.access_token(&self.store).await?;
        let message = build_message(&self.sender, &self.receiver, subject, body);
        let req = SendRequest {
            raw: encode_raw(&message),
        };

        let resp: SendResponse = self
            .http
            .post_json("gmail/v1/users/me/messages/send", Some(&token), &req)
            .await?;

        tracing::info!(
            target: "mail.gmail",
            message_id = resp.id.as_deref().unwrap_or("-"),
            bytes = message.len(),
            "mail.send.ok"
        );
        Ok(())
    }
}
