//! Outbound notification mail.
//!
//! - [`Notifier`]: the seam the pipeline talks to
//! - [`GmailNotifier`]: Gmail REST `users/me/messages/send`
//! - [`oauth`]: installed-app OAuth2 (refresh + loopback authorization)
//! - [`token`]: on-disk token store
//! - [`mime`]: plain-text MIME assembly and base64url encoding

pub mod gmail;
pub mod mime;
pub mod oauth;
pub mod token;

use async_trait::async_trait;
use cheatguard_http::HttpError;

pub use gmail::{GMAIL_API_BASE, GmailNotifier};
pub use oauth::{GMAIL_SEND_SCOPE, OAuthClient, OAuthEndpoints};
pub use token::{StoredToken, TokenStore};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("token store {path}: {message}")]
    TokenStore { path: String, message: String },
    #[error("authorization failed: {0}")]
    Auth(String),
    #[error("mail misconfigured: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can deliver a subject + plain-text body to a fixed recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError>;
}
