use crate::MailError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tokens are treated as expired this long before their real expiry.
pub const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl StoredToken {
    /// Usable as-is at `now`. A token without an expiry is never fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at - Duration::seconds(EXPIRY_SKEW_SECS) > now,
            None => false,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// JSON file holding the last issued token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `Ok(None)` when no token has been stored yet.
    pub async fn load(&self) -> Result<Option<StoredToken>, MailError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.err(e)),
        };
        let token = serde_json::from_slice(&bytes).map_err(|e| self.err(e))?;
        Ok(Some(token))
    }

    pub async fn save(&self, token: &StoredToken) -> Result<(), MailError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.err(e))?;
        }
        let json = serde_json::to_vec_pretty(token).map_err(|e| self.err(e))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.err(e))?;
        tracing::debug!(target: "mail.token", path = %self.path.display(), "token.saved");
        Ok(())
    }

    fn err(&self, e: impl std::fmt::Display) -> MailError {
        MailError::TokenStore {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}
