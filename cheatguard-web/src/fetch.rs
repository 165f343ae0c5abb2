use async_trait::async_trait;
use cheatguard_http::{HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("empty URL")]
    EmptyUrl,
    #[error(transparent)]
    Http(#[from] HttpError),
}

/// Retrieves the raw HTML behind a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain GET with a browser-ish `User-Agent` and a hard timeout.
#[derive(Clone)]
pub struct HttpPageFetcher {
    http: HttpClient,
    user_agent: HeaderValue,
}

impl HttpPageFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = HttpClient::unanchored()?.with_timeout(timeout);
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| FetchError::Http(HttpError::Build(e.to_string())))?;
        Ok(Self { http, user_agent })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if url.trim().is_empty() {
            return Err(FetchError::EmptyUrl);
        }
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, self.user_agent.clone());
        let html = self
            .http
            .get_text(
                url.trim(),
                RequestOpts {
                    headers: Some(headers),
                    ..Default::default()
                },
            )
            .await?;
        Ok(html)
    }
}
