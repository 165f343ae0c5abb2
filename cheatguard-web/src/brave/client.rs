use super::types::WebSearchApiResponse;
use crate::search::{SearchError, SearchProvider};
use async_trait::async_trait;
use cheatguard_http::{Auth, HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderName, HeaderValue};
use std::borrow::Cow;
use std::time::Instant;

pub const BRAVE_API_BASE: &str = "https://api.search.brave.com";

/// Brave caps `count` per page.
const BRAVE_MAX_COUNT: usize = 20;

/// Minimal client for Brave Search API (web vertical).
#[derive(Clone)]
pub struct BraveSearch {
    http: HttpClient,
    token: String,
}

impl BraveSearch {
    pub fn new(subscription_token: String) -> Result<Self, SearchError> {
        Self::with_base(BRAVE_API_BASE, subscription_token)
    }

    /// Point the client at another host (self-hosted proxy, tests).
    pub fn with_base(base: &str, subscription_token: String) -> Result<Self, SearchError> {
        if subscription_token.trim().is_empty() {
            return Err(SearchError::Config(
                "Brave subscription token is empty".into(),
            ));
        }
        let http = HttpClient::new(base)?;
        Ok(Self {
            http,
            token: subscription_token,
        })
    }

    pub async fn query(&self, query: &str, count: usize) -> Result<WebSearchApiResponse, SearchError> {
        let count = count.clamp(1, BRAVE_MAX_COUNT);
        let query_snippet: String = query.chars().take(160).collect();
        let started = Instant::now();
        tracing::info!(
            target: "web.brave",
            query = %query_snippet,
            count,
            "brave.query.start"
        );

        let params: Vec<(&str, Cow<'_, str>)> = vec![
            ("q", Cow::Borrowed(query)),
            ("count", count.to_string().into()),
            ("result_filter", "web".into()),
            ("safesearch", "moderate".into()),
        ];

        let value = HeaderValue::from_str(&self.token)
            .map_err(|e| SearchError::Http(HttpError::Build(e.to_string())))?;
        let resp = self
            .http
            .get_json::<WebSearchApiResponse>(
                "res/v1/web/search",
                RequestOpts {
                    auth: Some(Auth::Header {
                        name: HeaderName::from_static("x-subscription-token"),
                        value,
                    }),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await;

        match resp {
            Ok(resp) => {
                tracing::info!(
                    target: "web.brave",
                    query = %query_snippet,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "brave.query.success"
                );
                Ok(resp)
            }
            Err(e) => {
                tracing::warn!(
                    target: "web.brave",
                    query = %query_snippet,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "brave.query.error"
                );
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl SearchProvider for BraveSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        let resp = self.query(query, limit).await?;
        let mut urls = resp.urls();
        urls.truncate(limit);
        Ok(urls)
    }

    fn name(&self) -> &str {
        "brave"
    }
}
