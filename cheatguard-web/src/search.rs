//! Query dispatch: site-filter rewriting plus a bounded, failure-tolerant
//! call into a search provider.

use async_trait::async_trait;
use cheatguard_http::HttpError;
use std::sync::Arc;
use std::time::Instant;

/// Result count used when the caller does not ask for one.
pub const DEFAULT_MAX_RESULTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] HttpError),
    #[error("search provider misconfigured: {0}")]
    Config(String),
}

/// Anything that turns a query string into an ordered list of result URLs.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, SearchError>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// A query plus its optional bounds and site filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: Option<usize>,
    pub include_sites: Vec<String>,
    pub exclude_sites: Vec<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            include_sites: Vec::new(),
            exclude_sites: Vec::new(),
        }
    }

    pub fn with_max_results(mut self, n: usize) -> Self {
        self.max_results = Some(n);
        self
    }

    pub fn include(mut self, sites: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include_sites.extend(sites.into_iter().map(Into::into));
        self
    }

    pub fn exclude(mut self, sites: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude_sites.extend(sites.into_iter().map(Into::into));
        self
    }

    /// The query string actually sent to the provider.
    pub fn rendered(&self) -> String {
        build_site_query(&self.query, &self.include_sites, &self.exclude_sites)
    }

    pub fn limit(&self) -> usize {
        self.max_results.unwrap_or(DEFAULT_MAX_RESULTS)
    }
}

/// Rewrite a query with `site:` predicates.
///
/// Inclusions become one OR-group, exclusions become negated predicates.
///
/// ```
/// use cheatguard_web::build_site_query;
///
/// let q = build_site_query("exam cheating", &["arxiv.org", "nature.com"], &["reddit.com"]);
/// assert_eq!(q, "exam cheating (site:arxiv.org OR site:nature.com) -site:reddit.com");
/// ```
pub fn build_site_query<S: AsRef<str>>(query: &str, include: &[S], exclude: &[S]) -> String {
    let mut out = query.trim().to_string();

    let included: Vec<String> = include
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("site:{s}"))
        .collect();
    if !included.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("({})", included.join(" OR ")));
    }

    for site in exclude.iter().map(|s| s.as_ref().trim()) {
        if site.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("-site:{site}"));
    }

    out
}

/// First pipeline stage: ask the provider, bound the answer, never fail the run.
#[derive(Clone)]
pub struct QueryDispatcher {
    provider: Arc<dyn SearchProvider>,
}

impl QueryDispatcher {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Like [`QueryDispatcher::dispatch`] but hands provider errors back.
    pub async fn dispatch_checked(&self, request: &SearchRequest) -> Result<Vec<String>, SearchError> {
        let query = request.rendered();
        let limit = request.limit();
        let started = Instant::now();
        tracing::info!(
            target: "web.search",
            provider = self.provider.name(),
            query = %query,
            limit,
            "search.dispatch.start"
        );

        let mut urls = self.provider.search(&query, limit).await?;
        urls.retain(|u| !u.trim().is_empty());
        urls.truncate(limit);

        tracing::info!(
            target: "web.search",
            provider = self.provider.name(),
            hit_count = urls.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search.dispatch.done"
        );
        Ok(urls)
    }

    /// Run the search; provider failures are logged and yield no URLs.
    pub async fn dispatch(&self, request: &SearchRequest) -> Vec<String> {
        match self.dispatch_checked(request).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!(
                    target: "web.search",
                    provider = self.provider.name(),
                    error = %e,
                    "search.dispatch.error"
                );
                Vec::new()
            }
        }
    }
}

/// Provider that always answers with a fixed list (offline runs, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    urls: Vec<String>,
}

impl StaticSearch {
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        Ok(self.urls.iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    #[async_trait]
    impl SearchProvider for Broken {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>, SearchError> {
            Err(SearchError::Config("no api key".into()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn plain_query_is_only_trimmed() {
        let none: [&str; 0] = [];
        assert_eq!(build_site_query("  cheating  ", &none, &none), "cheating");
    }

    #[test]
    fn blank_sites_are_ignored() {
        assert_eq!(
            build_site_query("q", &["", " arxiv.org "], &["  "]),
            "q (site:arxiv.org)"
        );
    }

    #[test]
    fn exclusions_alone_are_negated() {
        let none: [&str; 0] = [];
        assert_eq!(
            build_site_query("q", &none, &["a.com", "b.com"]),
            "q -site:a.com -site:b.com"
        );
    }

    #[tokio::test]
    async fn dispatch_bounds_and_cleans_results() {
        let dispatcher = QueryDispatcher::new(Arc::new(StaticSearch::new([
            "https://a.test",
            "",
            "https://b.test",
            "https://c.test",
        ])));
        let urls = dispatcher
            .dispatch(&SearchRequest::new("q").with_max_results(3))
            .await;
        assert_eq!(urls, vec!["https://a.test", "https://b.test"]);
    }

    #[tokio::test]
    async fn provider_failure_becomes_empty_list() {
        let dispatcher = QueryDispatcher::new(Arc::new(Broken));
        let request = SearchRequest::new("q");
        assert!(dispatcher.dispatch(&request).await.is_empty());
        assert!(dispatcher.dispatch_checked(&request).await.is_err());
    }

    #[test]
    fn request_defaults_to_three_results() {
        let req = SearchRequest::new("q").include(["arxiv.org"]);
        assert_eq!(req.limit(), DEFAULT_MAX_RESULTS);
        assert_eq!(req.rendered(), "q (site:arxiv.org)");
    }
}
