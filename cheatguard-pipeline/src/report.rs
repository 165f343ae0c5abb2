use crate::record::ArticleRecord;

/// Everything that can go wrong for one URL or one run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("search failed: {0}")]
    Search(String),
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("nothing relevant in {url}")]
    EmptyFilterResult { url: String },
    #[error("malformed structured output for {url}: {reason}")]
    MalformedStructuredOutput { url: String, reason: String },
    #[error("email delivery failed: {0}")]
    EmailSend(String),
    #[error("language model failed on {url}: {message}")]
    Model { url: String, message: String },
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// The query as sent to the search provider.
    pub query: String,
    pub urls: Vec<String>,
    pub records: Vec<ArticleRecord>,
    /// Recovered failures, in the order they happened.
    pub issues: Vec<StageError>,
    pub emailed: bool,
}

/// A run stopped early. `partial` holds what was gathered before `cause`.
#[derive(Debug, thiserror::Error)]
#[error("run aborted: {cause}")]
pub struct RunAborted {
    pub partial: RunReport,
    pub cause: StageError,
}
