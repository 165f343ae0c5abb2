use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("reply is not JSON: {0}")]
    NotJson(String),
    #[error("unexpected record shape: {0}")]
    Shape(String),
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

/// One article as reported to the user.
///
/// Field order is the output order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub description: String,
    pub authors: Vec<String>,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ArticleRecord {
    /// Render with four-space indentation.
    ///
    /// ```
    /// use cheatguard_pipeline::ArticleRecord;
    ///
    /// let rec = ArticleRecord {
    ///     title: "T".into(),
    ///     description: "D".into(),
    ///     authors: vec!["A".into()],
    ///     year: "2024".into(),
    ///     url: None,
    /// };
    /// let out = rec.to_pretty_json().unwrap();
    /// assert!(out.starts_with("{\n    \"title\": \"T\",\n    \"description\""));
    /// ```
    pub fn to_pretty_json(&self) -> Result<String, RecordError> {
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
