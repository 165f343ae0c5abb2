//! Structured extraction: turn filtered text into an [`ArticleRecord`].

use crate::record::{ArticleRecord, RecordError};
use cheatguard_common::{Result, RunMode};
use cheatguard_llm::traits::LlmClient;
use serde_json::{Map, Value};
use std::sync::Arc;

const REQUIRED_KEYS: &[&str] = &["title", "description", "authors", "year"];

pub fn structured_prompt(summary: &str, mode: RunMode) -> String {
    let url_line = if mode.prefix_source_url() {
        ",\n    \"url\": \"<url>\""
    } else {
        ""
    };
    let fields = if mode.prefix_source_url() {
        "title, description, authors, year and url"
    } else {
        "title, description, authors and year"
    };
    format!(
        "Below is a summary extracted from an article. From it, extract the {fields} of the article.

Summary:
{summary}

Answer with exactly this JSON shape:
{{
    \"title\": \"<title>\",
    \"description\": \"<description>\",
    \"authors\": [\"<author1>\", \"<author2>\", ...],
    \"year\": \"<year>\"{url_line}
}}

Every field is required. Use an empty string or an empty list when a value is missing. \
Return only the JSON, with no comment or extra text."
    )
}

/// Parse a model reply into a record.
///
/// `Ok(None)` means the reply was well formed but names no article (blank
/// title). `keep_url` drops any `url` the model produced when false.
pub fn parse_record(reply: &str, keep_url: bool) -> std::result::Result<Option<ArticleRecord>, RecordError> {
    let value = locate_json(reply)?;
    let Value::Object(obj) = value else {
        return Err(RecordError::Shape("expected a JSON object".into()));
    };
    for key in REQUIRED_KEYS {
        if !obj.contains_key(*key) {
            return Err(RecordError::Shape(format!("missing field `{key}`")));
        }
    }

    let record = ArticleRecord {
        title: text_field(&obj, "title")?,
        description: text_field(&obj, "description")?,
        authors: authors_field(&obj)?,
        year: year_field(&obj)?,
        url: if keep_url { url_field(&obj)? } else { None },
    };

    if record.title.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(record))
}

/// The reply as-is, else the body of a code fence, else the outermost braces.
fn locate_json(reply: &str) -> std::result::Result<Value, RecordError> {
    let trimmed = reply.trim();
    let first_err = match serde_json::from_str(trimmed) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    if let Some(inner) = strip_fence(trimmed) {
        if let Ok(v) = serde_json::from_str(inner) {
            return Ok(v);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(v) = serde_json::from_str(&trimmed[start..=end]) {
                return Ok(v);
            }
        }
    }

    Err(RecordError::NotJson(first_err.to_string()))
}

fn strip_fence(s: &str) -> Option<&str> {
    let body = s.strip_prefix("```")?;
    let body = match body.find('\n') {
        Some(nl) => &body[nl + 1..],
        None => return None,
    };
    Some(body.trim_end().strip_suffix("```").unwrap_or(body).trim())
}

fn text_field(obj: &Map<String, Value>, key: &str) -> std::result::Result<String, RecordError> {
    match &obj[key] {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(RecordError::Shape(format!(
            "`{key}` must be a string, got {}",
            kind(other)
        ))),
    }
}

fn year_field(obj: &Map<String, Value>) -> std::result::Result<String, RecordError> {
    match &obj["year"] {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => text_field(obj, "year"),
    }
}

fn authors_field(obj: &Map<String, Value>) -> std::result::Result<Vec<String>, RecordError> {
    match &obj["authors"] {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(RecordError::Shape(format!(
                    "`authors` entries must be strings, got {}",
                    kind(other)
                ))),
            })
            .collect(),
        other => Err(RecordError::Shape(format!(
            "`authors` must be a list, got {}",
            kind(other)
        ))),
    }
}

fn url_field(obj: &Map<String, Value>) -> std::result::Result<Option<String>, RecordError> {
    match obj.get("url") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(RecordError::Shape(format!(
            "`url` must be a string, got {}",
            kind(other)
        ))),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[derive(Clone)]
pub struct StructuredExtractor {
    llm: Arc<dyn LlmClient>,
    mode: RunMode,
}

impl StructuredExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, mode: RunMode) -> Self {
        Self { llm, mode }
    }

    /// Ask the model for the record. The raw reply is returned for
    /// [`parse_record`], so a model failure and a malformed reply stay distinct.
    pub async fn request(&self, summary: &str) -> Result<String> {
        self.llm.ask(&structured_prompt(summary, self.mode)).await
    }
}
