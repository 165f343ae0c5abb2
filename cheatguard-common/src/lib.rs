//! Common types and utilities shared across CheatGuard crates.
//!
//! This crate defines the provider configuration, run-mode switches,
//! observability helpers, and the shared error type used throughout the
//! CheatGuard workspace. It is intentionally lightweight so that every crate
//! can depend on it without introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`LlmConfig`]: Provider‑agnostic LLM configuration
//! - [`RunMode`]: Interactive lookup vs. autonomous digest
//! - [`MalformedOutputPolicy`]: What to do when the model returns broken JSON
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`CheatguardError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use cheatguard_common::{MalformedOutputPolicy, RunMode};
//!
//! let mode = RunMode::Digest;
//! assert_eq!(mode.excerpt_ceiling(), 4000);
//! assert!(mode.prefix_source_url());
//! assert_eq!(MalformedOutputPolicy::default(), MalformedOutputPolicy::SkipRecord);
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Default Ollama endpoint used when none is configured.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Configuration for an LLM provider used by the pipeline.
///
/// Feature flags control which variants are compiled in.
/// See the `cheatguard-llm` crate for concrete client implementations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LlmConfig {
    #[cfg(feature = "ollama")]
    Ollama { base_url: String, model: String },
    #[cfg(feature = "openai")]
    OpenAi {
        api_key: String,
        model: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    None,
}

impl Default for LlmConfig {
    fn default() -> Self {
        // Default to Ollama if the feature is enabled
        #[cfg(feature = "ollama")]
        {
            Self::Ollama {
                base_url: DEFAULT_OLLAMA_URL.to_string(),
                model: "llama3.2".to_string(),
            }
        }
        #[cfg(not(feature = "ollama"))]
        {
            Self::None
        }
    }
}

/// Which flavour of run the pipeline performs.
///
/// The interactive lookup prints records for an ad-hoc query; the digest run
/// builds a dated query on its own, keeps source URLs, and mails the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Interactive,
    Digest,
}

impl RunMode {
    /// Character ceiling applied to every excerpt.
    pub fn excerpt_ceiling(self) -> usize {
        match self {
            RunMode::Interactive => 3000,
            RunMode::Digest => 4000,
        }
    }

    /// Whether excerpts and records carry the page URL.
    pub fn prefix_source_url(self) -> bool {
        matches!(self, RunMode::Digest)
    }
}

/// How the structured extraction stage reacts to a reply that is not a valid record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedOutputPolicy {
    /// Record the failure and move on to the next URL.
    #[default]
    SkipRecord,
    /// Stop the whole run at the first malformed reply.
    AbortRun,
}

/// Error types used across the CheatGuard workspace.
#[derive(thiserror::Error, Debug)]
pub enum CheatguardError {
    /// A language-model provider failed or could not be reached.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`CheatguardError`].
pub type Result<T> = std::result::Result<T, CheatguardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_pick_their_ceiling() {
        assert_eq!(RunMode::Interactive.excerpt_ceiling(), 3000);
        assert_eq!(RunMode::Digest.excerpt_ceiling(), 4000);
        assert!(!RunMode::Interactive.prefix_source_url());
    }

    #[test]
    fn policy_names_are_snake_case() {
        let raw = serde_json::to_string(&MalformedOutputPolicy::AbortRun).unwrap();
        assert_eq!(raw, "\"abort_run\"");
        let mode: RunMode = serde_json::from_str("\"digest\"").unwrap();
        assert_eq!(mode, RunMode::Digest);
    }
}
