//! Provider‑agnostic LLM integration for CheatGuard.
//!
//! This crate exposes a common [`traits::LlmClient`] interface and concrete
//! provider implementations for Ollama and OpenAI. It also provides a
//! convenience function to initialize a client from a
//! [`cheatguard_common::LlmConfig`].
//!
//! # Examples
//! ```no_run
//! use cheatguard_common::{LlmConfig, Result};
//! use cheatguard_llm::ensure_llm_ready;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let cfg = LlmConfig::default();
//! let client = ensure_llm_ready(&cfg).await?;
//! assert!(!client.model_name().is_empty());
//! # Ok(())
//! # }
//! ```
pub mod ollama;
pub mod openai;
pub mod traits;

use cheatguard_common::{CheatguardError, LlmConfig};
use ollama::OllamaClient;
use openai::OpenAiClient;
use std::sync::Arc;
use traits::LlmClient;

/// Default model recommendations
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Ensure an LLM client is ready (e.g., downloading models if needed).
pub async fn ensure_llm_ready(
    config: &LlmConfig,
) -> cheatguard_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        #[cfg(feature = "ollama")]
        LlmConfig::Ollama { base_url, model } => {
            let client = OllamaClient::new(base_url.clone(), model.clone()).await?;
            Ok(Arc::new(client))
        }
        #[cfg(feature = "openai")]
        LlmConfig::OpenAi {
            api_key,
            model,
            base_url,
        } => {
            let client = OpenAiClient::new(api_key.clone(), model.clone(), base_url.as_deref())?;
            Ok(Arc::new(client))
        }
        LlmConfig::None => Err(CheatguardError::Config("No LLM configured".to_string())),
        #[allow(unreachable_patterns)]
        _ => Err(CheatguardError::Config("LLM provider not enabled".to_string())),
    }
}
