use async_trait::async_trait;
use cheatguard_common::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Check if the LLM service is available
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Send a single user-role prompt with provider defaults and return the reply text.
    async fn ask(&self, prompt: &str) -> Result<String> {
        tracing::debug!(model = self.model_name(), prompt_len = prompt.len(), "llm.ask");
        let response = self.generate(prompt, None, None, None).await?;
        tracing::trace!(reply = %response.text, "llm.ask.reply");
        Ok(response.text)
    }
}
