use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use cheatguard_common::{CheatguardError, Result};
use cheatguard_http::{HttpClient, HttpError, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Ollama client for local model inference.
///
/// Expects a running Ollama server (see https://github.com/ollama/ollama).
/// Prompts go through `/api/chat` as a single user message.
pub struct OllamaClient {
    client: HttpClient,
    model: String,
}

#[derive(Debug, Default, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize, Default)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatReply>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    /// Create a client and make sure the server answers and the model is present.
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let client = Self::unchecked(base_url, model)?;
        let tags = client.tags().await?;

        if !tags.models.iter().any(|m| same_model(&m.name, &client.model)) {
            tracing::info!(target: "llm", model = %client.model, "ollama.model.pull");
            client.pull().await?;
        }
        Ok(client)
    }

    /// Build a client without touching the network.
    pub fn unchecked(base_url: String, model: String) -> Result<Self> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let client = HttpClient::new(&base).map_err(|e| CheatguardError::Llm(e.to_string()))?;
        Ok(Self { client, model })
    }

    async fn tags(&self) -> Result<TagsResponse> {
        let opts = RequestOpts {
            timeout: Some(PROBE_TIMEOUT),
            ..Default::default()
        };
        match self.client.get_json::<TagsResponse>("api/tags", opts).await {
            Ok(tags) => Ok(tags),
            Err(HttpError::Decode(..)) => Ok(TagsResponse::default()),
            Err(e) => {
                tracing::debug!(target: "llm", error = %e, "ollama.probe.failed");
                Err(CheatguardError::Llm(OLLAMA_CONNECTION_ERROR.to_string()))
            }
        }
    }

    async fn pull(&self) -> Result<()> {
        let req = PullRequest {
            model: &self.model,
            stream: false,
        };
        self.client
            .post_json::<_, serde_json::Value>("api/pull", None, &req)
            .await
            .map_err(|e| CheatguardError::Llm(format!("Failed to pull model {}: {e}", self.model)))?;
        tracing::info!(target: "llm", model = %self.model, "ollama.model.ready");
        Ok(())
    }
}

/// Ollama lists untagged models as `<name>:latest`.
fn same_model(listed: &str, wanted: &str) -> bool {
    listed == wanted || (!wanted.contains(':') && listed == format!("{wanted}:latest"))
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let req = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature,
                num_predict: max_tokens,
            },
        };
        let resp: ChatResponse = self
            .client
            .post_json("api/chat", None, &req)
            .await
            .map_err(|e| CheatguardError::Llm(format!("Chat failed: {e}")))?;

        Ok(LlmResponse {
            text: resp.message.map(|m| m.content).unwrap_or_default(),
            model: Some(self.model.clone()),
            tokens_used: resp.eval_count,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.tags().await.is_ok())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::same_model;

    #[test]
    fn latest_tag_counts_as_the_same_model() {
        assert!(same_model("llama3.2:latest", "llama3.2"));
        assert!(same_model("llama3.2:3b", "llama3.2:3b"));
        assert!(!same_model("llama3.2:3b", "llama3.2"));
    }
}
