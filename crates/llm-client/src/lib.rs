use analysis_core::{AnalysisError, CompletionModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;
pub use error::{LlmError, LlmResult};

/// Configuration for the completion service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("LLM_SERVICE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            api_key: std::env::var("LLM_API_KEY").ok(),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            temperature: 0.2,
            timeout: Duration::from_secs(
                std::env::var("LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// HTTP client for an OpenAI-compatible chat completion endpoint.
///
/// The per-call timeout is baked into the underlying `reqwest::Client`, so
/// every completion carries it independently; a timed-out call surfaces as an
/// `Err` like any other failure.
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl CompletionClient {
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> LlmResult<Self> {
        dotenvy::dotenv().ok();
        Self::new(LlmConfig::default())
    }

    /// One chat completion round-trip, returning the raw assistant text.
    pub async fn chat(&self, prompt: &str) -> LlmResult<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
        };

        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(LlmError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let parsed = response.json::<ChatResponse>().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[async_trait]
impl CompletionModel for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
        self.chat(prompt).await.map_err(|e| {
            tracing::debug!(error = %e, "completion call failed");
            AnalysisError::ModelError(e.to_string())
        })
    }
}
