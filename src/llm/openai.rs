use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CompletionBackend;
use crate::error::CompletionError;

/// Configuration for an OpenAI-compatible chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (from OPENAI_API_KEY env var)
    pub api_key: String,
    /// API root, without the trailing `/chat/completions`
    pub base_url: String,
    /// Model to use (e.g., "gpt-3.5-turbo-1106")
    pub model: String,
    /// Sampling temperature, 0 for deterministic answers
    pub temperature: f64,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create config from environment variables
    ///
    /// `OPENAI_BASE_URL` and `OPENAI_MODEL` are optional overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;
        let model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo-1106".to_string());

        let mut config = Self::new(api_key, model);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model,
            temperature: 0.0,
            timeout: Duration::from_secs(120),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// OpenAI chat completions client
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build OpenAI HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(self.config.timeout)
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        response.into_text().ok_or(CompletionError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl ChatResponse {
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let mut config = OpenAiConfig::new("key".to_string(), "gpt".to_string());
        config.base_url = "http://localhost:8080/v1/".to_string();
        assert_eq!(config.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_response_first_choice() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}},
                {"index": 1, "message": {"role": "assistant", "content": "second"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().as_deref(), Some("first"));
    }

    #[test]
    fn test_response_without_content() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
        )
        .unwrap();
        assert!(response.into_text().is_none());

        let response: ChatResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(response.into_text().is_none());
    }
}
