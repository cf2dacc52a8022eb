use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CompletionBackend;
use crate::error::CompletionError;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Configuration for the Anthropic API client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (from ANTHROPIC_API_KEY env var)
    pub api_key: String,
    /// Model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in response
    pub max_tokens: u32,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;

        Ok(Self::new(api_key, "claude-sonnet-4-20250514".to_string()))
    }

    /// Create with custom settings
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            temperature: 0.0,
            max_tokens: 2048,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Anthropic messages API client
pub struct AnthropicClient {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build Anthropic HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl CompletionBackend for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
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

        let response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        response.into_text().ok_or(CompletionError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

impl AnthropicResponse {
    /// Concatenate the text blocks of the response
    fn into_text(self) -> Option<String> {
        let text: String = self
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect();

        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_blocks_are_joined() {
        let response: AnthropicResponse = serde_json::from_str(
            r#"{"content": [
                {"type": "text", "text": "Hello "},
                {"type": "tool_use", "name": "x", "input": {}},
                {"type": "text", "text": "world"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_empty_response_has_no_text() {
        let response: AnthropicResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert!(response.into_text().is_none());
    }

    #[test]
    fn test_config_is_deterministic_by_default() {
        let config = AnthropicConfig::new("key".to_string(), "model".to_string());
        assert_eq!(config.temperature, 0.0);
    }
}
