//! LLM Client implementation
//!
//! Chat completion client for the OpenAI API (or any compatible endpoint).
//! The rendered prompt is sent as a single user message.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use pdfrag_core::{ConfigError, LlmClient, LlmConfig, RagError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// OpenAI API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            max_tokens: None,
            temperature,
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired(vec!["OPENAI_API_KEY".to_string()]))?;

        let mut client = Self::new(api_key.clone(), config.model.clone(), config.temperature)
            .with_base_url(config.base_url.clone());
        client.max_tokens = config.max_tokens;
        Ok(client)
    }

    /// Set custom base URL (for compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> OpenAiRequest<'a> {
        OpenAiRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Text of the first choice
fn first_choice_text(response: OpenAiResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| RagError::Llm("No response generated".to_string()))
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Llm(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Llm(format!("OpenAI error ({status}): {error_text}")));
        }

        let result: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| RagError::Llm(format!("Failed to parse response: {e}")))?;

        first_choice_text(result)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_openai_client_creation() {
        let client = OpenAiClient::new("test-key", "gpt-4o-mini", 0.7);
        assert_eq!(client.model(), "gpt-4o-mini");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_from_config() {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o".to_string(),
            max_tokens: Some(512),
            ..Default::default()
        };

        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.model(), "gpt-4o");
        assert_eq!(client.max_tokens, Some(512));
        assert!((client.temperature - 0.7).abs() < f32::EPSILON);

        let err = OpenAiClient::from_config(&LlmConfig::default()).err().unwrap();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn test_request_body() {
        let client = OpenAiClient::new("test-key", "gpt-4o-mini", 0.7);
        let body = serde_json::to_value(client.build_request("Olá")).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"], json!([{"role": "user", "content": "Olá"}]));
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let response: OpenAiResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Resposta."},
                "finish_reason": "stop"
            }]
        }))
        .unwrap();
        assert_eq!(first_choice_text(response).unwrap(), "Resposta.");

        let empty = OpenAiResponse { choices: vec![] };
        assert!(matches!(first_choice_text(empty), Err(RagError::Llm(_))));
    }
}
