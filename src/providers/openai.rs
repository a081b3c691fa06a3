//! OpenAI-compatible chat-completions provider
//!
//! Covers DeepSeek, OpenAI, and any other endpoint speaking the
//! `/chat/completions` dialect. The API key is read from the environment
//! variable named in the model's config entry, never from the config
//! file itself.

use crate::config::ModelConfig;
use crate::error::{ChronicaError, Result};
use crate::providers::base::{ChatMessage, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request body for the chat-completions endpoint
#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

/// Response body from the chat-completions endpoint
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text generator backed by an OpenAI-compatible HTTP endpoint
#[derive(Debug)]
pub struct OpenAiCompatGenerator {
    label: String,
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatGenerator {
    /// Create a generator from a model table entry
    ///
    /// # Arguments
    ///
    /// * `label` - The config table label for this model
    /// * `config` - Endpoint and sampling settings
    ///
    /// # Errors
    ///
    /// Returns `ChronicaError::Provider` if the configured API key
    /// environment variable is named but not set.
    pub fn new(label: impl Into<String>, config: &ModelConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                ChronicaError::Provider(format!(
                    "API key environment variable {} is not set",
                    var
                ))
            })?),
            None => None,
        };

        let label = label.into();
        tracing::info!(
            "Initialized generator {}: model={} base={}",
            label,
            config.model,
            config.base_url
        );

        Ok(Self {
            label,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            temperature: config.temperature,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            stream: false,
        };

        tracing::debug!(
            "Sending completion request to {}: {} messages",
            url,
            request.messages.len()
        );

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Completion request failed: {}", e);
            ChronicaError::Provider(format!("Completion request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Provider returned error {}: {}", status, error_text);
            return Err(ChronicaError::Provider(format!(
                "Provider returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse completion response: {}", e);
            ChronicaError::Provider(format!("Failed to parse completion response: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(
                ChronicaError::Provider("Provider returned an empty completion".to_string())
                    .into(),
            );
        }

        Ok(content)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model_config(base_url: &str) -> ModelConfig {
        ModelConfig {
            model: "test-model".to_string(),
            base_url: base_url.to_string(),
            api_key_env: None,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn test_generate_returns_completion_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "a short summary"}}
                ]
            })))
            .mount(&server)
            .await;

        let generator =
            OpenAiCompatGenerator::new("test", &model_config(&server.uri())).expect("create");
        let result = generator
            .generate(&[ChatMessage::user("summarize this")])
            .await
            .expect("generate failed");

        assert_eq!(result, "a short summary");
    }

    #[tokio::test]
    async fn test_generate_maps_http_error_to_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let generator =
            OpenAiCompatGenerator::new("test", &model_config(&server.uri())).expect("create");
        let err = generator
            .generate(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": ""}}
                ]
            })))
            .mount(&server)
            .await;

        let generator =
            OpenAiCompatGenerator::new("test", &model_config(&server.uri())).expect("create");
        let err = generator
            .generate(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_new_strips_trailing_slash_from_base_url() {
        let generator =
            OpenAiCompatGenerator::new("test", &model_config("http://localhost:9999/v1/"))
                .expect("create");
        assert_eq!(generator.base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn test_new_fails_when_key_env_missing() {
        let mut config = model_config("http://localhost:9999");
        config.api_key_env = Some("CHRONICA_TEST_DEFINITELY_UNSET_KEY".to_string());
        let err = OpenAiCompatGenerator::new("test", &config).unwrap_err();
        assert!(err.to_string().contains("not set"));
    }
}
