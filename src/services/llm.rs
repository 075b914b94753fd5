//! Language-model backends for answer generation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, PipelineError};
use crate::models::LlmConfig;

/// Model selectors accepted in the request `model_id` field.
pub const SUPPORTED_MODELS: &[&str] = &["oss_llama-13b"];

/// A text-completion backend. Implementations must be safe for concurrent
/// calls; each call is independent and carries no session state.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    fn model_id(&self) -> &str;
}

/// Request body for the llama.cpp `/completion` endpoint.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    temperature: f32,
    n_predict: u32,
}

/// Response from the `/completion` endpoint.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

/// Client for a llama.cpp-compatible completion server hosting the local
/// quantized model.
pub struct LlamaServerClient {
    client: Client,
    base_url: String,
    model_id: String,
    temperature: f32,
    max_new_tokens: u32,
}

impl LlamaServerClient {
    pub fn new(model_id: &str, config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model_id: model_id.to_string(),
            temperature: config.temperature,
            max_new_tokens: config.max_new_tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LanguageModel for LlamaServerClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/completion", self.base_url);
        let request = CompletionRequest {
            prompt,
            temperature: self.temperature,
            n_predict: self.max_new_tokens,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::RequestError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(completion.content.trim().to_string())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Acquire a model handle for the request's `model_id` selector.
///
/// Unknown selectors fail before any handle construction. A configured but
/// unreadable model file fails here too, so a malformed deployment is caught
/// at prepare time instead of during generation.
pub fn acquire_model(
    model_id: &str,
    config: &LlmConfig,
) -> Result<Arc<dyn LanguageModel>, PipelineError> {
    if !SUPPORTED_MODELS.contains(&model_id) {
        return Err(PipelineError::InvalidParameters(format!(
            "invalid model value: {}",
            model_id
        )));
    }

    if let Some(path) = &config.model_path {
        std::fs::metadata(path).map_err(|e| {
            PipelineError::Initialization(format!(
                "llm model file {} is not readable: {}",
                path.display(),
                e
            ))
        })?;
    }

    let client = LlamaServerClient::new(model_id, config)
        .map_err(|e| PipelineError::Initialization(format!("issue in initialising llm: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_client_creation_trims_base_url() {
        let config = LlmConfig {
            url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let client = LlamaServerClient::new("oss_llama-13b", &config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.model_id(), "oss_llama-13b");
    }

    #[test]
    fn test_acquire_model_rejects_unknown_selector() {
        let config = LlmConfig::default();
        match acquire_model("oss_gpt-j", &config) {
            Err(PipelineError::InvalidParameters(msg)) => {
                assert!(msg.contains("oss_gpt-j"));
            }
            _ => panic!("expected invalid parameters error"),
        }
    }

    #[test]
    fn test_acquire_model_rejects_unreadable_model_path() {
        let config = LlmConfig {
            model_path: Some("/nonexistent/llama-2-13b-chat.Q4_0.gguf".into()),
            ..Default::default()
        };
        assert!(matches!(
            acquire_model("oss_llama-13b", &config),
            Err(PipelineError::Initialization(_))
        ));
    }

    #[test]
    fn test_acquire_model_accepts_readable_model_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"gguf").unwrap();
        let config = LlmConfig {
            model_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let model = acquire_model("oss_llama-13b", &config).unwrap();
        assert_eq!(model.model_id(), "oss_llama-13b");
    }
}
