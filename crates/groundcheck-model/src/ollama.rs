//! Ollama-backed model services.
//!
//! Talks to the Ollama HTTP API: `/api/generate` for completions and
//! `/api/embeddings` for query embeddings. Every request carries the
//! configured timeout; exceeding it surfaces as [`ModelError::Timeout`],
//! never an internal retry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::traits::{
    Completion, EmbeddingService, LanguageModelService, ModelConfig, ModelError,
};

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

/// Generative model served by Ollama.
pub struct OllamaService {
    client: Client,
    config: ModelConfig,
    name: String,
}

impl OllamaService {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::ConfigError(e.to_string()))?;
        let name = format!("ollama/{}", config.model);
        Ok(Self {
            client,
            config,
            name,
        })
    }
}

#[async_trait]
impl LanguageModelService for OllamaService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, ModelError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let body = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.config.temperature },
        });

        debug!(model = %self.name, prompt_chars = prompt.len(), "Requesting completion");
        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| map_request_error(e, self.config.timeout))?;
        if parsed.response.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }

        let duration = started.elapsed();
        debug!(
            model = %self.name,
            answer_chars = parsed.response.len(),
            duration_secs = duration.as_secs_f64(),
            "Completion received"
        );
        Ok(Completion {
            text: parsed.response,
            duration,
        })
    }
}

/// Embedding model served by Ollama.
pub struct OllamaEmbedder {
    client: Client,
    config: ModelConfig,
    name: String,
}

impl OllamaEmbedder {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::ConfigError(e.to_string()))?;
        let name = format!("ollama/{}", config.model);
        Ok(Self {
            client,
            config,
            name,
        })
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let body = json!({
            "model": self.config.model,
            "prompt": text,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| map_request_error(e, self.config.timeout))?;
        if parsed.embedding.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(parsed.embedding)
    }
}

fn map_request_error(error: reqwest::Error, timeout: Duration) -> ModelError {
    if error.is_timeout() {
        ModelError::Timeout(timeout)
    } else {
        ModelError::Unreachable(error.to_string())
    }
}
