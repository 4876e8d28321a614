use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a model service call.
///
/// A timeout is its own kind rather than a retry trigger; the critique
/// loop never retries a failed call, it aborts the turn.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model service unreachable: {0}")]
    Unreachable(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Model service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Model service returned an empty response")]
    EmptyResponse,

    #[error("Model configuration error: {0}")]
    ConfigError(String),
}

/// Configuration for one model service instance.
///
/// Passed by reference at construction; there is no process-wide model
/// configuration. `timeout` is mandatory.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Base URL of the model server, e.g. `http://localhost:11434`
    pub base_url: String,
    /// Model name, e.g. `gemma3:1b`
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Hard deadline for a single call
    pub timeout: Duration,
}

impl ModelConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            temperature: 0.1,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Output of a completion call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub duration: Duration,
}

/// A generative language model reachable over some transport.
#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Human-readable name for logs, e.g. `ollama/gemma3:1b`.
    fn name(&self) -> &str;

    /// Produce a text completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<Completion, ModelError>;
}

/// A text embedding model reachable over some transport.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    fn name(&self) -> &str;

    /// Embed `text` into the vector space the similarity index was
    /// built in.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;
}
