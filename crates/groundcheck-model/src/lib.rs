//! # groundcheck-model
//!
//! Capability traits for the external model services the critique loop
//! consumes, plus the Ollama-backed implementation.
//!
//! The loop never constructs a service by name at runtime; callers pick
//! a concrete implementation and pass it in as `&dyn
//! LanguageModelService` / `&dyn EmbeddingService` at construction.

mod ollama;
mod traits;

pub use ollama::{OllamaEmbedder, OllamaService};
pub use traits::{
    Completion, EmbeddingService, LanguageModelService, ModelConfig, ModelError,
};
