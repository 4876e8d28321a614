//! Project configuration file support for groundcheck.
//!
//! Loads configuration from `groundcheck.toml` in the working
//! directory. Everything is optional; defaults match a local Ollama
//! setup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "groundcheck.toml";

/// Project-level configuration loaded from `groundcheck.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Path to the JSONL passage index
    pub index_path: Option<PathBuf>,
    /// Generate/judge round-trips allowed per turn
    pub max_cycles: Option<usize>,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub generation: RoleConfig,
    #[serde(default)]
    pub judge: RoleConfig,
    #[serde(default)]
    pub embedding: RoleConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Passages retrieved per turn
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server
    pub base_url: Option<String>,
}

/// Configuration for one model role (generation, judge, or embedding)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }
}
