//! TOML configuration parsing and validation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use quarry_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use quarry_core::retrieve::DEFAULT_LIMIT;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per query.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `disabled`, `openai`, `ollama`, or `fixture`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    /// `disabled` or `openai`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_answer_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            timeout_secs: 60,
        }
    }
}

impl AnswerConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_answer_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be < chunking.chunk_size");
    }
    if config.retrieval.limit < 1 {
        anyhow::bail!("retrieval.limit must be >= 1");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() && config.embedding.provider != "fixture" {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "fixture" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or fixture.",
            other
        ),
    }

    match config.answer.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown answer provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.answer.is_enabled() && config.answer.model.is_none() {
        anyhow::bail!(
            "answer.model must be specified when provider is '{}'",
            config.answer.provider
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quarry.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let (_dir, path) = write_config("[db]\npath = \"data/quarry.sqlite\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.retrieval.limit, 3);
        assert!(!config.embedding.is_enabled());
        assert!(!config.answer.is_enabled());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let (_dir, path) = write_config(
            "[db]\npath = \"q.sqlite\"\n[chunking]\nchunk_size = 100\nchunk_overlap = 100\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn enabled_embedding_requires_dims() {
        let (_dir, path) =
            write_config("[db]\npath = \"q.sqlite\"\n[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn fixture_provider_needs_no_model() {
        let (_dir, path) =
            write_config("[db]\npath = \"q.sqlite\"\n[embedding]\nprovider = \"fixture\"\ndims = 64\n");
        let config = load_config(&path).unwrap();
        assert!(config.embedding.is_enabled());
        assert_eq!(config.embedding.dims, Some(64));
    }

    #[test]
    fn unknown_provider_rejected() {
        let (_dir, path) = write_config(
            "[db]\npath = \"q.sqlite\"\n[embedding]\nprovider = \"cohere\"\ndims = 4\n",
        );
        assert!(load_config(&path).is_err());
    }
}
