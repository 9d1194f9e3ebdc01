//! Embedding provider implementations.
//!
//! Concrete backends for the [`EmbeddingProvider`] trait:
//! - **`disabled`** — the default; every embed call errors.
//! - **`openai`** — `POST /v1/embeddings` with retry and backoff.
//! - **`ollama`** — a local Ollama instance's `/api/embed` endpoint.
//! - **`fixture`** — deterministic, network-free vectors derived from
//!   character trigram hashing; used by tests and offline smoke runs.
//!
//! Use [`create_provider`] to instantiate the provider named in the
//! configuration, then pass it to [`embed_texts`]/[`embed_query`] (the
//! embedding computation is kept in free functions due to async trait
//! limitations; the provider supplies model name and dimension).
//!
//! # Retry Strategy
//!
//! The HTTP providers use exponential backoff for transient errors:
//! HTTP 429 and 5xx retry, other 4xx fail immediately, network errors
//! retry. Backoff doubles from 1s, capped at 32s. Every request carries
//! the configured timeout; expiry counts as a provider failure.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use std::time::Duration;

pub use quarry_core::embedding::EmbeddingProvider;

use crate::config::EmbeddingConfig;

/// Instantiate the provider named in the configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        "fixture" => Ok(Box::new(FixtureProvider::new(config)?)),
        "disabled" => Ok(Box::new(DisabledProvider)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Embed a batch of texts with the given provider. Returns one vector
/// per input text, in input order.
///
/// The provider supplies the model identifier and dimension; `config`
/// supplies the transport settings (endpoint, retries, timeout).
pub async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    match config.provider.as_str() {
        "openai" => embed_openai(provider, config, texts).await,
        "ollama" => embed_ollama(provider, config, texts).await,
        "fixture" => embed_fixture(provider, texts),
        "disabled" => bail!("Embedding provider is disabled"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Embed a single query text.
pub async fn embed_query(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    text: &str,
) -> Result<Vec<f32>> {
    let results = embed_texts(provider, config, &[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

// ============ Disabled Provider ============

/// A no-op provider that always errors; the configured default.
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration. The
    /// `OPENAI_API_KEY` environment variable is read at embed time, not
    /// here, so commands that never embed work without it.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;

        Ok(Self { model, dims })
    }
}

impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

async fn embed_openai(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": provider.model_name(),
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_openai_embeddings(&json);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err =
                        Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("OpenAI API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
}

/// Extract `data[].embedding` arrays from the OpenAI response, in order.
fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        embeddings.push(vec);
    }

    Ok(embeddings)
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`).
pub struct OllamaProvider {
    model: String,
    dims: usize,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        Ok(Self { model, dims })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

async fn embed_ollama(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let url = config.url.as_deref().unwrap_or("http://localhost:11434");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": provider.model_name(),
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(format!("{}/api/embed", url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_ollama_embeddings(&json);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err =
                        Some(anyhow::anyhow!("Ollama API error {}: {}", status, body_text));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("Ollama API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    url,
                    e
                ));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Ollama embedding failed after retries")))
}

fn parse_ollama_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: embedding is not an array"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

// ============ Fixture Provider ============

/// Deterministic, network-free embedding provider.
///
/// Hashes character trigrams into `dims` buckets and L2-normalizes the
/// result, so similar texts produce similar vectors and identical texts
/// produce identical ones. Only suitable for tests and offline smoke
/// runs — it captures lexical, not semantic, similarity.
pub struct FixtureProvider {
    dims: usize,
}

impl FixtureProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for fixture provider"))?;
        Ok(Self { dims })
    }
}

impl EmbeddingProvider for FixtureProvider {
    fn model_name(&self) -> &str {
        "fixture"
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

fn embed_fixture(provider: &dyn EmbeddingProvider, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let dims = provider.dims();
    if dims == 0 {
        bail!("embedding.dims must be > 0 for fixture provider");
    }

    Ok(texts.iter().map(|t| fixture_vector(t, dims)).collect())
}

/// Fold the text's character trigrams into `dims` buckets and normalize.
fn fixture_vector(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims];
    let chars: Vec<char> = text.to_lowercase().chars().collect();

    for window in chars.windows(3) {
        let trigram: String = window.iter().collect();
        let digest = Sha256::digest(trigram.as_bytes());
        let bucket =
            u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize % dims;
        vector[bucket] += 1.0;
    }

    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}
