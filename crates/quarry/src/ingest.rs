//! Ingestion pipeline: text → chunks → embeddings → vector index.
//!
//! Chunk indices are assigned deterministically before any embedding
//! call is dispatched, so persisted results reconstruct in order no
//! matter how the concurrent calls complete. Each chunk's embedding and
//! index write runs as its own future, fanned out with `join_all`, and
//! the report carries one outcome per chunk — partial success is
//! observable and the caller owns retry policy.

use anyhow::anyhow;
use futures::future::join_all;
use serde::Serialize;

use quarry_core::chunk::{split_text, ChunkOptions};
use quarry_core::index::VectorIndex;
use quarry_core::models::{Chunk, Document};
use quarry_core::QuarryError;

use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};

/// Input to a single ingestion call.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub content: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub tags: Option<String>,
}

/// Outcome of one chunk's embed-and-write, in chunk-index order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChunkOutcome {
    Embedded { chunk_index: i64, chunk_id: String },
    Failed { chunk_index: i64, reason: String },
}

/// Result of ingesting one document.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub total_chunks: usize,
    pub outcomes: Vec<ChunkOutcome>,
}

impl IngestReport {
    pub fn embedded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChunkOutcome::Embedded { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.total_chunks - self.embedded_count()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Chunk, embed, and store one document.
///
/// Validation failures (empty content, disabled provider) are rejected
/// before any external call. The document row is written first; chunks
/// whose embedding or write fails are reported, not written, and do not
/// abort the remaining chunks.
pub async fn ingest_document<I>(
    config: &Config,
    index: &I,
    provider: &dyn EmbeddingProvider,
    request: &IngestRequest,
) -> Result<IngestReport, QuarryError>
where
    I: VectorIndex + ?Sized,
{
    if request.content.trim().is_empty() {
        return Err(QuarryError::validation("document content is empty"));
    }
    if !config.embedding.is_enabled() {
        return Err(QuarryError::validation(
            "embedding provider is disabled; set [embedding] provider in config",
        ));
    }

    let options = ChunkOptions {
        chunk_size: config.chunking.chunk_size,
        chunk_overlap: config.chunking.chunk_overlap,
        separator: None,
    };
    let now = chrono::Utc::now().timestamp();

    let document = Document::new(
        request.content.clone(),
        request.title.clone(),
        request.source.clone(),
        request.tags.clone(),
        now,
    );

    // Indices and ids are fixed here, before any embedding dispatch.
    let chunks: Vec<Chunk> = split_text(&document.content, &options)
        .iter()
        .map(|t| Chunk::from_text(&document.id, t))
        .collect();

    index
        .upsert_document(&document)
        .await
        .map_err(QuarryError::Provider)?;

    let tasks = chunks.iter().map(|chunk| async move {
        match embed_and_store(config, index, provider, chunk).await {
            Ok(()) => ChunkOutcome::Embedded {
                chunk_index: chunk.chunk_index,
                chunk_id: chunk.id.clone(),
            },
            Err(e) => ChunkOutcome::Failed {
                chunk_index: chunk.chunk_index,
                reason: format!("{:#}", e),
            },
        }
    });

    // join_all preserves input order, so outcomes line up with indices.
    let outcomes = join_all(tasks).await;

    Ok(IngestReport {
        document_id: document.id,
        total_chunks: chunks.len(),
        outcomes,
    })
}

async fn embed_and_store<I>(
    config: &Config,
    index: &I,
    provider: &dyn EmbeddingProvider,
    chunk: &Chunk,
) -> anyhow::Result<()>
where
    I: VectorIndex + ?Sized,
{
    let vector = embedding::embed_query(provider, &config.embedding, &chunk.content).await?;
    if vector.len() != index.dims() {
        return Err(anyhow!(
            "embedding gateway returned dimension {}, index expects {}",
            vector.len(),
            index.dims()
        ));
    }
    index.upsert_chunk(chunk, &vector).await?;
    Ok(())
}

/// CLI entry point for `quarry add`.
pub async fn run_add<I>(
    config: &Config,
    index: &I,
    provider: &dyn EmbeddingProvider,
    request: &IngestRequest,
) -> anyhow::Result<()>
where
    I: VectorIndex + ?Sized,
{
    let report = ingest_document(config, index, provider, request).await?;

    let title = request.title.as_deref().unwrap_or("(untitled)");
    println!("add {}", title);
    println!("  chunks: {}", report.total_chunks);
    println!("  embedded: {}", report.embedded_count());
    if report.failed_count() > 0 {
        println!("  failed: {}", report.failed_count());
        for outcome in &report.outcomes {
            if let ChunkOutcome::Failed {
                chunk_index,
                reason,
            } = outcome
            {
                eprintln!("  chunk {}: {}", chunk_index, reason);
            }
        }
    }
    println!("  document id: {}", report.document_id);
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::index::memory::MemoryIndex;

    fn fixture_config(dims: usize) -> Config {
        use crate::config::*;
        Config {
            db: DbConfig {
                path: "unused.sqlite".into(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig {
                provider: "fixture".to_string(),
                dims: Some(dims),
                ..EmbeddingConfig::default()
            },
            answer: AnswerConfig::default(),
        }
    }

    fn fixture_provider(config: &Config) -> Box<dyn EmbeddingProvider> {
        embedding::create_provider(&config.embedding).unwrap()
    }

    #[tokio::test]
    async fn empty_content_rejected_before_any_write() {
        let config = fixture_config(16);
        let index = MemoryIndex::new(16);
        let provider = fixture_provider(&config);
        let err = ingest_document(
            &config,
            &index,
            provider.as_ref(),
            &IngestRequest {
                content: "   \n ".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(index.count_chunks().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn disabled_provider_rejected_upfront() {
        let mut config = fixture_config(16);
        config.embedding.provider = "disabled".to_string();
        let index = MemoryIndex::new(16);
        let provider = fixture_provider(&config);
        let err = ingest_document(
            &config,
            &index,
            provider.as_ref(),
            &IngestRequest {
                content: "some text".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn small_document_yields_one_embedded_chunk() {
        let config = fixture_config(16);
        let index = MemoryIndex::new(16);
        let provider = fixture_provider(&config);
        let report = ingest_document(
            &config,
            &index,
            provider.as_ref(),
            &IngestRequest {
                content: "A short note about nothing in particular.".to_string(),
                title: Some("note".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(report.total_chunks, 1);
        assert!(report.is_complete());
        assert_eq!(index.count_chunks().await.unwrap(), 1);

        let record = index
            .get_document(&report.document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.document.title.as_deref(), Some("note"));
    }

    #[tokio::test]
    async fn long_document_fans_out_per_chunk() {
        let config = fixture_config(16);
        let index = MemoryIndex::new(16);
        let provider = fixture_provider(&config);
        let paragraphs: Vec<String> = (0..6)
            .map(|i| format!("Paragraph {} about topic {}. {}", i, i, "words ".repeat(60)))
            .collect();
        let report = ingest_document(
            &config,
            &index,
            provider.as_ref(),
            &IngestRequest {
                content: paragraphs.join("\n\n"),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(report.total_chunks > 1);
        assert!(report.is_complete());
        assert_eq!(
            index.count_chunks().await.unwrap(),
            report.total_chunks as u64
        );

        // Outcomes are in chunk-index order regardless of completion order.
        for (i, outcome) in report.outcomes.iter().enumerate() {
            match outcome {
                ChunkOutcome::Embedded { chunk_index, .. } => {
                    assert_eq!(*chunk_index, i as i64)
                }
                ChunkOutcome::Failed { .. } => panic!("unexpected failure"),
            }
        }
    }

    #[tokio::test]
    async fn gateway_dimension_mismatch_reported_per_chunk() {
        // Index expects 32 dims but the provider is configured for 16:
        // every chunk fails, the document row still exists, and the
        // report says exactly what happened.
        let config = fixture_config(16);
        let index = MemoryIndex::new(32);
        let provider = fixture_provider(&config);
        let report = ingest_document(
            &config,
            &index,
            provider.as_ref(),
            &IngestRequest {
                content: "Mismatch test content.".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(report.embedded_count(), 0);
        assert_eq!(report.failed_count(), report.total_chunks);
        assert_eq!(index.count_chunks().await.unwrap(), 0);
        assert!(index
            .get_document(&report.document_id)
            .await
            .unwrap()
            .is_some());
    }
}
