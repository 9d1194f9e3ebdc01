//! Query pipelines: `search` (embed, retrieve, print) and `ask`
//! (embed, retrieve, assemble, synthesize).

use anyhow::{Context, Result};

use quarry_core::assemble::assemble;
use quarry_core::index::VectorIndex;
use quarry_core::models::{AssembledContext, ConversationTurn, SearchResult};
use quarry_core::retrieve;

use crate::answer::create_synthesizer;
use crate::config::Config;
use crate::embedding::{self, EmbeddingProvider};

/// Embed the query and retrieve the `limit` nearest chunks.
pub async fn search_chunks<I>(
    config: &Config,
    index: &I,
    provider: &dyn EmbeddingProvider,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>>
where
    I: VectorIndex + ?Sized,
{
    let query_vec = embedding::embed_query(provider, &config.embedding, query)
        .await
        .context("Failed to embed query")?;
    let results = retrieve::search(index, &query_vec, limit).await?;
    Ok(results)
}

/// The full question-answering pipeline: retrieve, assemble, synthesize.
///
/// Returns the answer text plus the assembled context whose citations
/// grounded it.
pub async fn answer_question<I>(
    config: &Config,
    index: &I,
    provider: &dyn EmbeddingProvider,
    question: &str,
    history: &[ConversationTurn],
) -> Result<(String, AssembledContext)>
where
    I: VectorIndex + ?Sized,
{
    let synthesizer = create_synthesizer(&config.answer)?;
    let results =
        search_chunks(config, index, provider, question, config.retrieval.limit).await?;
    let assembled = assemble(&results);
    let text = synthesizer
        .synthesize(question, &assembled.context_text, history)
        .await?;
    Ok((text, assembled))
}

/// CLI entry point for `quarry search`.
pub async fn run_search<I>(
    config: &Config,
    index: &I,
    provider: &dyn EmbeddingProvider,
    query: &str,
    limit: usize,
) -> Result<()>
where
    I: VectorIndex + ?Sized,
{
    let results = search_chunks(config, index, provider, query, limit).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let title_display = result.title.as_deref().unwrap_or("(untitled)");
        let date = chrono::DateTime::from_timestamp(result.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        println!(
            "{}. [{:.4}] {}",
            i + 1,
            result.similarity.unwrap_or(0.0),
            title_display
        );
        if let Some(ref source) = result.source {
            println!("    source: {}", source);
        }
        if let Some(ref tags) = result.tags {
            println!("    tags: {}", tags);
        }
        println!("    added: {}", date);
        println!("    excerpt: \"{}\"", excerpt(&result.content, 160));
        println!("    id: {}", result.id);
        println!();
    }

    Ok(())
}

/// CLI entry point for `quarry ask`.
pub async fn run_ask<I>(
    config: &Config,
    index: &I,
    provider: &dyn EmbeddingProvider,
    question: &str,
) -> Result<()>
where
    I: VectorIndex + ?Sized,
{
    let (text, assembled) = answer_question(config, index, provider, question, &[]).await?;

    println!("{}", text);

    if !assembled.citations.is_empty() {
        println!();
        println!("Sources:");
        for citation in &assembled.citations {
            println!("  [{}] {}", citation.id, citation.preview);
        }
    }

    Ok(())
}

/// Single-line excerpt of at most `max_chars` characters.
fn excerpt(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= max_chars {
        return flat.to_string();
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;
    use quarry_core::index::memory::MemoryIndex;
    use quarry_core::models::{Chunk, Document, TextChunk};

    fn fixture_config(dims: usize) -> Config {
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

    async fn seed(
        index: &MemoryIndex,
        config: &Config,
        provider: &dyn EmbeddingProvider,
        title: &str,
        content: &str,
    ) {
        let document = Document::new(
            content.to_string(),
            Some(title.to_string()),
            None,
            None,
            0,
        );
        let chunk = Chunk::from_text(
            &document.id,
            &TextChunk {
                content: content.to_string(),
                chunk_index: 0,
                total_chunks: 1,
            },
        );
        let vector = embedding::embed_query(provider, &config.embedding, content)
            .await
            .unwrap();
        index.upsert_document(&document).await.unwrap();
        index.upsert_chunk(&chunk, &vector).await.unwrap();
    }

    #[tokio::test]
    async fn search_ranks_lexically_similar_chunk_first() {
        let config = fixture_config(64);
        let index = MemoryIndex::new(64);
        let provider = fixture_provider(&config);
        seed(
            &index,
            &config,
            provider.as_ref(),
            "rust",
            "rust borrow checker and ownership semantics",
        )
        .await;
        seed(
            &index,
            &config,
            provider.as_ref(),
            "cooking",
            "slow roasted vegetables with garlic",
        )
        .await;

        let results = search_chunks(
            &config,
            &index,
            provider.as_ref(),
            "rust ownership semantics",
            2,
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title.as_deref(), Some("rust"));
    }

    #[tokio::test]
    async fn search_on_empty_index_returns_no_results() {
        let config = fixture_config(64);
        let index = MemoryIndex::new(64);
        let provider = fixture_provider(&config);
        let results = search_chunks(&config, &index, provider.as_ref(), "anything", 3)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn ask_with_disabled_answer_provider_errors() {
        let config = fixture_config(64);
        let index = MemoryIndex::new(64);
        let provider = fixture_provider(&config);
        seed(
            &index,
            &config,
            provider.as_ref(),
            "doc",
            "some indexed content about widgets",
        )
        .await;

        let err = answer_question(
            &config,
            &index,
            provider.as_ref(),
            "what about widgets?",
            &[],
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn excerpt_flattens_and_bounds() {
        assert_eq!(excerpt("a\nb\nc", 10), "a b c");
        let long = "x".repeat(200);
        let e = excerpt(&long, 160);
        assert_eq!(e.chars().count(), 163);
        assert!(e.ends_with("..."));
    }
}
