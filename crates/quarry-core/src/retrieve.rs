//! Retrieval: nearest-neighbor search normalized into [`SearchResult`]s.
//!
//! Delegates to [`VectorIndex::nearest_neighbors`] and validates the
//! response at the boundary, so callers always see the same strongly
//! typed, similarity-ordered result shape regardless of which query path
//! the index used. Validation errors are rejected before any index call;
//! index failures surface as [`QuarryError::Provider`].

use crate::error::QuarryError;
use crate::index::VectorIndex;
use crate::models::SearchResult;

/// Default number of results returned when the caller does not specify one.
pub const DEFAULT_LIMIT: usize = 3;

/// Return the `limit` chunks most similar to `query_vec`, ordered by
/// non-increasing similarity.
///
/// `limit` must be at least 1 and `query_vec` must match the index
/// dimension; both are checked before the index is touched. An index
/// holding fewer than `limit` chunks returns all of them, and an empty
/// index returns an empty list rather than an error.
pub async fn search<I>(
    index: &I,
    query_vec: &[f32],
    limit: usize,
) -> Result<Vec<SearchResult>, QuarryError>
where
    I: VectorIndex + ?Sized,
{
    if limit < 1 {
        return Err(QuarryError::validation("limit must be >= 1"));
    }
    if query_vec.is_empty() {
        return Err(QuarryError::validation("query vector is empty"));
    }
    if query_vec.len() != index.dims() {
        return Err(QuarryError::DimensionMismatch {
            expected: index.dims(),
            actual: query_vec.len(),
        });
    }

    let mut neighbors = index
        .nearest_neighbors(query_vec, limit)
        .await
        .map_err(QuarryError::Provider)?;

    // Backends may rank through a packaged function or a raw ordering
    // query; normalize the ordering here so callers never observe the
    // difference.
    neighbors.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    neighbors.truncate(limit);

    Ok(neighbors
        .into_iter()
        .map(|n| SearchResult {
            id: n.chunk_id,
            content: n.content,
            title: n.title,
            source: n.source,
            tags: n.tags,
            created_at: n.created_at,
            similarity: Some(n.similarity),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use crate::models::{Chunk, Document, TextChunk};

    async fn seeded_index(vectors: &[(&str, [f32; 2])]) -> MemoryIndex {
        let index = MemoryIndex::new(2);
        let doc = Document {
            id: "d1".to_string(),
            content: String::new(),
            title: Some("doc".to_string()),
            source: Some("unit-test".to_string()),
            tags: None,
            created_at: 1_700_000_000,
        };
        index.upsert_document(&doc).await.unwrap();
        for (i, (content, vec)) in vectors.iter().enumerate() {
            let chunk = Chunk::from_text(
                "d1",
                &TextChunk {
                    content: content.to_string(),
                    chunk_index: i,
                    total_chunks: vectors.len(),
                },
            );
            index.upsert_chunk(&chunk, vec).await.unwrap();
        }
        index
    }

    #[tokio::test]
    async fn returns_limit_results_ordered() {
        let index = seeded_index(&[
            ("a", [1.0, 0.0]),
            ("b", [0.9, 0.1]),
            ("c", [0.0, 1.0]),
            ("d", [0.8, 0.2]),
            ("e", [-1.0, 0.0]),
        ])
        .await;

        let results = search(&index, &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 3);
        let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "d"]);
        for window in results.windows(2) {
            assert!(window[0].similarity.unwrap() >= window[1].similarity.unwrap());
        }
    }

    #[tokio::test]
    async fn fewer_candidates_than_limit_returns_all() {
        let index = seeded_index(&[("a", [1.0, 0.0]), ("b", [0.0, 1.0])]).await;
        let results = search(&index, &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn empty_index_returns_empty_list() {
        let index = MemoryIndex::new(2);
        let results = search(&index, &[1.0, 0.0], 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_limit_is_a_validation_error() {
        let index = MemoryIndex::new(2);
        let err = search(&index, &[1.0, 0.0], 0).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_integrity_error() {
        let index = MemoryIndex::new(2);
        let err = search(&index, &[1.0, 0.0, 0.0], 3).await.unwrap_err();
        assert!(matches!(
            err,
            QuarryError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn results_carry_document_metadata() {
        let index = seeded_index(&[("a", [1.0, 0.0])]).await;
        let results = search(&index, &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].title.as_deref(), Some("doc"));
        assert_eq!(results[0].source.as_deref(), Some("unit-test"));
        assert_eq!(results[0].created_at, 1_700_000_000);
    }
}
