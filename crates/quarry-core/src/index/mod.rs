//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait defines the storage operations the retrieval
//! pipeline needs, enabling pluggable backends (SQLite in the app crate,
//! in-memory here for tests). Chunk and vector are written together at
//! ingestion and never mutated; deleting a document cascades to its
//! chunks and vectors.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, Document};

/// A candidate row from a nearest-neighbor query: chunk identity and
/// content joined with its parent document's metadata and a raw
/// similarity score. The retriever validates and re-orders these before
/// callers see them.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub chunk_id: String,
    pub content: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub tags: Option<String>,
    pub created_at: i64,
    /// Cosine similarity to the query vector (higher is closer).
    pub similarity: f32,
}

/// A chunk as returned from [`VectorIndex::get_document`].
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub index: i64,
    pub content: String,
    pub embedded: bool,
}

/// A full document plus its chunks, ordered by chunk index.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub document: Document,
    pub chunks: Vec<ChunkRecord>,
}

/// Abstract vector storage backend.
///
/// The index owns the distance metric and the cascade-delete policy; the
/// retrieval pipeline consumes both as preconditions. An implementation
/// may serve [`nearest_neighbors`](VectorIndex::nearest_neighbors) through
/// a packaged ranking function or a raw scan-and-order query — callers
/// must not be able to tell which path ran.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The fixed vector dimension this index accepts.
    fn dims(&self) -> usize;

    /// Insert or replace a document row.
    async fn upsert_document(&self, doc: &Document) -> Result<()>;

    /// Write a chunk and its embedding vector as one unit.
    ///
    /// Fails without writing if `vector.len() != dims()`.
    async fn upsert_chunk(&self, chunk: &Chunk, vector: &[f32]) -> Result<()>;

    /// The `k` stored chunks closest to `query`, ordered by decreasing
    /// similarity. Fewer than `k` stored chunks returns all of them.
    async fn nearest_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Retrieve a document with its chunks ordered by index.
    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>>;

    /// Delete a document, cascading to its chunks and vectors.
    /// Returns whether the document existed.
    async fn delete_document(&self, id: &str) -> Result<bool>;

    /// Number of chunks currently stored.
    async fn count_chunks(&self) -> Result<u64>;
}
