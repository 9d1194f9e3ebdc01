//! In-memory [`VectorIndex`] for tests and embedding-free experiments.
//!
//! `HashMap` and `Vec` behind `std::sync::RwLock`; nearest-neighbor
//! queries are brute-force cosine similarity over all stored vectors.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, Document};

use super::{ChunkRecord, DocumentRecord, Neighbor, VectorIndex};

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Brute-force in-memory index with a fixed vector dimension.
pub struct MemoryIndex {
    dims: usize,
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl MemoryIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            docs: RwLock::new(HashMap::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn upsert_chunk(&self, chunk: &Chunk, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dims {
            bail!(
                "vector dimension mismatch: index expects {}, got {}",
                self.dims,
                vector.len()
            );
        }
        let mut chunks = self.chunks.write().unwrap();
        chunks.retain(|sc| sc.chunk.id != chunk.id);
        chunks.push(StoredChunk {
            chunk: chunk.clone(),
            vector: vector.to_vec(),
        });
        Ok(())
    }

    async fn nearest_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let docs = self.docs.read().unwrap();
        let chunks = self.chunks.read().unwrap();

        let mut neighbors: Vec<Neighbor> = chunks
            .iter()
            .map(|sc| {
                let doc = docs.get(&sc.chunk.document_id);
                Neighbor {
                    chunk_id: sc.chunk.id.clone(),
                    content: sc.chunk.content.clone(),
                    title: doc.and_then(|d| d.title.clone()),
                    source: doc.and_then(|d| d.source.clone()),
                    tags: doc.and_then(|d| d.tags.clone()),
                    created_at: doc.map(|d| d.created_at).unwrap_or_default(),
                    similarity: cosine_similarity(query, &sc.vector),
                }
            })
            .collect();

        neighbors.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let docs = self.docs.read().unwrap();
        let document = match docs.get(id) {
            Some(d) => d.clone(),
            None => return Ok(None),
        };

        let chunks_guard = self.chunks.read().unwrap();
        let mut chunks: Vec<ChunkRecord> = chunks_guard
            .iter()
            .filter(|sc| sc.chunk.document_id == id)
            .map(|sc| ChunkRecord {
                index: sc.chunk.chunk_index,
                content: sc.chunk.content.clone(),
                embedded: true,
            })
            .collect();
        chunks.sort_by_key(|c| c.index);

        Ok(Some(DocumentRecord { document, chunks }))
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let existed = self.docs.write().unwrap().remove(id).is_some();
        self.chunks
            .write()
            .unwrap()
            .retain(|sc| sc.chunk.document_id != id);
        Ok(existed)
    }

    async fn count_chunks(&self) -> Result<u64> {
        Ok(self.chunks.read().unwrap().len() as u64)
    }
}
