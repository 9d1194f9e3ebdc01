//! Core data models used throughout Quarry.
//!
//! These types represent the documents, chunks, and search results that flow
//! through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A document as submitted for ingestion. Immutable once ingested;
/// re-ingesting the same text creates a new document with new chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub tags: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}

impl Document {
    /// Build a new document with a fresh UUID and the given creation time.
    pub fn new(
        content: String,
        title: Option<String>,
        source: Option<String>,
        tags: Option<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            title,
            source,
            tags,
            created_at,
        }
    }
}

/// A bounded segment of text produced by the chunker, before persistence.
///
/// Indices from a single chunking call are contiguous `0..total_chunks-1`
/// and every chunk carries the same `total_chunks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A persisted chunk: a [`TextChunk`] bound to its parent document, with
/// a UUID and a SHA-256 content hash for staleness detection.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub chunk_index: i64,
    pub total_chunks: i64,
    pub hash: String,
}

impl Chunk {
    /// Bind a chunker output to a document, assigning a UUID and hash.
    pub fn from_text(document_id: &str, text: &TextChunk) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.content.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            content: text.content.clone(),
            chunk_index: text.chunk_index as i64,
            total_chunks: text.total_chunks as i64,
            hash,
        }
    }
}

/// A read-only projection joining a chunk's content and document metadata
/// with its similarity to the query. Ordering is scoped to a single
/// retrieval call and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub tags: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// A source attribution entry: chunk identity plus a bounded preview of
/// its content (at most 100 characters plus a truncation marker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub id: String,
    pub preview: String,
}

/// The output of context assembly: grounding text for the answer model
/// plus citations preserving retrieval order.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledContext {
    pub context_text: String,
    pub citations: Vec<Citation>,
}

/// Speaker role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a question-answering session, owned by the caller.
///
/// Assistant turns optionally carry the search results that grounded them.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SearchResult>>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: None,
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<SearchResult>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources: Some(sources),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_hash_is_deterministic() {
        let text = TextChunk {
            content: "hello world".to_string(),
            chunk_index: 0,
            total_chunks: 1,
        };
        let a = Chunk::from_text("doc1", &text);
        let b = Chunk::from_text("doc1", &text);
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn turn_roles_serialize_lowercase() {
        let turn = ConversationTurn::user("hi");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("sources").is_none());
    }
}
