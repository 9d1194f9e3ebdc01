//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Nearest-neighbor queries are served through one of two paths:
//!
//! 1. **Packaged ranking function** — if the deployment loads a vector
//!    extension that registers a `chunk_search(query_blob, k)` table
//!    function, the ranking happens inside SQLite.
//! 2. **Raw ordering query** — otherwise all stored vectors are scanned
//!    and ranked by cosine similarity in Rust.
//!
//! Both paths produce the same [`Neighbor`] shape; callers cannot tell
//! which one served a request. Stored vectors whose length disagrees
//! with the index dimension are reported as data-integrity errors rather
//! than scored.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use quarry_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use quarry_core::index::{ChunkRecord, DocumentRecord, Neighbor, VectorIndex};
use quarry_core::models::{Chunk, Document};

/// SQLite implementation of the [`VectorIndex`] trait.
pub struct SqliteIndex {
    pool: SqlitePool,
    dims: usize,
    model: String,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool, dims: usize, model: impl Into<String>) -> Self {
        Self {
            pool,
            dims,
            model: model.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ranked path: delegate ordering to a `chunk_search` SQL function.
    /// Fails when no vector extension registered it.
    async fn ranked_query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let blob = vec_to_blob(query);
        let rows = sqlx::query(
            r#"
            SELECT cs.chunk_id, cs.similarity,
                   c.content, d.title, d.source, d.tags, d.created_at
            FROM chunk_search(?, ?) cs
            JOIN chunks c ON c.id = cs.chunk_id
            JOIN documents d ON d.id = c.document_id
            "#,
        )
        .bind(&blob)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Neighbor {
                chunk_id: row.get("chunk_id"),
                content: row.get("content"),
                title: row.get("title"),
                source: row.get("source"),
                tags: row.get("tags"),
                created_at: row.get("created_at"),
                similarity: row.get::<f64, _>("similarity") as f32,
            })
            .collect())
    }

    /// Scan path: load every stored vector, rank by cosine similarity in
    /// Rust, truncate to `k`.
    async fn scan_query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let rows = sqlx::query(
            r#"
            SELECT cv.chunk_id, cv.embedding,
                   c.content, d.title, d.source, d.tags, d.created_at
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            JOIN documents d ON d.id = c.document_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut neighbors = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let vector = blob_to_vec(&blob);
            if vector.len() != self.dims {
                let chunk_id: String = row.get("chunk_id");
                bail!(
                    "stored vector for chunk {} has dimension {}, index expects {}",
                    chunk_id,
                    vector.len(),
                    self.dims
                );
            }
            neighbors.push(Neighbor {
                chunk_id: row.get("chunk_id"),
                content: row.get("content"),
                title: row.get("title"),
                source: row.get("source"),
                tags: row.get("tags"),
                created_at: row.get("created_at"),
                similarity: cosine_similarity(query, &vector),
            });
        }

        neighbors.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, title, source, tags, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                source = excluded.source,
                tags = excluded.tags,
                content = excluded.content
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.source)
        .bind(&doc.tags)
        .bind(&doc.content)
        .bind(doc.created_at)
        .execute(&self.pool)
        .await?;

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

        let blob = vec_to_blob(vector);
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, chunk_index, total_chunks, content, hash)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(document_id, chunk_index) DO UPDATE SET
                id = excluded.id,
                total_chunks = excluded.total_chunks,
                content = excluded.content,
                hash = excluded.hash
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(chunk.total_chunks)
        .bind(&chunk.content)
        .bind(&chunk.hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO chunk_vectors (chunk_id, document_id, embedding, model, dims, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(chunk_id) DO UPDATE SET
                embedding = excluded.embedding,
                model = excluded.model,
                dims = excluded.dims,
                created_at = excluded.created_at
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(&blob)
        .bind(&self.model)
        .bind(self.dims as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn nearest_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        match self.ranked_query(query, k).await {
            Ok(neighbors) => Ok(neighbors),
            Err(_) => self.scan_query(query, k).await,
        }
    }

    async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let doc_row = sqlx::query(
            "SELECT id, title, source, tags, content, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let doc_row = match doc_row {
            Some(row) => row,
            None => return Ok(None),
        };

        let document = Document {
            id: doc_row.get("id"),
            content: doc_row.get("content"),
            title: doc_row.get("title"),
            source: doc_row.get("source"),
            tags: doc_row.get("tags"),
            created_at: doc_row.get("created_at"),
        };

        let chunk_rows = sqlx::query(
            r#"
            SELECT c.chunk_index, c.content,
                   cv.chunk_id IS NOT NULL AS embedded
            FROM chunks c
            LEFT JOIN chunk_vectors cv ON cv.chunk_id = c.id
            WHERE c.document_id = ?
            ORDER BY c.chunk_index ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let chunks = chunk_rows
            .iter()
            .map(|row| ChunkRecord {
                index: row.get("chunk_index"),
                content: row.get("content"),
                embedded: row.get::<i64, _>("embedded") != 0,
            })
            .collect();

        Ok(Some(DocumentRecord { document, chunks }))
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn count_chunks(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
