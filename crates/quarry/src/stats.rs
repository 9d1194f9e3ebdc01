//! Database statistics overview.
//!
//! A quick summary of what's indexed: document and chunk counts,
//! embedding coverage, database size, and a per-source breakdown.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;

struct SourceStats {
    source: String,
    doc_count: i64,
    chunk_count: Option<i64>,
    embedded_count: Option<i64>,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config, pool: &SqlitePool) -> Result<()> {
    let total_docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(pool)
        .await?;

    let total_embedded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors")
        .fetch_one(pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Quarry — Database Stats");
    println!("=======================");
    println!();
    println!("  Database:  {}", config.db.path.display());
    println!("  Size:      {}", format_bytes(db_size));
    println!();
    println!("  Documents: {}", total_docs);
    println!("  Chunks:    {}", total_chunks);
    println!(
        "  Embedded:  {} / {} ({}%)",
        total_embedded,
        total_chunks,
        if total_chunks > 0 {
            (total_embedded * 100) / total_chunks
        } else {
            0
        }
    );

    let source_rows = sqlx::query(
        r#"
        SELECT
            COALESCE(d.source, '(none)') AS source,
            COUNT(DISTINCT d.id) AS doc_count,
            COUNT(DISTINCT c.id) AS chunk_count,
            COUNT(DISTINCT cv.chunk_id) AS embedded_count
        FROM documents d
        LEFT JOIN chunks c ON c.document_id = d.id
        LEFT JOIN chunk_vectors cv ON cv.chunk_id = c.id
        GROUP BY COALESCE(d.source, '(none)')
        ORDER BY doc_count DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let source_stats: Vec<SourceStats> = source_rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            doc_count: row.get("doc_count"),
            chunk_count: row.get("chunk_count"),
            embedded_count: row.get("embedded_count"),
        })
        .collect();

    if !source_stats.is_empty() {
        println!();
        println!("  By source:");
        println!(
            "  {:<24} {:>6} {:>8} {:>10}",
            "SOURCE", "DOCS", "CHUNKS", "EMBEDDED"
        );
        println!("  {}", "-".repeat(52));

        for s in &source_stats {
            println!(
                "  {:<24} {:>6} {:>8} {:>10}",
                s.source,
                s.doc_count,
                s.chunk_count.unwrap_or(0),
                s.embedded_count.unwrap_or(0)
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_format_scales() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
