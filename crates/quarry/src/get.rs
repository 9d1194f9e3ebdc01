//! Document lifecycle commands: fetch by id and cascade delete.

use anyhow::{bail, Result};

use quarry_core::index::VectorIndex;

/// CLI entry point for `quarry get`.
pub async fn run_get<I>(index: &I, id: &str) -> Result<()>
where
    I: VectorIndex + ?Sized,
{
    let record = match index.get_document(id).await? {
        Some(record) => record,
        None => bail!("document not found: {}", id),
    };
    let doc = &record.document;

    println!("--- Document ---");
    println!("id:         {}", doc.id);
    println!("title:      {}", doc.title.as_deref().unwrap_or("(untitled)"));
    if let Some(ref source) = doc.source {
        println!("source:     {}", source);
    }
    if let Some(ref tags) = doc.tags {
        println!("tags:       {}", tags);
    }
    println!("created_at: {}", format_ts_iso(doc.created_at));
    println!();

    println!("--- Content ---");
    println!("{}", doc.content);
    println!();

    println!("--- Chunks ({}) ---", record.chunks.len());
    for chunk in &record.chunks {
        let marker = if chunk.embedded { "" } else { " (not embedded)" };
        println!("[chunk {}]{}", chunk.index, marker);
        println!("{}", chunk.content);
        println!();
    }

    Ok(())
}

/// CLI entry point for `quarry rm`. Deletes the document and all of its
/// chunks and vectors.
pub async fn run_rm<I>(index: &I, id: &str) -> Result<()>
where
    I: VectorIndex + ?Sized,
{
    if index.delete_document(id).await? {
        println!("deleted {}", id);
    } else {
        bail!("document not found: {}", id);
    }
    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
