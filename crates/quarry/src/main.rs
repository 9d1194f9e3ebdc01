//! # Quarry CLI (`quarry`)
//!
//! The `quarry` binary is the primary interface for Quarry. It provides
//! commands for database initialization, document ingestion, semantic
//! search, question answering, document retrieval, and statistics.
//!
//! ## Usage
//!
//! ```bash
//! quarry --config ./config/quarry.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quarry init` | Create the SQLite database and run schema migrations |
//! | `quarry add <file>` | Chunk, embed, and index a document |
//! | `quarry search "<query>"` | Retrieve the nearest chunks for a query |
//! | `quarry ask "<question>"` | Retrieve, assemble context, and synthesize an answer |
//! | `quarry get <id>` | Retrieve a full document by UUID |
//! | `quarry rm <id>` | Delete a document and its chunks |
//! | `quarry stats` | Show document, chunk, and embedding counts |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! quarry init --config ./config/quarry.toml
//!
//! # Ingest a file
//! quarry add notes/onboarding.md --title "Onboarding" --tags docs
//!
//! # Ingest a literal
//! quarry add --text "The deploy window is Tuesday." --title "Deploys"
//!
//! # Semantic search
//! quarry search "when can we deploy"
//!
//! # Grounded question answering
//! quarry ask "what is the deploy window?"
//! ```

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use quarry::{ask, config, db, embedding, get, ingest, migrate, sqlite_index, stats};

/// Quarry CLI — a local-first document chunking, embedding, and
/// retrieval pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/quarry.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "quarry",
    about = "Quarry — a local-first document chunking, embedding, and retrieval pipeline",
    version,
    long_about = "Quarry ingests text documents, splits them into bounded overlapping chunks, \
    embeds each chunk with a configurable provider, and stores everything in SQLite. Queries \
    embed the question, retrieve the nearest chunks, and optionally synthesize a grounded \
    answer with citations."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/quarry.toml`. Database, chunking, retrieval,
    /// and provider settings are read from this file.
    #[arg(long, global = true, default_value = "./config/quarry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, chunks, chunk_vectors). This command is idempotent —
    /// running it multiple times is safe.
    Init,

    /// Chunk, embed, and index a document.
    ///
    /// Reads content from a file path or the `--text` flag, splits it
    /// into overlapping chunks, embeds each chunk concurrently, and
    /// stores the results. Prints per-chunk failures without discarding
    /// the chunks that succeeded.
    Add {
        /// Path to a text file to ingest.
        path: Option<PathBuf>,

        /// Ingest this literal text instead of reading a file.
        #[arg(long, conflicts_with = "path")]
        text: Option<String>,

        /// Document title.
        #[arg(long)]
        title: Option<String>,

        /// Document source label (e.g. `wiki`, `email`).
        #[arg(long)]
        source: Option<String>,

        /// Comma-separated tags.
        #[arg(long)]
        tags: Option<String>,
    },

    /// Retrieve the nearest chunks for a query.
    ///
    /// Embeds the query with the configured provider and prints the most
    /// similar chunks, ranked by cosine similarity.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question grounded in indexed documents.
    ///
    /// Retrieves the nearest chunks, assembles them into a context block,
    /// and asks the configured answer provider. Prints the answer followed
    /// by citations. Requires both an embedding and an answer provider.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Retrieve a document by its UUID.
    ///
    /// Prints the document's metadata, full content, and all chunks.
    Get {
        /// Document UUID.
        id: String,
    },

    /// Delete a document by its UUID.
    ///
    /// Removes the document together with its chunks and embedding
    /// vectors.
    Rm {
        /// Document UUID.
        id: String,
    },

    /// Show database statistics.
    ///
    /// Document, chunk, and embedding counts plus a per-source breakdown.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_init(&cfg).await?;
        }
        Commands::Add {
            path,
            text,
            title,
            source,
            tags,
        } => {
            let content = match (path, text) {
                (Some(path), None) => std::fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!("Failed to read {}: {}", path.display(), e)
                })?,
                (None, Some(text)) => text,
                (None, None) => bail!("provide a file path or --text"),
                (Some(_), Some(_)) => unreachable!(),
            };

            let provider = embedding::create_provider(&cfg.embedding)?;
            let index = open_index(&cfg, provider.as_ref()).await?;
            let request = ingest::IngestRequest {
                content,
                title,
                source,
                tags,
            };
            let result = ingest::run_add(&cfg, &index, provider.as_ref(), &request).await;
            index.pool().close().await;
            result?;
        }
        Commands::Search { query, limit } => {
            let provider = embedding::create_provider(&cfg.embedding)?;
            let index = open_index(&cfg, provider.as_ref()).await?;
            let limit = limit.unwrap_or(cfg.retrieval.limit);
            let result = ask::run_search(&cfg, &index, provider.as_ref(), &query, limit).await;
            index.pool().close().await;
            result?;
        }
        Commands::Ask { question } => {
            let provider = embedding::create_provider(&cfg.embedding)?;
            let index = open_index(&cfg, provider.as_ref()).await?;
            let result = ask::run_ask(&cfg, &index, provider.as_ref(), &question).await;
            index.pool().close().await;
            result?;
        }
        Commands::Get { id } => {
            let provider = embedding::create_provider(&cfg.embedding)?;
            let index = open_index(&cfg, provider.as_ref()).await?;
            let result = get::run_get(&index, &id).await;
            index.pool().close().await;
            result?;
        }
        Commands::Rm { id } => {
            let provider = embedding::create_provider(&cfg.embedding)?;
            let index = open_index(&cfg, provider.as_ref()).await?;
            let result = get::run_rm(&index, &id).await;
            index.pool().close().await;
            result?;
        }
        Commands::Stats => {
            let pool = db::connect(&cfg).await?;
            let result = stats::run_stats(&cfg, &pool).await;
            pool.close().await;
            result?;
        }
    }

    Ok(())
}

/// Open the SQLite-backed vector index for the configured database.
///
/// Dimension and model name come from the provider, so the index is
/// always consistent with whatever will produce its vectors.
async fn open_index(
    cfg: &config::Config,
    provider: &dyn embedding::EmbeddingProvider,
) -> anyhow::Result<sqlite_index::SqliteIndex> {
    let pool = db::connect(cfg).await?;
    Ok(sqlite_index::SqliteIndex::new(
        pool,
        provider.dims(),
        provider.model_name().to_string(),
    ))
}
