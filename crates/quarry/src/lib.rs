//! Quarry application crate: SQLite-backed vector index, embedding and
//! answer providers, ingestion and query pipelines, and the CLI command
//! implementations.
//!
//! The chunking, retrieval, and assembly algorithms live in
//! [`quarry_core`]; this crate wires them to storage, configuration, and
//! external providers.

pub mod answer;
pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod sqlite_index;
pub mod stats;
