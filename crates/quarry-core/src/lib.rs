//! # Quarry Core
//!
//! Shared logic for Quarry: data models, the overlapping text chunker,
//! the vector index abstraction, the retrieval algorithm, and context
//! assembly for retrieval-augmented question answering.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or network
//! dependencies. The embedding model, the persistent vector store, and
//! the answer-generation model are external collaborators reached through
//! the traits defined here.

pub mod assemble;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod retrieve;

pub use error::QuarryError;
