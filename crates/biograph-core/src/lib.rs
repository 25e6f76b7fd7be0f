//! Core types for the biograph semantic indexing pipeline.
//!
//! This crate provides the shared data model, error handling, and
//! configuration used by the indexing and retrieval components.

/// Embedding service configuration.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Core data types for bio entries, chunks, and index metadata.
pub mod types;

pub use config::EmbeddingConfig;
pub use error::{Error, Result};
pub use types::{
    BioDocument, BioEntry, BioEntryType, ChunkMetadata, IndexMeta, IndexStats, IndexStatus,
    IndexedChunkRecord,
};
