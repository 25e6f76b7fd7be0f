//! Semantic indexing and retrieval pipeline for biographical profiles.
//!
//! Converts free-form bio entries into searchable vector embeddings:
//! deterministic sentence-aware segmentation, batched remote embedding
//! generation with retry, versioned per-owner reindexing, and cosine
//! similarity scoring for retrieval consumers.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        reason = "Test allows"
    )
)]

/// Embedding generation against the remote embedding service.
pub mod embedding;
/// Index lifecycle orchestration.
pub mod indexer;
/// Deterministic text segmentation.
pub mod segmenter;
/// Vector similarity scoring.
pub mod similarity;
/// Persistence seams and the in-memory reference store.
pub mod store;

#[cfg(test)]
pub use embedding::FakeEmbeddingClient;
pub use embedding::{
    BatchOptions, EmbeddingBackend, EmbeddingMode, EmbeddingOutcome, HttpEmbeddingClient,
    batch_generate_embeddings,
};
pub use indexer::{IndexOutcome, Indexer, RebuildSummary};
pub use segmenter::{
    Chunk, ChunkOptions, SegmentedCorpus, chunk_bio_entries, chunk_bio_entry, chunk_text,
};
pub use similarity::cosine_similarity;
pub use store::{ChunkStore, MemoryChunkStore, ProfileSource, ScoredChunk};
