//! Embedding generation: HTTP client, retry policy, and resilient batching.

mod batch;
mod client;

pub use batch::{BatchOptions, EmbeddingOutcome, batch_generate_embeddings};
#[cfg(test)]
pub use client::FakeEmbeddingClient;
pub use client::{EmbeddingBackend, EmbeddingMode, HttpEmbeddingClient};
