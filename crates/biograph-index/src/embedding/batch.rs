//! Resilient batched embedding generation.
//!
//! The central contract here: N input texts always yield N outcome records,
//! in input order, each independently marked as succeeded or failed. One
//! text's permanent failure never aborts the batch.

use std::time::Duration;

use biograph_core::EmbeddingConfig;
use futures::future::join_all;
use tracing::{info, warn};

use super::client::{EmbeddingBackend, EmbeddingMode};

/// Batch pacing options.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Texts embedded concurrently per batch.
    pub batch_size: usize,
    /// Fixed cooldown between consecutive batches.
    pub batch_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay: Duration::from_millis(200),
        }
    }
}

impl From<&EmbeddingConfig> for BatchOptions {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            batch_delay: config.batch_delay,
        }
    }
}

/// Per-text result of a batch embedding run.
#[derive(Debug, Clone)]
pub struct EmbeddingOutcome {
    /// Position of the text in the input list.
    pub index: usize,
    /// The input text.
    pub text: String,
    /// The embedding, when generation succeeded.
    pub embedding: Option<Vec<f32>>,
    /// Whether generation succeeded.
    pub success: bool,
    /// Human-readable failure description, when it did not.
    pub error: Option<String>,
}

/// Embed a list of texts in fixed-size concurrent batches.
///
/// Within a batch, requests fan out concurrently and are joined before the
/// next batch starts, bounding in-flight calls to `batch_size`. Between
/// batches a fixed cooldown respects external rate limits. Always returns one
/// outcome per input text, preserving input order.
pub async fn batch_generate_embeddings<E: EmbeddingBackend>(
    client: &E,
    texts: &[String],
    mode: EmbeddingMode,
    options: &BatchOptions,
) -> Vec<EmbeddingOutcome> {
    let mut outcomes = Vec::with_capacity(texts.len());
    if texts.is_empty() {
        return outcomes;
    }

    let batch_size = options.batch_size.max(1);
    let total_batches = texts.len().div_ceil(batch_size);

    for (batch_idx, batch) in texts.chunks(batch_size).enumerate() {
        let base = batch_idx * batch_size;
        let requests = batch.iter().enumerate().map(|(offset, text)| async move {
            (base + offset, text, client.embed(text, mode).await)
        });

        for (index, text, result) in join_all(requests).await {
            match result {
                Ok(embedding) => outcomes.push(EmbeddingOutcome {
                    index,
                    text: text.clone(),
                    embedding: Some(embedding),
                    success: true,
                    error: None,
                }),
                Err(error) => {
                    warn!("Embedding failed for text {index}: {error}");
                    outcomes.push(EmbeddingOutcome {
                        index,
                        text: text.clone(),
                        embedding: None,
                        success: false,
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        if batch_idx + 1 < total_batches && !options.batch_delay.is_zero() {
            tokio::time::sleep(options.batch_delay).await;
        }
    }

    let succeeded = outcomes.iter().filter(|outcome| outcome.success).count();
    info!(
        "Embedded {succeeded}/{} texts ({} failed)",
        outcomes.len(),
        outcomes.len() - succeeded
    );

    outcomes
}
