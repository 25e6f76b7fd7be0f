//! Remote embedding client with retry and dimension validation.

use std::future::Future;
use std::time::Duration;

use biograph_core::{EmbeddingConfig, Error, Result};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Embedding request mode.
///
/// Some embedding models produce asymmetric representations: content to be
/// indexed and text used to search are embedded differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMode {
    /// Content that will be stored and searched over.
    Document,
    /// Text used to search the stored content.
    Query,
}

impl EmbeddingMode {
    /// Wire-level task type for this mode.
    pub fn task_type(self) -> &'static str {
        match self {
            Self::Document => "RETRIEVAL_DOCUMENT",
            Self::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Trait for generating embeddings from text.
///
/// Implemented by the HTTP client and by test fakes, so the indexer never
/// depends on process-wide client state.
pub trait EmbeddingBackend: Send + Sync {
    /// Expected dimensionality of every returned vector.
    fn dimension(&self) -> usize;

    /// Generate an embedding for text in the given mode.
    ///
    /// # Errors
    /// Returns an error if the text is empty, the service is unreachable
    /// after retries, or the returned vector has the wrong dimensionality.
    fn embed(&self, text: &str, mode: EmbeddingMode)
    -> impl Future<Output = Result<Vec<f32>>> + Send;
}

/// HTTP embedding client for a Gemini-style `embedContent` endpoint.
#[derive(Debug)]
pub struct HttpEmbeddingClient {
    http: HttpClient,
    config: EmbeddingConfig,
    endpoint: String,
}

impl HttpEmbeddingClient {
    /// Create a client from explicit configuration.
    ///
    /// # Errors
    /// Returns [`Error::MissingApiKey`] when no credential is configured.
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let Some(api_key) = config.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
        else {
            return Err(Error::MissingApiKey("EMBEDDING_API_KEY".to_owned()));
        };

        let endpoint = format!(
            "{}/models/{}:embedContent?key={}",
            config.base_url.trim_end_matches('/'),
            config.model,
            api_key
        );

        Ok(Self {
            http: HttpClient::new(),
            config,
            endpoint,
        })
    }

    /// Create a client from environment configuration.
    ///
    /// # Errors
    /// Returns an error if no credential is present in the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(EmbeddingConfig::from_env())
    }

    /// Embed content for indexing.
    ///
    /// # Errors
    /// See [`EmbeddingBackend::embed`].
    pub async fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text, EmbeddingMode::Document).await
    }

    /// Embed a search query.
    ///
    /// # Errors
    /// See [`EmbeddingBackend::embed`].
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(text, EmbeddingMode::Query).await
    }

    /// Issue one embedding request without retry handling.
    async fn request_embedding(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        let request = EmbedContentRequest {
            model: format!("models/{}", self.config.model),
            content: RequestContent {
                parts: vec![RequestPart { text }],
            },
            task_type: mode.task_type(),
            output_dimensionality: self.config.dimension,
        };

        let response = self.http.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(Error::Transient(format!(
                "embedding service returned {status}: {body}"
            )));
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(Error::Other(format!(
                "embedding request rejected ({status}): {body}"
            )));
        }

        let parsed: EmbedContentResponse = response.json().await?;
        Ok(parsed.embedding.values)
    }
}

impl EmbeddingBackend for HttpEmbeddingClient {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation(
                "cannot embed empty text".to_owned(),
            ));
        }

        embed_with_retry(
            self.config.max_attempts,
            self.config.retry_delay,
            self.config.dimension,
            || self.request_embedding(trimmed, mode),
        )
        .await
    }
}

/// Drive one embedding attempt to completion under the retry policy.
///
/// Retryable failures are retried up to `max_attempts` total attempts with
/// linear backoff (attempt × base delay). A vector of the wrong
/// dimensionality is a contract mismatch, not transience: it is returned as
/// [`Error::DataIntegrity`] immediately, never retried. Exhausted retries
/// surface as [`Error::Transient`] annotated with the attempt count.
async fn embed_with_retry<F, Fut>(
    max_attempts: u32,
    retry_delay: Duration,
    dimension: usize,
    mut attempt_fn: F,
) -> Result<Vec<f32>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<f32>>>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match attempt_fn().await {
            Ok(vector) => {
                if vector.len() != dimension {
                    return Err(Error::DataIntegrity(format!(
                        "expected {dimension} dimensions, got {}",
                        vector.len()
                    )));
                }
                return Ok(vector);
            }
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                warn!("Embedding attempt {attempt}/{max_attempts} failed, retrying: {error}");
                // Linear backoff: attempt × base delay.
                tokio::time::sleep(retry_delay * attempt).await;
                last_error = Some(error);
            }
            Err(error) if error.is_retryable() => {
                last_error = Some(error);
            }
            Err(error) => return Err(error),
        }
    }

    let last = last_error.map_or_else(|| "no attempts made".to_owned(), |error| error.to_string());
    Err(Error::Transient(format!(
        "embedding failed after {max_attempts} attempts: {last}"
    )))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: RequestContent<'a>,
    task_type: &'static str,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ResponseEmbedding,
}

#[derive(Debug, Deserialize)]
struct ResponseEmbedding {
    values: Vec<f32>,
}

/// Test-only fake embedding backend (deterministic, hash-based).
///
/// Mirrors the real client's contract: rejects empty text, produces
/// fixed-dimension vectors, and can be told to fail for texts containing a
/// marker substring.
#[cfg(test)]
pub struct FakeEmbeddingClient {
    /// Vector dimensionality to produce.
    pub dimension: usize,
    /// Texts containing this substring fail with a transient error.
    pub fail_marker: Option<String>,
}

#[cfg(test)]
impl Default for FakeEmbeddingClient {
    fn default() -> Self {
        Self {
            dimension: biograph_core::config::EMBEDDING_DIMENSION,
            fail_marker: None,
        }
    }
}

#[cfg(test)]
impl FakeEmbeddingClient {
    /// Generate a fake deterministic embedding for testing.
    pub fn fake_embedding(text: &str, dimension: usize) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash as _, Hasher as _};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        (0..dimension)
            .map(|idx| ((hash.wrapping_add(idx as u64)) % 1000) as f32 / 1000.0)
            .collect()
    }
}

#[cfg(test)]
impl EmbeddingBackend for FakeEmbeddingClient {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::Validation("cannot embed empty text".to_owned()));
        }
        if let Some(marker) = &self.fail_marker
            && text.contains(marker.as_str())
        {
            return Err(Error::Transient("simulated service failure".to_owned()));
        }
        Ok(Self::fake_embedding(text, self.dimension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_exhausts_all_attempts_on_transient_errors() {
        let calls = AtomicU32::new(0);
        let error = embed_with_retry(3, Duration::ZERO, 4, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Transient("rate limited".to_owned())) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(error, Error::Transient(_)));
        assert!(error.to_string().contains("after 3 attempts"));
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let vector = embed_with_retry(3, Duration::ZERO, 4, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(Error::Transient("cold start".to_owned()))
                } else {
                    Ok(vec![0.1, 0.2, 0.3, 0.4])
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(vector.len(), 4);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_never_retried() {
        let calls = AtomicU32::new(0);
        let error = embed_with_retry(3, Duration::ZERO, 4, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(vec![0.5, 0.5]) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(error, Error::DataIntegrity(_)));
        assert!(error.to_string().contains("expected 4 dimensions, got 2"));
    }

    #[tokio::test]
    async fn test_non_retryable_error_returned_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let error = embed_with_retry(3, Duration::ZERO, 4, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Validation("bad input".to_owned())) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(error, Error::Validation(_)));
    }

    #[test]
    fn test_mode_task_types() {
        assert_eq!(EmbeddingMode::Document.task_type(), "RETRIEVAL_DOCUMENT");
        assert_eq!(EmbeddingMode::Query.task_type(), "RETRIEVAL_QUERY");
    }

    #[test]
    fn test_client_requires_api_key() {
        let error = HttpEmbeddingClient::new(EmbeddingConfig::default()).unwrap_err();
        assert!(matches!(error, Error::MissingApiKey(_)));

        let blank = EmbeddingConfig::default().with_api_key("   ");
        let error = HttpEmbeddingClient::new(blank).unwrap_err();
        assert!(matches!(error, Error::MissingApiKey(_)));
    }

    #[test]
    fn test_endpoint_shape() {
        let config = EmbeddingConfig::default().with_api_key("k");
        let client = HttpEmbeddingClient::new(config).unwrap();
        assert!(
            client
                .endpoint
                .ends_with("/models/text-embedding-004:embedContent?key=k")
        );
    }

    #[tokio::test]
    async fn test_fake_backend_is_deterministic() {
        let fake = FakeEmbeddingClient::default();
        let first = fake.embed("안녕하세요", EmbeddingMode::Document).await.unwrap();
        let second = fake.embed("안녕하세요", EmbeddingMode::Document).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 768);
    }

    #[tokio::test]
    async fn test_fake_backend_rejects_empty_text() {
        let fake = FakeEmbeddingClient::default();
        let error = fake.embed("   ", EmbeddingMode::Query).await.unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
    }
}
