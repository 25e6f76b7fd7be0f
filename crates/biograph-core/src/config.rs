//! Embedding service configuration.

use std::env;
use std::time::Duration;

/// Expected embedding dimensionality for every stored vector.
pub const EMBEDDING_DIMENSION: usize = 768;

/// Configuration for the remote embedding service.
///
/// Constructed explicitly and injected into the client; there is no
/// process-wide state.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// API credential. Client construction fails without one.
    pub api_key: Option<String>,
    /// Service base URL.
    pub base_url: String,
    /// Embedding model identifier.
    pub model: String,
    /// Expected vector dimensionality.
    pub dimension: usize,
    /// Total attempts per text (first try included).
    pub max_attempts: u32,
    /// Base delay for linear retry backoff (attempt × delay).
    pub retry_delay: Duration,
    /// Texts embedded concurrently per batch.
    pub batch_size: usize,
    /// Cooldown between consecutive batches.
    pub batch_delay: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_owned(),
            model: "text-embedding-004".to_owned(),
            dimension: EMBEDDING_DIMENSION,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            batch_size: 10,
            batch_delay: Duration::from_millis(200),
        }
    }
}

impl EmbeddingConfig {
    /// Get embedding configuration from environment variables with fallback
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = env::var("EMBEDDING_API_KEY").ok();
        if let Ok(base_url) = env::var("EMBEDDING_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("EMBEDDING_MODEL") {
            config.model = model;
        }
        config
    }

    /// Set the API credential.
    #[must_use]
    pub fn with_api_key<T: Into<String>>(mut self, api_key: T) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.dimension, 768);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.batch_delay, Duration::from_millis(200));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_with_api_key() {
        let config = EmbeddingConfig::default().with_api_key("secret");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }
}
