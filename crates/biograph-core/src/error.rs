use core::result::Result as CoreResult;
use std::io::Error as IoError;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Result type for indexing operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur in the indexing pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// An HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required API credential was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

    /// Input failed validation for a single operation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The embedding service returned data violating its contract.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// The embedding service failed transiently (network, rate limit, 5xx).
    #[error("Transient service error: {0}")]
    Transient(String),

    /// The persistence store rejected an operation.
    #[error("Store error: {0}")]
    Store(String),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Determines whether this error may succeed if retried.
    ///
    /// Returns `true` only for transient failures such as network errors or
    /// rate limiting. Contract violations (`DataIntegrity`) and bad input
    /// (`Validation`) are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, from_str};
    use std::io;

    #[test]
    fn test_error_display() {
        let error1 = Error::Config("no embedding endpoint".to_owned());
        assert_eq!(
            error1.to_string(),
            "Configuration error: no embedding endpoint"
        );

        let error2 = Error::MissingApiKey("EMBEDDING_API_KEY".to_owned());
        assert_eq!(error2.to_string(), "API key not found: EMBEDDING_API_KEY");

        let error3 = Error::DataIntegrity("expected 768 dimensions, got 512".to_owned());
        assert_eq!(
            error3.to_string(),
            "Data integrity error: expected 768 dimensions, got 512"
        );
    }

    #[test]
    fn test_error_is_retryable() {
        // Retryable errors
        let error1 = Error::Transient("rate limited".to_owned());
        assert!(error1.is_retryable());

        // Non-retryable errors
        let error2 = Error::Validation("empty text".to_owned());
        assert!(!error2.is_retryable());

        let error3 = Error::DataIntegrity("wrong dimensionality".to_owned());
        assert!(!error3.is_retryable());

        let error4 = Error::MissingApiKey("KEY".to_owned());
        assert!(!error4.is_retryable());

        let error5 = Error::Store("write rejected".to_owned());
        assert!(!error5.is_retryable());
    }

    #[test]
    fn test_error_from_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = from_str::<JsonValue>("invalid json").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
