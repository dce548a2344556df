//! Error types for the `pdfchat-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in ingestion and query operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The extracted text is empty or shorter than the configured minimum.
    #[error("No usable text found in document ({chars} characters, at least {min_chars} required)")]
    EmptyDocument {
        /// Number of characters left after normalization.
        chars: usize,
        /// Minimum number of characters required for ingestion.
        min_chars: usize,
    },

    /// The uploaded file could not be parsed as a PDF.
    #[error("Unreadable PDF: {0}")]
    UnreadablePdf(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether the failure is transient (network, 5xx, rate limit).
        retryable: bool,
    },

    /// A vector's length does not match the configured dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension configured for the store or embedder.
        expected: usize,
        /// The dimension actually observed.
        actual: usize,
    },

    /// A batch write to the vector store failed.
    ///
    /// Writes are all-or-nothing, so `succeeded` lists the ids that were
    /// persisted before the failure (empty after a rollback) and `failed`
    /// lists the ids that were not.
    #[error("Vector store write error ({backend}): {message} ({} failed)", failed.len())]
    VectorStoreWriteError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
        /// Chunk ids that were persisted.
        succeeded: Vec<String>,
        /// Chunk ids that were not persisted.
        failed: Vec<String>,
    },

    /// The vector store could not be reached or a connection could not be acquired.
    #[error("Vector store connection error ({backend}): {message}")]
    VectorStoreConnectionError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Any other vector store failure (bad query, schema problem).
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The language model call failed or returned no usable text.
    #[error("Language model error ({provider}): {message}")]
    LanguageModelError {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether the failure is transient.
        retryable: bool,
    },

    /// A backend call did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The per-attempt time limit that elapsed.
        after: Duration,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The caller supplied invalid input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RagError {
    /// Returns `true` if the operation that produced this error may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::EmbeddingError { retryable, .. }
            | RagError::LanguageModelError { retryable, .. } => *retryable,
            RagError::VectorStoreConnectionError { .. } | RagError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for errors caused by the caller's input rather than a backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RagError::EmptyDocument { .. }
                | RagError::UnreadablePdf(_)
                | RagError::InvalidRequest(_)
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_follow_their_retryable_flag() {
        let transient = RagError::EmbeddingError {
            provider: "HuggingFace".into(),
            message: "503".into(),
            retryable: true,
        };
        let permanent = RagError::LanguageModelError {
            provider: "Gemini".into(),
            message: "400".into(),
            retryable: false,
        };
        assert!(transient.is_retryable());
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn validation_errors_are_never_retried() {
        let errors = [
            RagError::EmptyDocument { chars: 3, min_chars: 50 },
            RagError::UnreadablePdf("bad xref".into()),
            RagError::DimensionMismatch { expected: 384, actual: 3 },
        ];
        for error in errors {
            assert!(!error.is_retryable(), "{error} should not be retryable");
        }
    }

    #[test]
    fn only_input_errors_are_client_errors() {
        assert!(RagError::EmptyDocument { chars: 3, min_chars: 50 }.is_client_error());
        assert!(RagError::InvalidRequest("empty question".into()).is_client_error());
        assert!(!RagError::DimensionMismatch { expected: 384, actual: 3 }.is_client_error());
        assert!(!RagError::Timeout { operation: "embed".into(), after: Duration::from_secs(30) }.is_client_error());
    }

    #[test]
    fn write_error_message_counts_failed_ids() {
        let error = RagError::VectorStoreWriteError {
            backend: "pgvector".into(),
            message: "duplicate key".into(),
            succeeded: vec![],
            failed: vec!["a".into(), "b".into()],
        };
        assert_eq!(error.to_string(), "Vector store write error (pgvector): duplicate key (2 failed)");
    }
}
