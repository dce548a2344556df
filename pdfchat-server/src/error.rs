use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pdfchat_rag::RagError;
use tracing::{error, warn};

use crate::protocol::ErrorResponse;

/// An error returned to HTTP clients as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        if err.is_client_error() {
            warn!(error = %err, "rejected request");
            return Self::bad_request(err.to_string());
        }

        error!(error = %err, "request failed");
        match err {
            RagError::Timeout { .. } => Self::new(StatusCode::GATEWAY_TIMEOUT, "Upstream service timed out"),
            RagError::EmbeddingError { .. } => Self::new(StatusCode::BAD_GATEWAY, "Embedding service error"),
            RagError::VectorStoreWriteError { .. }
            | RagError::VectorStoreConnectionError { .. }
            | RagError::VectorStoreError { .. } => Self::new(StatusCode::BAD_GATEWAY, "Vector store error"),
            RagError::LanguageModelError { .. } => Self::new(StatusCode::BAD_GATEWAY, "Language model error"),
            _ => Self::internal("Internal server error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn rag_errors_map_to_status_codes() {
        let cases = [
            (RagError::EmptyDocument { chars: 10, min_chars: 50 }, StatusCode::BAD_REQUEST),
            (RagError::UnreadablePdf("bad xref".into()), StatusCode::BAD_REQUEST),
            (RagError::InvalidRequest("empty question".into()), StatusCode::BAD_REQUEST),
            (
                RagError::EmbeddingError { provider: "hf".into(), message: "503".into(), retryable: true },
                StatusCode::BAD_GATEWAY,
            ),
            (
                RagError::VectorStoreConnectionError { backend: "pgvector".into(), message: "refused".into() },
                StatusCode::BAD_GATEWAY,
            ),
            (
                RagError::LanguageModelError { provider: "gemini".into(), message: "500".into(), retryable: true },
                StatusCode::BAD_GATEWAY,
            ),
            (
                RagError::Timeout { operation: "gemini generate".into(), after: Duration::from_secs(60) },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (RagError::DimensionMismatch { expected: 384, actual: 768 }, StatusCode::INTERNAL_SERVER_ERROR),
            (RagError::ConfigError("missing key".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let label = err.to_string();
            assert_eq!(ApiError::from(err).status, expected, "{label}");
        }
    }

    #[test]
    fn client_errors_keep_their_message() {
        let api = ApiError::from(RagError::EmptyDocument { chars: 10, min_chars: 50 });
        assert!(api.message.contains("No usable text"));
    }

    #[test]
    fn backend_details_are_not_exposed() {
        let api = ApiError::from(RagError::LanguageModelError {
            provider: "gemini".into(),
            message: "API returned 403: key AIza... revoked".into(),
            retryable: false,
        });
        assert!(!api.message.contains("AIza"));
    }
}
