//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (Hugging Face Inference,
/// OpenAI-compatible APIs, ...) behind a unified async interface. For a fixed
/// backend and model the same text always maps to the same vector, and every
/// vector has exactly [`dimensions`](EmbeddingProvider::dimensions) entries.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::EmbeddingProvider;
///
/// let vectors = provider.embed(&["first chunk", "second chunk"]).await?;
/// let query = provider.embed_one("what is in the report?").await?;
/// assert_eq!(query.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate one embedding per input text, in input order.
    ///
    /// # Errors
    ///
    /// [`RagError::EmbeddingError`] if an input is empty or too long for the
    /// model, or if the backend fails; [`RagError::DimensionMismatch`] if the
    /// backend answers with vectors of the wrong length.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate the embedding for a single text.
    ///
    /// Equivalent to `embed(&[text])` and taking the only element.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text]).await?.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: self.name().to_string(),
            message: "backend returned no embedding".to_string(),
            retryable: false,
        })
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// Reject inputs the model cannot embed faithfully.
///
/// Empty (or whitespace-only) texts and texts longer than `max_chars`
/// characters are errors; nothing is truncated.
pub fn validate_inputs(provider: &str, texts: &[&str], max_chars: usize) -> Result<()> {
    for (i, text) in texts.iter().enumerate() {
        if text.trim().is_empty() {
            return Err(RagError::EmbeddingError {
                provider: provider.to_string(),
                message: format!("input {i} is empty"),
                retryable: false,
            });
        }
        let chars = text.chars().count();
        if chars > max_chars {
            return Err(RagError::EmbeddingError {
                provider: provider.to_string(),
                message: format!("input {i} has {chars} characters, the model accepts at most {max_chars}"),
                retryable: false,
            });
        }
    }
    Ok(())
}

/// Check that a backend answered with one vector of the right size per input.
pub fn check_embeddings(
    provider: &str,
    expected_count: usize,
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>> {
    if vectors.len() != expected_count {
        return Err(RagError::EmbeddingError {
            provider: provider.to_string(),
            message: format!("expected {expected_count} embeddings, got {}", vectors.len()),
            retryable: false,
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(RagError::DimensionMismatch { expected: dimensions, actual: bad.len() });
    }
    Ok(vectors)
}
