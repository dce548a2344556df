//! Vector store trait for storing and searching vector embeddings.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};

/// Outcome of a successful [`VectorStore::upsert`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertReport {
    /// Ids of the chunks written, in input order.
    pub written: Vec<String>,
}

/// A storage backend for chunk embeddings with similarity search.
///
/// All chunks in one store share one embedding dimension. Writes are
/// all-or-nothing per batch and never overwrite an existing chunk.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384);
/// store.upsert(&chunks).await?;
/// let results = store.search(&query_embedding, 8).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// The embedding dimension every stored vector has.
    fn dimensions(&self) -> usize;

    /// Write a batch of chunks. Chunks must have embeddings set.
    ///
    /// # Errors
    ///
    /// [`RagError::DimensionMismatch`] if a chunk's embedding has the wrong
    /// length; [`RagError::VectorStoreWriteError`] if an id repeats within
    /// the batch or already exists, or if the backend rejects the write. In
    /// every error case nothing from the batch is stored.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<UpsertReport>;

    /// Search for the `top_k` chunks most similar to `embedding`.
    ///
    /// Returns results ordered by descending cosine similarity, ties broken
    /// by ascending chunk id.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Delete every chunk whose source is `source`. Returns how many were removed.
    async fn delete_source(&self, source: &str) -> Result<usize>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<usize>;

    /// Release backend resources. Backends with pooled connections reject
    /// later operations; the default does nothing.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Validate a write batch before anything touches the backend.
///
/// Checks every embedding against `dimensions` and rejects ids that appear
/// twice in the batch.
pub fn validate_batch(backend: &str, dimensions: usize, chunks: &[Chunk]) -> Result<()> {
    if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimensions) {
        return Err(RagError::DimensionMismatch { expected: dimensions, actual: bad.embedding.len() });
    }

    let mut seen = HashSet::with_capacity(chunks.len());
    if let Some(dup) = chunks.iter().find(|c| !seen.insert(c.id.as_str())) {
        return Err(rejected_batch(backend, format!("duplicate chunk id '{}' in batch", dup.id), chunks));
    }
    Ok(())
}

/// Check a query vector against the store dimension.
pub fn validate_query(dimensions: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != dimensions {
        return Err(RagError::DimensionMismatch { expected: dimensions, actual: embedding.len() });
    }
    Ok(())
}

/// A write error for a batch of which nothing was stored.
pub fn rejected_batch(backend: &str, message: impl Into<String>, chunks: &[Chunk]) -> RagError {
    RagError::VectorStoreWriteError {
        backend: backend.to_string(),
        message: message.into(),
        succeeded: Vec::new(),
        failed: chunks.iter().map(|c| c.id.clone()).collect(),
    }
}
