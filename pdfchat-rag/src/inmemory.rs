//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and single-process deployments.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;
use crate::vectorstore::{UpsertReport, VectorStore, rejected_batch, validate_batch, validate_query};

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine similarity for search.
///
/// Chunks are stored in a `HashMap` keyed by chunk id. All operations are
/// async-safe via `tokio::sync::RwLock`; a write batch is applied under a
/// single write lock, so readers never observe half of it.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384);
/// store.upsert(&chunks).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store for vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, chunks: RwLock::new(HashMap::new()) }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Descending score, then ascending id.
fn rank(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.chunk.id.cmp(&b.chunk.id))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        BACKEND
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<UpsertReport> {
        validate_batch(BACKEND, self.dimensions, chunks)?;

        let mut store = self.chunks.write().await;
        if let Some(existing) = chunks.iter().find(|c| store.contains_key(&c.id)) {
            return Err(rejected_batch(
                BACKEND,
                format!("chunk id '{}' already exists", existing.id),
                chunks,
            ));
        }

        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk.clone());
        }
        debug!(backend = BACKEND, written = chunks.len(), total = store.len(), "upserted chunks");

        Ok(UpsertReport { written: chunks.iter().map(|c| c.id.clone()).collect() })
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        validate_query(self.dimensions, embedding)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let store = self.chunks.read().await;
        let mut scored: Vec<SearchResult> = store
            .values()
            .map(|chunk| SearchResult { chunk: chunk.clone(), score: cosine_similarity(&chunk.embedding, embedding) })
            .collect();

        scored.sort_by(rank);
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_source(&self, source: &str) -> Result<usize> {
        let mut store = self.chunks.write().await;
        let before = store.len();
        store.retain(|_, chunk| chunk.source != source);
        Ok(before - store.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.chunks.read().await.len())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new(384)
    }
}
