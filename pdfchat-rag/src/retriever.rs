//! Query-time retrieval: embed the question, search, and assemble context.

use std::sync::Arc;

use tracing::debug;

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Separator placed between chunk texts in the assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// The ranked chunks for one question, with their joined text and sources.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    /// Retrieved chunks, descending by score.
    pub results: Vec<SearchResult>,
    /// Chunk texts in ranked order separated by a blank line.
    pub context: String,
    /// Source file names of the retrieved chunks, first-seen order, no repeats.
    pub sources: Vec<String>,
}

impl RetrievalResult {
    /// Assemble context and sources from ranked search results.
    pub fn from_results(results: Vec<SearchResult>) -> Self {
        let context =
            results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);

        let mut sources: Vec<String> = Vec::new();
        for result in &results {
            if !sources.contains(&result.chunk.source) {
                sources.push(result.chunk.source.clone());
            }
        }

        Self { results, context, sources }
    }

    /// Whether nothing relevant was found to answer from.
    pub fn is_insufficient(&self) -> bool {
        self.context.trim().is_empty()
    }
}

/// Finds the stored chunks most relevant to a question.
///
/// The retriever only reads from the store.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    similarity_threshold: f32,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store, similarity_threshold: 0.0 }
    }

    /// Drop results scoring below `threshold`. `0.0` disables filtering.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Retrieve the `k` chunks most similar to `question`.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidRequest`] for a blank question or `k == 0`; any
    /// embedding or store error otherwise.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidRequest("question must not be empty".into()));
        }
        if k == 0 {
            return Err(RagError::InvalidRequest("top_k must be at least 1".into()));
        }

        let query_embedding = self.embedder.embed_one(question).await?;
        let mut results = self.store.search(&query_embedding, k).await?;

        let found = results.len();
        if self.similarity_threshold > 0.0 {
            results.retain(|r| r.score >= self.similarity_threshold);
        }

        debug!(k, found, kept = results.len(), threshold = self.similarity_threshold, "retrieved chunks");
        Ok(RetrievalResult::from_results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;
    use crate::inmemory::InMemoryVectorStore;
    use crate::mock::HashEmbeddingProvider;

    fn result(id: &str, source: &str, text: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: id.into(),
                text: text.into(),
                source: source.into(),
                chunk_index: 0,
                document_id: "d".into(),
                embedding: vec![],
            },
            score,
        }
    }

    #[test]
    fn context_joins_in_rank_order_and_sources_dedup() {
        let retrieval = RetrievalResult::from_results(vec![
            result("1", "b.pdf", "first", 0.9),
            result("2", "a.pdf", "second", 0.8),
            result("3", "b.pdf", "third", 0.7),
        ]);
        assert_eq!(retrieval.context, "first\n\nsecond\n\nthird");
        assert_eq!(retrieval.sources, vec!["b.pdf", "a.pdf"]);
        assert!(!retrieval.is_insufficient());
    }

    #[test]
    fn no_results_is_insufficient() {
        let retrieval = RetrievalResult::from_results(vec![]);
        assert!(retrieval.is_insufficient());
        assert!(retrieval.sources.is_empty());
    }

    #[tokio::test]
    async fn blank_question_and_zero_k_are_rejected() {
        let retriever = Retriever::new(
            Arc::new(HashEmbeddingProvider::new(8)),
            Arc::new(InMemoryVectorStore::new(8)),
        );
        assert!(matches!(retriever.retrieve("   ", 3).await, Err(RagError::InvalidRequest(_))));
        assert!(matches!(retriever.retrieve("what?", 0).await, Err(RagError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn threshold_filters_weak_matches() {
        let embedder = Arc::new(HashEmbeddingProvider::new(16));
        let store = Arc::new(InMemoryVectorStore::new(16));
        let embedding = embedder.embed_one("the quarterly revenue grew").await.unwrap();
        store
            .upsert(&[Chunk {
                id: "c1".into(),
                text: "the quarterly revenue grew".into(),
                source: "report.pdf".into(),
                chunk_index: 0,
                document_id: "d".into(),
                embedding,
            }])
            .await
            .unwrap();

        let strict = Retriever::new(embedder.clone(), store.clone()).with_similarity_threshold(1.5);
        assert!(strict.retrieve("the quarterly revenue grew", 4).await.unwrap().is_insufficient());

        let lenient = Retriever::new(embedder, store);
        let found = lenient.retrieve("the quarterly revenue grew", 4).await.unwrap();
        assert_eq!(found.sources, vec!["report.pdf"]);
    }
}
