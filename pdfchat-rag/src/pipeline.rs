//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the ingest-and-ask workflow by composing
//! a [`TextChunker`], an [`EmbeddingProvider`], a [`VectorStore`], a
//! [`Retriever`], and an [`AnswerGenerator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfchat_rag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new(384)))
//!     .chat_model(Arc::new(my_model))
//!     .build()?;
//!
//! let report = pipeline.ingest_text("report.pdf", &text).await?;
//! let reply = pipeline.ask("What was the revenue?", &[]).await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::chunking::{TextChunker, normalize_text};
use crate::config::RagConfig;
use crate::document::{Chunk, ConversationTurn};
use crate::embedding::{EmbeddingProvider, check_embeddings};
use crate::error::{RagError, Result};
use crate::generator::AnswerGenerator;
use crate::llm::{ChatModel, GenerationOptions};
use crate::retriever::{RetrievalResult, Retriever};
use crate::vectorstore::VectorStore;

/// Summary of one successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Fresh identifier shared by every chunk of this ingestion.
    pub document_id: String,
    pub source: String,
    pub chunks_stored: usize,
}

/// A grounded answer and the documents it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (normalize → chunk → embed → store) and
/// question answering (embed → search → assemble context → generate).
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    chunker: TextChunker,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Chunk, embed, and store the text of one document.
    ///
    /// The whole document is written as one batch: either every chunk is
    /// stored or none is.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyDocument`] if the normalized text is shorter than
    /// [`RagConfig::min_text_chars`]; otherwise any embedding or store error.
    pub async fn ingest_text(&self, source: &str, text: &str) -> Result<IngestReport> {
        let source = source.trim();
        if source.is_empty() {
            return Err(RagError::InvalidRequest("document source name must not be empty".into()));
        }

        let chars = normalize_text(text).chars().count();
        if chars < self.config.min_text_chars.max(1) {
            return Err(RagError::EmptyDocument { chars, min_chars: self.config.min_text_chars.max(1) });
        }

        let pieces = self.chunker.split(text)?;
        let document_id = Uuid::new_v4().to_string();

        let mut embeddings = Vec::with_capacity(pieces.len());
        for batch in pieces.chunks(self.config.embedding_batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(String::as_str).collect();
            let provider = &self.embedding_provider;
            let vectors = provider
                .embed(&texts)
                .await
                .and_then(|v| check_embeddings(provider.name(), texts.len(), provider.dimensions(), v))
                .map_err(|e| {
                    error!(source, document_id = %document_id, error = %e, "embedding failed during ingestion");
                    e
                })?;
            embeddings.extend(vectors);
        }

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (text, embedding))| Chunk {
                id: Uuid::new_v4().to_string(),
                text,
                source: source.to_string(),
                chunk_index,
                document_id: document_id.clone(),
                embedding,
            })
            .collect();

        let report = self.vector_store.upsert(&chunks).await.map_err(|e| {
            error!(source, document_id = %document_id, error = %e, "upsert failed during ingestion");
            e
        })?;

        let chunks_stored = report.written.len();
        info!(source, document_id = %document_id, chars, chunks_stored, "ingested document");

        Ok(IngestReport { document_id, source: source.to_string(), chunks_stored })
    }

    /// Retrieve the configured `top_k` chunks for `question`.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        self.retriever.retrieve(question, self.config.top_k).await
    }

    /// Answer `question` from the stored documents, taking `history` (oldest
    /// first) into account.
    ///
    /// When nothing relevant is stored the answer is an explicit "I don't
    /// know" and `sources` is empty.
    pub async fn ask(&self, question: &str, history: &[ConversationTurn]) -> Result<QueryAnswer> {
        let retrieval = self.retrieve(question).await.map_err(|e| {
            error!(error = %e, "retrieval failed");
            e
        })?;

        let answer = self.generator.answer(question.trim(), &retrieval.context, history).await.map_err(|e| {
            error!(error = %e, "answer generation failed");
            e
        })?;

        info!(
            chunks = retrieval.results.len(),
            sources = retrieval.sources.len(),
            history = history.len(),
            insufficient = retrieval.is_insufficient(),
            "answered question"
        );

        Ok(QueryAnswer { answer: answer.text, sources: retrieval.sources })
    }

    /// Delete every stored chunk of `source`. Returns how many were removed.
    pub async fn remove_source(&self, source: &str) -> Result<usize> {
        let removed = self.vector_store.delete_source(source).await?;
        info!(source, removed, "removed document");
        Ok(removed)
    }

    /// Number of chunks currently stored.
    pub async fn chunk_count(&self) -> Result<usize> {
        self.vector_store.count().await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider, vector store, and chat model are required; the
/// config and generation options fall back to their defaults. Call
/// [`build()`](RagPipelineBuilder::build) to validate and produce the pipeline.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chat_model: Option<Arc<dyn ChatModel>>,
    generation_options: Option<GenerationOptions>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the language model used for answers.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Set the sampling options sent with every answer request.
    pub fn generation_options(mut self, options: GenerationOptions) -> Self {
        self.generation_options = Some(options);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// [`RagError::ConfigError`] if a required component is missing or the
    /// config is invalid; [`RagError::DimensionMismatch`] if the embedding
    /// provider and the vector store disagree on the vector dimension.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chat_model =
            self.chat_model.ok_or_else(|| RagError::ConfigError("chat_model is required".to_string()))?;

        if embedding_provider.dimensions() != vector_store.dimensions() {
            return Err(RagError::DimensionMismatch {
                expected: vector_store.dimensions(),
                actual: embedding_provider.dimensions(),
            });
        }

        let chunker = TextChunker::from_config(&config)?;
        let retriever = Retriever::new(embedding_provider.clone(), vector_store.clone())
            .with_similarity_threshold(config.similarity_threshold);
        let generator = AnswerGenerator::new(chat_model, self.generation_options.unwrap_or_default());

        Ok(RagPipeline { config, chunker, embedding_provider, vector_store, retriever, generator })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryVectorStore;
    use crate::mock::{HashEmbeddingProvider, MockChatModel};

    #[test]
    fn builder_rejects_mismatched_dimensions() {
        let result = RagPipeline::builder()
            .embedding_provider(Arc::new(HashEmbeddingProvider::new(8)))
            .vector_store(Arc::new(InMemoryVectorStore::new(16)))
            .chat_model(Arc::new(MockChatModel::new("ok")))
            .build();
        assert!(matches!(result, Err(RagError::DimensionMismatch { expected: 16, actual: 8 })));
    }

    #[test]
    fn builder_requires_a_chat_model() {
        let result = RagPipeline::builder()
            .embedding_provider(Arc::new(HashEmbeddingProvider::new(8)))
            .vector_store(Arc::new(InMemoryVectorStore::new(8)))
            .build();
        assert!(matches!(result, Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn blank_source_name_is_rejected() {
        let pipeline = RagPipeline::builder()
            .embedding_provider(Arc::new(HashEmbeddingProvider::new(8)))
            .vector_store(Arc::new(InMemoryVectorStore::new(8)))
            .chat_model(Arc::new(MockChatModel::new("ok")))
            .build()
            .unwrap();
        let text = "word ".repeat(40);
        assert!(matches!(pipeline.ingest_text("  ", &text).await, Err(RagError::InvalidRequest(_))));
    }
}
