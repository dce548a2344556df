//! # pdfchat-rag
//!
//! Retrieval pipeline for answering questions about uploaded PDF documents.
//!
//! ## Overview
//!
//! Ingestion turns extracted document text into stored, embedded chunks:
//!
//! - [`TextChunker`] - normalizes text and splits it into overlapping chunks
//! - [`EmbeddingProvider`] - turns chunk and question text into vectors
//! - [`VectorStore`] - persists chunks and answers similarity searches
//!
//! Querying reads them back and produces a grounded answer:
//!
//! - [`Retriever`] - embeds the question, searches, assembles context and sources
//! - [`AnswerGenerator`] - prompts a [`ChatModel`] with the context and history
//!
//! [`RagPipeline`] wires all of them together.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pdfchat_rag::{InMemoryVectorStore, RagConfig, RagPipeline};
//! use pdfchat_rag::gemini::GeminiChatModel;
//! use pdfchat_rag::huggingface::HuggingFaceEmbeddingProvider;
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HuggingFaceEmbeddingProvider::from_env()?))
//!     .vector_store(Arc::new(InMemoryVectorStore::new(384)))
//!     .chat_model(Arc::new(GeminiChatModel::from_env()?))
//!     .build()?;
//!
//! pipeline.ingest_text("handbook.pdf", &text).await?;
//! let reply = pipeline.ask("How many vacation days do I get?", &[]).await?;
//! println!("{} (sources: {:?})", reply.answer, reply.sources);
//! ```
//!
//! ## Features
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `huggingface` | [`huggingface::HuggingFaceEmbeddingProvider`] |
//! | `openai` | OpenAI-compatible embeddings and chat |
//! | `gemini` | [`gemini::GeminiChatModel`] |
//! | `pgvector` | [`pgvector::PgVectorStore`] |
//! | `pdf` | [`extract::PdfTextExtractor`] |
//! | `full` | all of the above |

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generator;
pub mod inmemory;
pub mod llm;
pub mod mock;
pub mod pipeline;
pub mod retriever;
pub mod retry;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "huggingface")]
pub mod huggingface;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pgvector")]
pub mod pgvector;

pub use chunking::{TextChunker, normalize_text, split};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, ConversationTurn, Role, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extract::PdfExtractor;
pub use generator::{AnswerGenerator, NO_CONTEXT_ANSWER};
pub use inmemory::InMemoryVectorStore;
pub use llm::{ChatMessage, ChatModel, ContentPart, GenerationOptions, MessageRole, ModelResponse};
pub use pipeline::{IngestReport, QueryAnswer, RagPipeline, RagPipelineBuilder};
pub use retriever::{RetrievalResult, Retriever};
pub use retry::RetryPolicy;
pub use vectorstore::{UpsertReport, VectorStore};
