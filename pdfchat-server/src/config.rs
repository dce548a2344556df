//! Environment-driven configuration and backend construction.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use pdfchat_rag::gemini::GeminiChatModel;
use pdfchat_rag::huggingface::HuggingFaceEmbeddingProvider;
use pdfchat_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
use pdfchat_rag::pgvector::{ColumnMapping, PgVectorConfig, PgVectorStore};
use pdfchat_rag::{
    ChatModel, EmbeddingProvider, GenerationOptions, InMemoryVectorStore, RagConfig, RagError,
    RagPipeline, Result, VectorStore,
};
use tracing::info;

use crate::server::ServerConfig;

const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-4o-mini";

/// A credential that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingConfig {
    HuggingFace { api_key: ApiKey, model: String, dimensions: usize, base_url: Option<String> },
    OpenAI { api_key: ApiKey, model: String, dimensions: usize, base_url: Option<String> },
}

impl EmbeddingConfig {
    pub fn dimensions(&self) -> usize {
        match self {
            EmbeddingConfig::HuggingFace { dimensions, .. } | EmbeddingConfig::OpenAI { dimensions, .. } => {
                *dimensions
            }
        }
    }

    pub fn build(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self {
            EmbeddingConfig::HuggingFace { api_key, model, dimensions, base_url } => {
                let mut provider = HuggingFaceEmbeddingProvider::new(api_key.expose())?
                    .with_model(model)
                    .with_dimensions(*dimensions);
                if let Some(url) = base_url {
                    provider = provider.with_base_url(url);
                }
                Ok(Arc::new(provider))
            }
            EmbeddingConfig::OpenAI { api_key, model, dimensions, base_url } => {
                let provider = OpenAIEmbeddingProvider::new(api_key.expose())?.with_model(model);
                // Only the text-embedding-3 family accepts a requested dimension.
                let mut provider = if model.starts_with("text-embedding-3") {
                    provider.with_dimensions(*dimensions)
                } else {
                    provider.with_native_dimensions(*dimensions)
                };
                if let Some(url) = base_url {
                    provider = provider.with_base_url(url);
                }
                Ok(Arc::new(provider))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatModelConfig {
    Gemini { api_key: ApiKey, model: String, base_url: Option<String> },
    OpenAI { api_key: ApiKey, model: String, base_url: Option<String> },
}

impl ChatModelConfig {
    pub fn build(&self) -> Result<Arc<dyn ChatModel>> {
        match self {
            ChatModelConfig::Gemini { api_key, model, base_url } => {
                let mut client = GeminiChatModel::new(api_key.expose())?.with_model(model);
                if let Some(url) = base_url {
                    client = client.with_base_url(url);
                }
                Ok(Arc::new(client))
            }
            ChatModelConfig::OpenAI { api_key, model, base_url } => {
                let mut client = OpenAIChatModel::new(api_key.expose(), model)?;
                if let Some(url) = base_url {
                    client = client.with_base_url(url);
                }
                Ok(Arc::new(client))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum VectorStoreConfig {
    InMemory,
    Postgres(PgVectorConfig),
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rag: RagConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatModelConfig,
    pub generation: GenerationOptions,
    pub vector_store: VectorStoreConfig,
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RagError::ConfigError(format!("{key} environment variable not set")))
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| RagError::ConfigError(format!("invalid value for {key}: '{value}'"))),
        None => Ok(default),
    }
}

fn text(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server = ServerConfig {
            host: text(&lookup, "PDFCHAT_HOST", "127.0.0.1"),
            port: parsed(&lookup, "PDFCHAT_PORT", 3000)?,
            max_upload_bytes: parsed(&lookup, "PDFCHAT_MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
        };

        let rag = RagConfig::builder()
            .chunk_size(parsed(&lookup, "RAG_CHUNK_SIZE", 1000)?)
            .chunk_overlap(parsed(&lookup, "RAG_CHUNK_OVERLAP", 100)?)
            .top_k(parsed(&lookup, "RAG_TOP_K", 8)?)
            .min_text_chars(parsed(&lookup, "RAG_MIN_TEXT_CHARS", 50)?)
            .similarity_threshold(parsed(&lookup, "RAG_SIMILARITY_THRESHOLD", 0.0)?)
            .build()?;

        let dimensions = parsed(&lookup, "EMBEDDING_DIMENSIONS", 384)?;
        let embedding_base_url = lookup("EMBEDDING_BASE_URL").filter(|v| !v.trim().is_empty());
        let embedding = match text(&lookup, "EMBEDDING_BACKEND", "huggingface").to_lowercase().as_str() {
            "huggingface" | "hf" => EmbeddingConfig::HuggingFace {
                api_key: ApiKey::new(required(&lookup, "HUGGINGFACE_INFERENCE_API_KEY")?),
                model: text(&lookup, "EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
                dimensions,
                base_url: embedding_base_url,
            },
            "openai" => EmbeddingConfig::OpenAI {
                api_key: ApiKey::new(required(&lookup, "OPENAI_API_KEY")?),
                model: text(&lookup, "EMBEDDING_MODEL", DEFAULT_OPENAI_EMBEDDING_MODEL),
                dimensions,
                base_url: embedding_base_url,
            },
            other => return Err(RagError::ConfigError(format!("unknown EMBEDDING_BACKEND '{other}'"))),
        };

        let llm_base_url = lookup("LLM_BASE_URL").filter(|v| !v.trim().is_empty());
        let chat = match text(&lookup, "LLM_BACKEND", "gemini").to_lowercase().as_str() {
            "gemini" => ChatModelConfig::Gemini {
                api_key: ApiKey::new(required(&lookup, "GOOGLE_API_KEY")?),
                model: text(&lookup, "LLM_MODEL", DEFAULT_CHAT_MODEL),
                base_url: llm_base_url,
            },
            "openai" => ChatModelConfig::OpenAI {
                api_key: ApiKey::new(required(&lookup, "OPENAI_API_KEY")?),
                model: text(&lookup, "LLM_MODEL", DEFAULT_OPENAI_CHAT_MODEL),
                base_url: llm_base_url,
            },
            other => return Err(RagError::ConfigError(format!("unknown LLM_BACKEND '{other}'"))),
        };

        let generation = GenerationOptions {
            temperature: Some(parsed(&lookup, "LLM_TEMPERATURE", 0.7)?),
            max_output_tokens: Some(parsed(&lookup, "LLM_MAX_OUTPUT_TOKENS", 1024)?),
        };

        let database_url = lookup("DATABASE_URL")
            .or_else(|| lookup("SUPABASE_DATABASE_URL"))
            .filter(|v| !v.trim().is_empty());
        let vector_store = match database_url {
            Some(url) => {
                let defaults = ColumnMapping::default();
                let columns = ColumnMapping {
                    id: text(&lookup, "VECTOR_ID_COLUMN", &defaults.id),
                    embedding: text(&lookup, "VECTOR_EMBEDDING_COLUMN", &defaults.embedding),
                    content: text(&lookup, "VECTOR_CONTENT_COLUMN", &defaults.content),
                    metadata: text(&lookup, "VECTOR_METADATA_COLUMN", &defaults.metadata),
                };
                VectorStoreConfig::Postgres(
                    PgVectorConfig::new(url, dimensions)
                        .with_table(text(&lookup, "VECTOR_TABLE", "document_chunks"))
                        .with_columns(columns)
                        .with_max_connections(parsed(&lookup, "VECTOR_MAX_CONNECTIONS", 5)?),
                )
            }
            None => VectorStoreConfig::InMemory,
        };

        Ok(Self { server, rag, embedding, chat, generation, vector_store })
    }

    /// Construct the backends and assemble the pipeline.
    ///
    /// For PostgreSQL this connects and makes sure the chunk table exists.
    pub async fn build_pipeline(&self) -> Result<RagPipeline> {
        let embedder = self.embedding.build()?;
        let chat_model = self.chat.build()?;

        let store: Arc<dyn VectorStore> = match &self.vector_store {
            VectorStoreConfig::InMemory => {
                info!("DATABASE_URL not set, chunks are kept in memory only");
                Arc::new(InMemoryVectorStore::new(self.embedding.dimensions()))
            }
            VectorStoreConfig::Postgres(config) => {
                let store = PgVectorStore::connect(config.clone()).await?;
                store.ensure_schema().await?;
                Arc::new(store)
            }
        };

        info!(
            embedder = embedder.name(),
            dimensions = embedder.dimensions(),
            model = chat_model.name(),
            store = store.name(),
            "pipeline ready"
        );

        RagPipeline::builder()
            .config(self.rag.clone())
            .embedding_provider(embedder)
            .vector_store(store)
            .chat_model(chat_model)
            .generation_options(self.generation.clone())
            .build()
    }
}
