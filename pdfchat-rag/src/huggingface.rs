//! Hugging Face Inference embedding provider.
//!
//! This module is only available when the `huggingface` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::{EmbeddingProvider, check_embeddings, validate_inputs};
use crate::error::{RagError, Result};
use crate::retry::{RetryPolicy, is_transient_status};

/// The default Hugging Face Inference endpoint for hosted models.
const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/hf-inference/models";

/// The default sentence-embedding model.
const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// The dimensionality of `all-MiniLM-L6-v2`.
const DEFAULT_DIMENSIONS: usize = 384;

/// Longest input accepted before the request is refused instead of truncated.
const DEFAULT_MAX_INPUT_CHARS: usize = 8192;

const PROVIDER: &str = "HuggingFace";

/// An [`EmbeddingProvider`] backed by the Hugging Face feature-extraction pipeline.
///
/// # Configuration
///
/// - `model` – defaults to `sentence-transformers/all-MiniLM-L6-v2` (384 dimensions).
/// - `base_url` – defaults to the hosted inference router; point it at a
///   dedicated Inference Endpoint or a local TEI server if needed.
/// - `api_key` – from the constructor or `HUGGINGFACE_INFERENCE_API_KEY`.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::huggingface::HuggingFaceEmbeddingProvider;
///
/// let provider = HuggingFaceEmbeddingProvider::new("hf_...")?;
/// let vectors = provider.embed(&["hello world"]).await?;
/// ```
pub struct HuggingFaceEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
    max_input_chars: usize,
    retry: RetryPolicy,
}

impl HuggingFaceEmbeddingProvider {
    /// Create a new provider with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("Hugging Face API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            retry: RetryPolicy::default(),
        })
    }

    /// Create a new provider using the `HUGGINGFACE_INFERENCE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("HUGGINGFACE_INFERENCE_API_KEY").map_err(|_| {
            RagError::ConfigError("HUGGINGFACE_INFERENCE_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Set the model id (e.g. `BAAI/bge-small-en-v1.5`).
    ///
    /// Remember to set the matching [`with_dimensions`](Self::with_dimensions).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the dimensionality the model produces.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    /// Override the inference base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the longest accepted input, in characters.
    pub fn with_max_input_chars(mut self, max_chars: usize) -> Self {
        self.max_input_chars = max_chars;
        self
    }

    /// Set the retry policy applied to every request.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/pipeline/feature-extraction", self.base_url.trim_end_matches('/'), self.model)
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = FeatureExtractionRequest { inputs: texts, normalize: true };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                    retryable: true,
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
                retryable: is_transient_status(status.as_u16()),
            });
        }

        let parsed: FeatureExtractionResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
                retryable: false,
            }
        })?;

        Ok(parsed.into_sentence_vectors())
    }
}

// ── Hugging Face API request/response types ────────────────────────

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [&'a str],
    normalize: bool,
}

/// Sentence-transformers models answer with one pooled vector per input;
/// plain transformer models answer with one vector per token.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Pooled(Vec<Vec<f32>>),
    TokenLevel(Vec<Vec<Vec<f32>>>),
}

impl FeatureExtractionResponse {
    fn into_sentence_vectors(self) -> Vec<Vec<f32>> {
        match self {
            FeatureExtractionResponse::Pooled(vectors) => vectors,
            FeatureExtractionResponse::TokenLevel(inputs) => {
                inputs.into_iter().map(|tokens| mean_pool(&tokens)).collect()
            }
        }
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

fn mean_pool(tokens: &[Vec<f32>]) -> Vec<f32> {
    let Some(width) = tokens.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut pooled = vec![0.0f32; width];
    for token in tokens {
        for (acc, value) in pooled.iter_mut().zip(token) {
            *acc += value;
        }
    }
    let count = tokens.len() as f32;
    pooled.iter_mut().for_each(|v| *v /= count);
    pooled
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        validate_inputs(PROVIDER, texts, self.max_input_chars)?;

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let vectors = self.retry.run("huggingface embed", || self.request(texts)).await?;
        check_embeddings(PROVIDER, texts.len(), self.dimensions, vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
