//! Deterministic in-process backends for tests and offline development.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::{EmbeddingProvider, validate_inputs};
use crate::error::{RagError, Result};
use crate::llm::{ChatMessage, ChatModel, GenerationOptions, ModelResponse};

fn hash_of(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Embeds text as a normalized bag of hashed words.
///
/// Texts that share words get similar vectors, identical texts get identical
/// vectors, and no network is involved.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase);

        let mut any = false;
        for word in words {
            let h = hash_of(&word);
            let sign = if h & 1 == 0 { 1.0 } else { -1.0 };
            vector[(h >> 1) as usize % self.dimensions] += sign;
            any = true;
        }
        if !any {
            vector[hash_of(text) as usize % self.dimensions] = 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        validate_inputs("hash", texts, usize::MAX)?;
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// A chat model that replies with a canned response and records requests.
#[derive(Debug)]
pub struct MockChatModel {
    reply: std::result::Result<ModelResponse, String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatModel {
    /// Reply with `text` to every request.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_response(ModelResponse::text(text))
    }

    /// Reply with `response` to every request.
    pub fn with_response(response: ModelResponse) -> Self {
        Self { reply: Ok(response), calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) }
    }

    /// Fail every request with a non-retryable [`RagError::LanguageModelError`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self { reply: Err(message.into()), calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) }
    }

    /// Number of `chat_complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages of the most recent request.
    pub fn last_request(&self) -> Option<Vec<ChatMessage>> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<ModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        self.reply.clone().map_err(|message| RagError::LanguageModelError {
            provider: "mock".into(),
            message,
            retryable: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::cosine_similarity;

    #[tokio::test]
    async fn hash_embeddings_are_deterministic_and_normalized() {
        let provider = HashEmbeddingProvider::new(32);
        let a = provider.embed_one("Rust ownership rules").await.unwrap();
        let b = provider.embed_one("Rust ownership rules").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_words_score_higher() {
        let provider = HashEmbeddingProvider::new(64);
        let query = provider.embed_one("pgvector cosine distance").await.unwrap();
        let related = provider.embed_one("cosine distance in pgvector").await.unwrap();
        let unrelated = provider.embed_one("banana bread recipe").await.unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn mock_model_records_requests() {
        let model = MockChatModel::new("ok");
        let reply =
            model.chat_complete(&[ChatMessage::user("hi")], &GenerationOptions::default()).await.unwrap();
        assert_eq!(reply.plain_text().as_deref(), Some("ok"));
        assert_eq!(model.calls(), 1);
        assert_eq!(model.last_request().unwrap(), vec![ChatMessage::user("hi")]);
    }
}
