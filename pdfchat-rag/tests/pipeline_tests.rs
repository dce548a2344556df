//! End-to-end tests of ingestion and question answering with in-process backends.

use std::sync::Arc;

use async_trait::async_trait;
use pdfchat_rag::mock::{HashEmbeddingProvider, MockChatModel};
use pdfchat_rag::{
    ConversationTurn, EmbeddingProvider, InMemoryVectorStore, MessageRole, RagConfig, RagError,
    RagPipeline, Result, VectorStore,
};
use proptest::prelude::*;

const DIM: usize = 64;

fn pipeline_with(model: Arc<MockChatModel>, store: Arc<InMemoryVectorStore>) -> RagPipeline {
    RagPipeline::builder()
        .config(RagConfig::builder().chunk_size(200).chunk_overlap(20).top_k(4).build().unwrap())
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM)))
        .vector_store(store)
        .chat_model(model)
        .build()
        .unwrap()
}

fn handbook() -> String {
    [
        "Employees receive twenty five vacation days per calendar year.",
        "Unused vacation days carry over until the end of March.",
        "The office is closed on public holidays and between Christmas and New Year.",
        "Expense reports must be filed within thirty days of travel.",
        "Remote work is possible up to three days per week with manager approval.",
    ]
    .iter()
    .cycle()
    .take(15)
    .cloned()
    .collect::<Vec<_>>()
    .join(" ")
}

#[tokio::test]
async fn ten_character_document_is_rejected_as_empty() {
    let store = Arc::new(InMemoryVectorStore::new(DIM));
    let pipeline = pipeline_with(Arc::new(MockChatModel::new("unused")), store.clone());

    let err = pipeline.ingest_text("tiny.pdf", "0123456789").await.unwrap_err();
    assert!(matches!(err, RagError::EmptyDocument { chars: 10, min_chars: 50 }));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn empty_store_answers_dont_know_without_sources() {
    let model = Arc::new(MockChatModel::new("should not be called"));
    let pipeline = pipeline_with(model.clone(), Arc::new(InMemoryVectorStore::new(DIM)));

    let reply = pipeline.ask("How many vacation days do I get?", &[]).await.unwrap();
    assert!(reply.answer.contains("don't know"));
    assert!(reply.sources.is_empty());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn ingestion_stores_contiguous_chunk_indices() {
    let store = Arc::new(InMemoryVectorStore::new(DIM));
    let pipeline = pipeline_with(Arc::new(MockChatModel::new("ok")), store.clone());

    let report = pipeline.ingest_text("handbook.pdf", &handbook()).await.unwrap();
    assert!(report.chunks_stored >= 2);
    assert_eq!(report.source, "handbook.pdf");
    assert_eq!(store.count().await.unwrap(), report.chunks_stored);

    let probe = vec![1.0; DIM];
    let mut stored = store.search(&probe, report.chunks_stored).await.unwrap();
    stored.sort_by_key(|r| r.chunk.chunk_index);
    let indices: Vec<usize> = stored.iter().map(|r| r.chunk.chunk_index).collect();
    assert_eq!(indices, (0..report.chunks_stored).collect::<Vec<_>>());
    assert!(stored.iter().all(|r| r.chunk.document_id == report.document_id));
}

#[tokio::test]
async fn each_ingestion_gets_a_fresh_document_id() {
    let pipeline = pipeline_with(Arc::new(MockChatModel::new("ok")), Arc::new(InMemoryVectorStore::new(DIM)));
    let first = pipeline.ingest_text("a.pdf", &handbook()).await.unwrap();
    let second = pipeline.ingest_text("a.pdf", &handbook()).await.unwrap();
    assert_ne!(first.document_id, second.document_id);
}

#[tokio::test]
async fn answers_cite_sources_and_send_history_in_order() {
    let model = Arc::new(MockChatModel::new("You get twenty five vacation days."));
    let pipeline = pipeline_with(model.clone(), Arc::new(InMemoryVectorStore::new(DIM)));
    pipeline.ingest_text("handbook.pdf", &handbook()).await.unwrap();

    let history = vec![
        ConversationTurn::user("Hi, I have questions about the handbook."),
        ConversationTurn::assistant("Sure, ask away."),
    ];
    let reply = pipeline.ask("How many vacation days do employees receive?", &history).await.unwrap();

    assert_eq!(reply.answer, "You get twenty five vacation days.");
    assert_eq!(reply.sources, vec!["handbook.pdf"]);

    let request = model.last_request().unwrap();
    let roles: Vec<MessageRole> = request.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![MessageRole::System, MessageRole::User, MessageRole::Assistant, MessageRole::User]);
    assert!(request[0].content.contains("vacation"));
    assert_eq!(request[1].content, history[0].content);
    assert_eq!(request[3].content, "How many vacation days do employees receive?");
}

#[tokio::test]
async fn removing_a_source_leaves_other_documents() {
    let store = Arc::new(InMemoryVectorStore::new(DIM));
    let pipeline = pipeline_with(Arc::new(MockChatModel::new("ok")), store.clone());
    let kept = pipeline.ingest_text("keep.pdf", &handbook()).await.unwrap();
    let dropped = pipeline.ingest_text("drop.pdf", &handbook()).await.unwrap();

    assert_eq!(pipeline.remove_source("drop.pdf").await.unwrap(), dropped.chunks_stored);
    assert_eq!(pipeline.chunk_count().await.unwrap(), kept.chunks_stored);
}

#[tokio::test]
async fn model_failure_surfaces_as_language_model_error() {
    let pipeline =
        pipeline_with(Arc::new(MockChatModel::failing("quota exceeded")), Arc::new(InMemoryVectorStore::new(DIM)));
    pipeline.ingest_text("handbook.pdf", &handbook()).await.unwrap();

    let err = pipeline.ask("How many vacation days?", &[]).await.unwrap_err();
    assert!(matches!(err, RagError::LanguageModelError { .. }));
}

/// An embedder that answers with vectors one entry too short.
struct ShortVectors;

#[async_trait]
impl EmbeddingProvider for ShortVectors {
    fn name(&self) -> &str {
        "short"
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.1; DIM - 1]).collect())
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

#[tokio::test]
async fn wrong_dimension_from_embedder_writes_nothing() {
    let store = Arc::new(InMemoryVectorStore::new(DIM));
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(ShortVectors))
        .vector_store(store.clone())
        .chat_model(Arc::new(MockChatModel::new("ok")))
        .build()
        .unwrap();

    let err = pipeline.ingest_text("handbook.pdf", &handbook()).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: DIM, actual } if actual == DIM - 1));
    assert_eq!(store.count().await.unwrap(), 0);
}

/// An embedder that loses the last vector of every batch.
struct DropsLast(HashEmbeddingProvider);

#[async_trait]
impl EmbeddingProvider for DropsLast {
    fn name(&self) -> &str {
        "drops-last"
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = self.0.embed(texts).await?;
        vectors.pop();
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

#[tokio::test]
async fn missing_embedding_fails_ingestion_and_writes_nothing() {
    let store = Arc::new(InMemoryVectorStore::new(DIM));
    let pipeline = RagPipeline::builder()
        .config(RagConfig::builder().chunk_size(200).chunk_overlap(20).build().unwrap())
        .embedding_provider(Arc::new(DropsLast(HashEmbeddingProvider::new(DIM))))
        .vector_store(store.clone())
        .chat_model(Arc::new(MockChatModel::new("ok")))
        .build()
        .unwrap();

    let err = pipeline.ingest_text("handbook.pdf", &handbook()).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { ref provider, .. } if provider == "drops-last"));
    assert_eq!(store.count().await.unwrap(), 0);
}

/// **Feature: pdfchat-rag, Property 7: Batch and single embeddings agree**
/// *For any* text, `embed(&[t])` SHALL equal `[embed_one(t)]`.
mod prop_embed_batch_matches_single {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn embed_batch_equals_embed_one(texts in proptest::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,6}", 1..8)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let provider = HashEmbeddingProvider::new(DIM);
            let (batch, singles) = rt.block_on(async {
                let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                let batch = provider.embed(&refs).await.unwrap();
                let mut singles = Vec::new();
                for text in &texts {
                    singles.push(provider.embed_one(text).await.unwrap());
                }
                (batch, singles)
            });
            prop_assert_eq!(batch, singles);
        }
    }
}
