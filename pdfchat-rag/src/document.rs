//! Data types for chunks, search results, and conversation turns.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A segment of an ingested document with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk (UUID v4).
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// File name of the document the chunk was cut from.
    pub source: String,
    /// Position of the chunk within its document, starting at zero.
    pub chunk_index: usize,
    /// Identifier shared by every chunk of one ingestion.
    pub document_id: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// The structured metadata persisted next to the chunk text.
    pub fn metadata(&self) -> Value {
        json!({
            "source": self.source,
            "chunk_index": self.chunk_index,
            "document_id": self.document_id,
        })
    }

    /// Rebuild the metadata fields of a chunk from a stored JSON object.
    ///
    /// `chunk_index` is accepted either as a number or as a numeric string;
    /// missing fields fall back to empty values.
    pub fn metadata_fields(metadata: &Value) -> (String, usize, String) {
        let source = metadata.get("source").and_then(Value::as_str).unwrap_or_default();
        let chunk_index = match metadata.get("chunk_index") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or_default() as usize,
            Some(Value::String(s)) => s.parse().unwrap_or_default(),
            _ => 0,
        };
        let document_id = metadata.get("document_id").and_then(Value::as_str).unwrap_or_default();
        (source.to_string(), chunk_index, document_id.to_string())
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The cosine similarity score (higher is more relevant).
    pub score: f32,
}

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation history, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A generated answer. Always plain text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub text: String,
}
