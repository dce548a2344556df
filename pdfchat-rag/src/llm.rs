//! Chat model trait and message types.
//!
//! A [`ChatModel`] turns a sequence of role-tagged messages into a
//! [`ModelResponse`]. Responses are structured (a list of content parts), and
//! [`ModelResponse::plain_text`] is the one place that flattens them into a
//! string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::Role;
use crate::error::Result;

/// Role of a message sent to a chat model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// A single message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// Sampling parameters passed with every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { temperature: Some(0.7), max_output_tokens: Some(1024) }
    }
}

/// One part of a model response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Answer text.
    Text { text: String },
    /// Reasoning text the model exposes separately from its answer.
    Thought { text: String },
    /// Anything else (tool calls, inline data); carried for logging only.
    Other { kind: String },
}

/// A structured chat model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelResponse {
    pub parts: Vec<ContentPart>,
    pub finish_reason: Option<String>,
}

impl ModelResponse {
    /// A response consisting of a single text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self { parts: vec![ContentPart::Text { text: text.into() }], finish_reason: None }
    }

    /// Concatenate the answer text parts, trimmed.
    ///
    /// Thought and non-text parts are skipped. Returns `None` if no answer
    /// text remains.
    pub fn plain_text(&self) -> Option<String> {
        let text: String = self
            .parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// A language model that answers a chat conversation in one request/response.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model identifier, for logs and errors.
    fn name(&self) -> &str;

    /// Send `messages` (oldest first) and return the model's reply.
    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<ModelResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_joins_text_parts_and_skips_the_rest() {
        let response = ModelResponse {
            parts: vec![
                ContentPart::Thought { text: "let me think".into() },
                ContentPart::Text { text: "  The answer ".into() },
                ContentPart::Other { kind: "function_call".into() },
                ContentPart::Text { text: "is 42.  ".into() },
            ],
            finish_reason: Some("STOP".into()),
        };
        assert_eq!(response.plain_text().as_deref(), Some("The answer is 42."));
    }

    #[test]
    fn plain_text_is_none_without_answer_text() {
        let response = ModelResponse {
            parts: vec![ContentPart::Thought { text: "hmm".into() }, ContentPart::Text { text: " ".into() }],
            finish_reason: None,
        };
        assert_eq!(response.plain_text(), None);
    }
}
