//! Grounded answer generation.
//!
//! [`AnswerGenerator`] puts the retrieved context into a system instruction,
//! replays the conversation history, asks the question, and reduces the
//! model's structured reply to plain text.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::{Answer, ConversationTurn};
use crate::error::{RagError, Result};
use crate::llm::{ChatMessage, ChatModel, GenerationOptions};

/// The answer given when retrieval found nothing to answer from.
pub const NO_CONTEXT_ANSWER: &str =
    "I don't know. The uploaded documents don't contain information that answers this question.";

const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant answering questions based ONLY on the \
uploaded PDF documents. Use only the context below. If the context does not contain the answer, \
say \"I don't know\" instead of guessing, and never make up facts.";

/// Builds grounded prompts and calls a [`ChatModel`].
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    options: GenerationOptions,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>, options: GenerationOptions) -> Self {
        Self { model, options }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// The full message list sent to the model: system instruction with the
    /// context, history oldest first, then the question.
    pub fn build_messages(question: &str, context: &str, history: &[ConversationTurn]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(format!("{SYSTEM_INSTRUCTION}\n\nContext:\n{context}")));
        messages.extend(history.iter().map(|turn| ChatMessage {
            role: turn.role.into(),
            content: turn.content.clone(),
        }));
        messages.push(ChatMessage::user(question));
        messages
    }

    /// Answer `question` from `context`.
    ///
    /// An empty context yields [`NO_CONTEXT_ANSWER`] without calling the model.
    ///
    /// # Errors
    ///
    /// [`RagError::LanguageModelError`] if the model fails or its reply has
    /// no text.
    pub async fn answer(&self, question: &str, context: &str, history: &[ConversationTurn]) -> Result<Answer> {
        if context.trim().is_empty() {
            debug!(model = self.model.name(), "no context retrieved, answering without model call");
            return Ok(Answer { text: NO_CONTEXT_ANSWER.to_string() });
        }

        let messages = Self::build_messages(question, context, history);
        let response = self.model.chat_complete(&messages, &self.options).await?;

        match response.plain_text() {
            Some(text) => {
                debug!(model = self.model.name(), chars = text.chars().count(), "answer generated");
                Ok(Answer { text })
            }
            None => {
                warn!(model = self.model.name(), finish_reason = ?response.finish_reason, "model returned no text");
                Err(RagError::LanguageModelError {
                    provider: self.model.name().to_string(),
                    message: format!(
                        "response contained no text (finish reason: {})",
                        response.finish_reason.as_deref().unwrap_or("unknown")
                    ),
                    retryable: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ContentPart, MessageRole, ModelResponse};
    use crate::mock::MockChatModel;

    #[test]
    fn messages_carry_context_history_and_question_in_order() {
        let history = vec![ConversationTurn::user("hi"), ConversationTurn::assistant("hello")];
        let messages = AnswerGenerator::build_messages("what is X?", "X is a widget.", &history);

        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant, MessageRole::User]
        );
        assert!(messages[0].content.contains("X is a widget."));
        assert!(messages[0].content.contains("I don't know"));
        assert_eq!(messages[3].content, "what is X?");
    }

    #[tokio::test]
    async fn empty_context_skips_the_model() {
        let model = Arc::new(MockChatModel::new("unused"));
        let generator = AnswerGenerator::new(model.clone(), GenerationOptions::default());

        let answer = generator.answer("anything?", "  ", &[]).await.unwrap();
        assert!(answer.text.contains("don't know"));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn structured_reply_is_flattened() {
        let model = Arc::new(MockChatModel::with_response(ModelResponse {
            parts: vec![
                ContentPart::Thought { text: "checking context".into() },
                ContentPart::Text { text: " X is a widget. ".into() },
            ],
            finish_reason: Some("STOP".into()),
        }));
        let generator = AnswerGenerator::new(model, GenerationOptions::default());

        let answer = generator.answer("what is X?", "X is a widget.", &[]).await.unwrap();
        assert_eq!(answer.text, "X is a widget.");
    }

    #[tokio::test]
    async fn reply_without_text_is_an_error() {
        let model = Arc::new(MockChatModel::with_response(ModelResponse::default()));
        let generator = AnswerGenerator::new(model, GenerationOptions::default());

        assert!(matches!(
            generator.answer("what is X?", "X is a widget.", &[]).await,
            Err(RagError::LanguageModelError { .. })
        ));
    }
}
