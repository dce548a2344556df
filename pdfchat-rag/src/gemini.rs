//! Gemini chat model backed by the `generateContent` REST endpoint.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{RagError, Result};
use crate::llm::{ChatMessage, ChatModel, ContentPart, GenerationOptions, MessageRole, ModelResponse};
use crate::retry::{RetryPolicy, is_transient_status};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default chat model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const PROVIDER: &str = "Gemini";

/// A [`ChatModel`] backed by the Gemini API.
///
/// System messages are sent as the request's `systemInstruction`; user and
/// assistant messages become `user` and `model` turns.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::gemini::GeminiChatModel;
///
/// let model = GeminiChatModel::from_env()?;
/// let reply = model.chat_complete(&messages, &GenerationOptions::default()).await?;
/// ```
pub struct GeminiChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiChatModel {
    /// Create a new client for [`DEFAULT_MODEL`].
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            retry: RetryPolicy::default().with_attempt_timeout(Duration::from_secs(60)),
        })
    }

    /// Create a new client using the `GOOGLE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| RagError::ConfigError("GOOGLE_API_KEY environment variable not set".into()))?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `gemini-2.5-pro`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the retry policy applied to every request.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }

    async fn request(&self, body: &GenerateContentRequest) -> Result<ModelResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::LanguageModelError {
                    provider: PROVIDER.into(),
                    message: format!("request failed: {e}"),
                    retryable: true,
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::LanguageModelError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
                retryable: is_transient_status(status.as_u16()),
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            RagError::LanguageModelError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
                retryable: false,
            }
        })?;

        parsed.into_model_response()
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn new(messages: &[ChatMessage], options: &GenerationOptions) -> Self {
        let system: Vec<Part> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| Part::text(&m.content))
            .collect();

        let contents = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    MessageRole::System => return None,
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                };
                Some(Content { role: Some(role.to_string()), parts: vec![Part::text(&m.content)] })
            })
            .collect();

        Self {
            system_instruction: (!system.is_empty()).then_some(Content { role: None, parts: system }),
            contents,
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    thought: bool,
    #[serde(default, skip_serializing)]
    function_call: Option<serde_json::Value>,
    #[serde(default, skip_serializing)]
    inline_data: Option<serde_json::Value>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self { text: Some(text.to_string()), ..Self::default() }
    }

    fn into_content_part(self) -> ContentPart {
        match self.text {
            Some(text) if self.thought => ContentPart::Thought { text },
            Some(text) => ContentPart::Text { text },
            None if self.function_call.is_some() => ContentPart::Other { kind: "function_call".into() },
            None if self.inline_data.is_some() => ContentPart::Other { kind: "inline_data".into() },
            None => ContentPart::Other { kind: "unknown".into() },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    fn into_model_response(self) -> Result<ModelResponse> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            warn!(provider = PROVIDER, block_reason = %reason, "prompt blocked");
            return Err(RagError::LanguageModelError {
                provider: PROVIDER.into(),
                message: format!("prompt was blocked: {reason}"),
                retryable: false,
            });
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| RagError::LanguageModelError {
            provider: PROVIDER.into(),
            message: "response contained no candidates".into(),
            retryable: false,
        })?;

        let parts = candidate
            .content
            .map(|c| c.parts.into_iter().map(Part::into_content_part).collect())
            .unwrap_or_default();

        Ok(ModelResponse { parts, finish_reason: candidate.finish_reason })
    }
}

// ── ChatModel implementation ───────────────────────────────────────

#[async_trait]
impl ChatModel for GeminiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn chat_complete(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<ModelResponse> {
        debug!(provider = PROVIDER, model = %self.model, messages = messages.len(), "generate content");
        let body = GenerateContentRequest::new(messages, options);
        self.retry.run("gemini generate", || self.request(&body)).await
    }
}
