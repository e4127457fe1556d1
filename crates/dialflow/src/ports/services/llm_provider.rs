//! Language Model Port
//!
//! Abstract interface for text generation. Used for conversational replies
//! and as the intent classifier's fallback tier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Turn, TurnRole};
use crate::domain::errors::DomainError;

/// Speaker of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One prompt message sent to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        match turn.role {
            TurnRole::Agent => ChatMessage::assistant(turn.text.clone()),
            TurnRole::Lead => ChatMessage::user(turn.text.clone()),
        }
    }
}

/// Generation knobs for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub max_tokens: Option<u32>,
    /// 0.0 - 2.0
    pub temperature: Option<f32>,
    pub stop_sequences: Option<Vec<String>>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        // Spoken replies are short
        Self {
            max_tokens: Some(150),
            temperature: Some(0.7),
            stop_sequences: None,
        }
    }
}

impl CompletionOptions {
    /// Deterministic `label|confidence` output for classification
    pub fn for_classification() -> Self {
        Self {
            max_tokens: Some(20),
            temperature: Some(0.0),
            stop_sequences: Some(vec!["\n".to_string()]),
        }
    }
}

/// What the model produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    /// Model that actually served the request
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Language model interface
///
/// Each provider has its own implementation; a null implementation is used
/// when no credentials are configured.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Raw chat completion
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse, DomainError>;

    /// Generate text from a system context and a conversation transcript
    async fn generate(
        &self,
        system_context: &str,
        transcript: &[Turn],
        options: &CompletionOptions,
    ) -> Result<String, DomainError> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(ChatMessage::system(system_context));
        messages.extend(transcript.iter().map(ChatMessage::from));
        let response = self.complete(&messages, options).await?;
        Ok(response.content.trim().to_string())
    }

    /// Provider label for logs ("openai", "null")
    fn provider_name(&self) -> &str;

    fn model_id(&self) -> &str;
}
