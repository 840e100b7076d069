//! LLM Provider Traits and Types
//!
//! This module defines the common interface for all language model providers.
//! The assistant only needs plain text generation (optionally with one inline
//! image), so the trait is intentionally small.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Provider types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Gemini,
    Custom(String),
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Gemini => write!(f, "gemini"),
            ProviderType::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err("Empty provider type".to_string()),
            "gemini" | "google" => Ok(ProviderType::Gemini),
            other => Ok(ProviderType::Custom(other.to_string())),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub model: String,
    pub provider: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    /// Text content of the reply
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// Shared provider handle for dynamic dispatch
pub type BoxedProvider = Arc<dyn LlmProvider>;

/// LLM Provider trait
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// Model used for requests
    fn model(&self) -> &str;

    /// Send a conversation and return the assistant reply
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse>;

    /// Single-prompt convenience wrapper around `chat`
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self.chat(vec![ChatMessage::user(prompt)]).await?;
        Ok(response.message.content)
    }

    /// Prompt with one inline image (base64 payload)
    async fn generate_with_image(&self, _prompt: &str, _mime_type: &str, _data_base64: &str) -> Result<String> {
        Err(anyhow::anyhow!(
            "Provider {} does not support image input",
            self.provider_type()
        ))
    }
}

/// Whether an error chain looks like a provider quota / rate-limit failure.
///
/// Typed causes are trusted; anything else is matched on its text.
pub fn is_quota_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| match cause.downcast_ref::<mentor_core::Error>() {
        Some(typed) => typed.is_quota(),
        None => mentor_core::error::is_quota_message(&cause.to_string()),
    })
}
