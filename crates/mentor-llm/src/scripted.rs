//! Scripted provider
//!
//! Answers from a closure instead of a remote model. Used for offline runs and
//! by the test suites of the crates above this one.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::provider::{ChatMessage, ChatResponse, LlmProvider, ProviderType};

type Responder = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Provider whose replies come from a closure over the flattened prompt
pub struct ScriptedProvider {
    responder: Responder,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with the same text
    pub fn fixed(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Always fail with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_| Err(anyhow::anyhow!("{}", message)))
    }

    /// Every prompt seen so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn respond(&self, prompt: String) -> Result<String> {
        if let Ok(mut seen) = self.prompts.lock() {
            seen.push(prompt.clone());
        }
        (self.responder)(&prompt)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Custom("scripted".to_string())
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let text = self.respond(prompt)?;
        Ok(ChatResponse {
            message: ChatMessage::assistant(text),
            model: "scripted".to_string(),
            provider: "scripted".to_string(),
            finish_reason: Some("stop".to_string()),
            usage: None,
        })
    }

    async fn generate_with_image(&self, prompt: &str, mime_type: &str, _data_base64: &str) -> Result<String> {
        self.respond(format!("[image {}] {}", mime_type, prompt))
    }
}
