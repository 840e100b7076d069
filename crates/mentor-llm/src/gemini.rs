//! Google Gemini API Client
//!
//! API key mode against Google AI Studio:
//! `POST {base}/models/{model}:generateContent?key={API_KEY}`
//!
//! Requests are sent once. A rate-limit response surfaces as an error whose
//! text contains the HTTP status (429) so callers can classify it as a quota
//! failure and switch to their templated responses.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::provider::{ChatMessage, ChatResponse, LlmProvider, ProviderType, TokenUsage};

// =============================================================================
// API ENDPOINT CONFIGURATION
// =============================================================================

/// Gemini API endpoints
pub mod endpoints {
    /// Google AI Studio (API key mode)
    pub const GOOGLE_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: Option<f32>,
    #[serde(rename = "topP")]
    top_p: Option<f32>,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            top_p: Some(0.95),
            max_output_tokens: Some(2048),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

impl GeminiResponse {
    /// Concatenate the text parts of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// CLIENT IMPLEMENTATION
// =============================================================================

/// Google Gemini Client (API key mode)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client with API key and model
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_url: endpoints::GOOGLE_AI_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    /// Create from settings; fails when no API key is configured
    pub fn from_settings(settings: &mentor_core::Settings) -> Result<Self> {
        let api_key = settings
            .gemini_api_key
            .clone()
            .ok_or_else(|| {
                mentor_core::Error::config("No Gemini credentials found. Set GEMINI_API_KEY or GOOGLE_API_KEY")
            })?;
        info!(model = %settings.gemini_model, "Gemini provider configured (API key mode)");
        Ok(Self::new(api_key, settings.gemini_model.clone()))
    }

    /// Create with custom endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_url = endpoint.into();
        self
    }

    /// Get the current API URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_url, self.model, self.api_key
        )
    }

    fn build_request(messages: Vec<ChatMessage>) -> GeminiRequest {
        let system_instruction = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart::text(m.content.clone())],
            });

        let contents = messages
            .into_iter()
            .filter(|m| m.role != "system")
            .map(|m| GeminiContent {
                role: if m.role == "assistant" { "model".to_string() } else { "user".to_string() },
                parts: vec![GeminiPart::text(m.content)],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(GenerationConfig::default()),
        }
    }

    async fn send(&self, request: &GeminiRequest) -> Result<GeminiResponse> {
        let url = self.build_url();
        debug!("Gemini request to: {}", url.split('?').next().unwrap_or(&url));

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send Gemini request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, body);
            return Err(mentor_core::Error::llm(format!("Gemini API error {}: {}", status, body)).into());
        }

        let raw_body = response
            .text()
            .await
            .context("Failed to read Gemini response body")?;

        serde_json::from_str(&raw_body).map_err(|e| {
            let preview: String = raw_body.chars().take(500).collect();
            anyhow::anyhow!("Failed to parse Gemini response: {}. Raw: {}", e, preview)
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse> {
        info!(model = %self.model, messages = messages.len(), "Gemini chat");

        let request = Self::build_request(messages);
        let result = self.send(&request).await?;

        let text = result.text();
        let finish_reason = result.candidates.first().and_then(|c| c.finish_reason.clone());
        let usage = result.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count.unwrap_or(0),
            completion_tokens: u.candidates_token_count.unwrap_or(0),
            total_tokens: u.total_token_count.unwrap_or(0),
        });

        Ok(ChatResponse {
            message: ChatMessage::assistant(text),
            model: self.model.clone(),
            provider: "gemini".to_string(),
            finish_reason,
            usage,
        })
    }

    async fn generate_with_image(&self, prompt: &str, mime_type: &str, data_base64: &str) -> Result<String> {
        info!(model = %self.model, mime = %mime_type, "Gemini vision request");

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![
                    GeminiPart::text(prompt),
                    GeminiPart {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: data_base64.to_string(),
                        }),
                    },
                ],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig::default()),
        };

        Ok(self.send(&request).await?.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_system_message() {
        let request = GeminiClient::build_request(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["contents"].as_array().unwrap().len(), 2);
        assert_eq!(json["contents"][1]["role"], "model");
        assert!(json["contents"][0]["parts"][0].get("inlineData").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}
        }"#;
        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), "Hello there");
    }

    #[test]
    fn test_blocked_response_has_empty_text() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_url_contains_model_and_key() {
        let client = GeminiClient::new("k", "gemini-1.5-flash-latest").with_endpoint("http://localhost:9");
        assert_eq!(
            client.build_url(),
            "http://localhost:9/models/gemini-1.5-flash-latest:generateContent?key=k"
        );
    }
}
