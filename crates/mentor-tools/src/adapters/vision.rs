//! Vision / document analysis adapter
//!
//! Images arrive either inline (`image_base64` + `mime_type`) or by
//! `image_url`; both go to the language model as one multimodal prompt.
//! Requests without an image get a text-only analysis.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use mentor_core::{PerformanceMonitor, Settings};
use mentor_llm::ChatManager;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{contains_any, http_client};
use crate::kind::ToolKind;
use crate::tool::{Tool, ToolOptions, ToolOutput};

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_MIME: &str = "image/jpeg";

const VISION_INDICATORS: &[&str] = &[
    "analyze image", "describe image", "what's in this image", "read document", "extract text",
    "summarize document", "analyze photo", "describe picture", "what do you see", "ocr",
    "text recognition", "image to text", "analyze chart", "read graph", "interpret diagram",
    "business card", "receipt analysis", "invoice processing",
];

/// What kind of visual analysis the request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    BusinessCard,
    Receipt,
    Chart,
    TextExtraction,
    Document,
    General,
}

impl AnalysisKind {
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if contains_any(&lower, &["business card", "contact", "card"]) {
            AnalysisKind::BusinessCard
        } else if contains_any(&lower, &["receipt", "invoice", "bill"]) {
            AnalysisKind::Receipt
        } else if contains_any(&lower, &["chart", "graph", "plot", "diagram"]) {
            AnalysisKind::Chart
        } else if contains_any(&lower, &["text", "ocr", "read", "extract"]) {
            AnalysisKind::TextExtraction
        } else if contains_any(&lower, &["document", "paper", "form"]) {
            AnalysisKind::Document
        } else {
            AnalysisKind::General
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            AnalysisKind::BusinessCard => {
                "Analyze this business card and extract the name and title, company, \
                 phone, email, address, and any other relevant details."
            }
            AnalysisKind::Receipt => {
                "Analyze this receipt or invoice and extract the business, date and time, \
                 items with prices, the total, and the payment method if visible."
            }
            AnalysisKind::Chart => {
                "Analyze this chart: name the chart type, the key data points and trends, \
                 and summarize what the data shows."
            }
            AnalysisKind::TextExtraction => {
                "Transcribe all visible text from this image, keeping its structure. \
                 Organize multiple sections clearly."
            }
            AnalysisKind::Document => {
                "Analyze this document: its type and purpose, a summary of its content, \
                 important details, and any action items."
            }
            AnalysisKind::General => {
                "Describe what you see in this image: key objects or people, the setting, \
                 any text, and its overall purpose."
            }
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            AnalysisKind::BusinessCard => "👤 **Business Card Analysis**",
            AnalysisKind::Receipt => "🧾 **Receipt/Invoice Analysis**",
            AnalysisKind::Chart => "📊 **Chart Analysis**",
            AnalysisKind::TextExtraction => "📝 **Text Extraction**",
            AnalysisKind::Document => "📄 **Document Analysis**",
            AnalysisKind::General => "🔍 **Image Analysis**",
        }
    }
}

/// Vision tool
pub struct VisionTool {
    client: Client,
    llm: Option<Arc<ChatManager>>,
    monitor: Option<Arc<PerformanceMonitor>>,
}

impl VisionTool {
    pub fn new(settings: &Settings, llm: Option<Arc<ChatManager>>) -> Self {
        Self {
            client: http_client(Duration::from_secs(settings.tool_timeout_secs.max(1) * 3)),
            llm,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Download an image and return (mime type, base64 payload)
    async fn download(&self, url: &str) -> Result<(String, String)> {
        let start = Instant::now();
        let result: Result<(String, String)> = async {
            let response = self.client.get(url).send().await.context("Failed to download image")?;
            if !response.status().is_success() {
                bail!("Image download failed with {}", response.status());
            }
            let mime = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
                .filter(|v| v.starts_with("image/"))
                .unwrap_or_else(|| DEFAULT_MIME.to_string());
            let bytes = response.bytes().await.context("Failed to read image body")?;
            if bytes.len() > MAX_IMAGE_BYTES {
                bail!("Image is larger than {} MB", MAX_IMAGE_BYTES / (1024 * 1024));
            }
            Ok((mime, STANDARD.encode(&bytes)))
        }
        .await;

        if let Some(monitor) = &self.monitor {
            monitor.record_api("image_download", start.elapsed(), result.is_ok()).await;
        }
        result
    }

    async fn analyze_image(&self, llm: &ChatManager, text: &str, mime: &str, data: &str) -> Result<ToolOutput> {
        let kind = AnalysisKind::detect(text);
        info!(analysis = ?kind, mime = %mime, "Analyzing image");
        let prompt = format!("User request: {}\n\n{}", text, kind.instructions());
        match llm.generate_with_image(&prompt, mime, data).await {
            Ok(reply) if !reply.trim().is_empty() => {
                Ok(ToolOutput::ok(format!("{}\n\n{}", kind.heading(), reply.trim())))
            }
            Ok(_) => Ok(ToolOutput::failed("❌ Could not analyze the image. Please try again.")),
            Err(e) => {
                warn!("Image analysis failed: {:#}", e);
                Ok(ToolOutput::failed(format!("❌ Error analyzing image: {}", e)))
            }
        }
    }

    async fn analyze_text(&self, llm: &ChatManager, text: &str) -> Result<ToolOutput> {
        let lower = text.to_lowercase();
        let prompt = if contains_any(&lower, &["document", "text", "analyze", "summarize"]) {
            format!(
                "You are an assistant with document and image processing capabilities.\n\n\
                 User request: \"{}\"\n\n\
                 Help with the request. If no file was attached, explain what you can do with \
                 documents and images and how to share one.",
                text
            )
        } else {
            format!("Respond to this query with careful analysis:\n\n\"{}\"", text)
        };

        match llm.generate(&prompt).await {
            Ok(reply) if !reply.trim().is_empty() => {
                Ok(ToolOutput::ok(format!("🤖 **Advanced AI Analysis**\n\n{}", reply.trim())))
            }
            Ok(_) => Ok(ToolOutput::failed("❌ Could not process the request. Please try again.")),
            Err(e) => {
                warn!("Text analysis failed: {:#}", e);
                Ok(ToolOutput::failed(format!("❌ Error processing request: {}", e)))
            }
        }
    }
}

#[async_trait]
impl Tool for VisionTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Vision
    }

    fn description(&self) -> &str {
        "Analyze images and documents: OCR, business cards, receipts, charts"
    }

    fn can_handle(&self, text: &str) -> bool {
        contains_any(&text.to_lowercase(), VISION_INDICATORS)
    }

    async fn execute(&self, text: &str, options: &ToolOptions) -> Result<ToolOutput> {
        let Some(llm) = self.llm.as_deref() else {
            return Ok(ToolOutput::failed(
                "❌ Image and document analysis needs a language model. Set GEMINI_API_KEY to enable it.",
            ));
        };

        if let Some(data) = options.param_str("image_base64") {
            let mime = options.param_str("mime_type").unwrap_or(DEFAULT_MIME);
            return self.analyze_image(llm, text, mime, data).await;
        }

        if let Some(url) = options.param_str("image_url") {
            return match self.download(url).await {
                Ok((mime, data)) => self.analyze_image(llm, text, &mime, &data).await,
                Err(e) => Ok(ToolOutput::failed(format!("❌ No valid image provided for analysis: {}", e))),
            };
        }

        self.analyze_text(llm, text).await
    }

    fn is_available(&self) -> bool {
        self.llm.is_some()
    }
}
