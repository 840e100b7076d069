//! Core Tool trait and types
//!
//! A tool claims requests through a cheap keyword predicate (`can_handle`) and
//! answers them asynchronously (`execute`). Every answer carries an explicit
//! [`OutputStatus`] so callers never have to guess whether text is real data.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::kind::ToolKind;

/// How trustworthy a tool answer is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputStatus {
    /// Real data from the upstream service
    #[default]
    Ok,
    /// Synthetic demo data, never authoritative
    Placeholder,
    /// The tool ran but could not answer; content explains why
    Failed,
}

/// Text answer plus its status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    pub status: OutputStatus,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: OutputStatus::Ok,
        }
    }

    pub fn placeholder(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: OutputStatus::Placeholder,
        }
    }

    pub fn failed(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: OutputStatus::Failed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == OutputStatus::Ok
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Per-call options: who is asking plus structured parameters
#[derive(Debug, Clone, Default)]
pub struct ToolOptions {
    pub user_id: Option<String>,
    pub params: Map<String, Value>,
}

impl ToolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            params: Map::new(),
        }
    }

    /// Builder-style parameter insert
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Non-empty string parameter
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Core trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which capability this tool provides
    fn kind(&self) -> ToolKind;

    /// Display name (unique identifier)
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Human-readable description
    fn description(&self) -> &str;

    /// Cheap keyword check; must not do I/O
    fn can_handle(&self, text: &str) -> bool;

    /// Answer the request
    async fn execute(&self, text: &str, options: &ToolOptions) -> Result<ToolOutput>;

    /// Whether the upstream service is configured
    fn is_available(&self) -> bool {
        true
    }
}

/// Type alias for shared tools
pub type BoxedTool = Arc<dyn Tool>;

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;
type Handler = Arc<dyn Fn(&str, &ToolOptions) -> Result<ToolOutput> + Send + Sync>;

/// Closure-backed tool, handy for tests and lightweight integrations
#[derive(Clone)]
pub struct FnTool {
    kind: ToolKind,
    description: String,
    predicate: Predicate,
    handler: Handler,
}

impl FnTool {
    /// Tool that claims nothing until given keywords or a predicate
    pub fn new<F>(kind: ToolKind, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, &ToolOptions) -> Result<ToolOutput> + Send + Sync + 'static,
    {
        Self {
            kind,
            description: description.into(),
            predicate: Arc::new(|_| false),
            handler: Arc::new(handler),
        }
    }

    /// Claim requests containing any keyword (case-insensitive)
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        self.predicate = Arc::new(move |text| {
            let lower = text.to_lowercase();
            keywords.iter().any(|k| lower.contains(k.as_str()))
        });
        self
    }

    /// Replace the claim predicate
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .finish()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn can_handle(&self, text: &str) -> bool {
        (self.predicate)(text)
    }

    async fn execute(&self, text: &str, options: &ToolOptions) -> Result<ToolOutput> {
        (self.handler)(text, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_tool_keywords_and_handler() {
        let tool = FnTool::new(ToolKind::Lyrics, "echo", |text, _| Ok(ToolOutput::ok(text.to_uppercase())))
            .with_keywords(&["lyrics"]);

        assert!(tool.can_handle("Show me the LYRICS"));
        assert!(!tool.can_handle("weather"));
        assert_eq!(tool.name(), "Lyrics");

        let out = tool.execute("abc", &ToolOptions::new()).await.unwrap();
        assert_eq!(out.content, "ABC");
        assert!(out.is_ok());
    }

    #[test]
    fn test_param_str_skips_blank_values() {
        let options = ToolOptions::for_user("u1")
            .with_param("to", "a@example.com")
            .with_param("subject", "  ")
            .with_param("count", 3);

        assert_eq!(options.param_str("to"), Some("a@example.com"));
        assert_eq!(options.param_str("subject"), None);
        assert_eq!(options.param_str("count"), None);
        assert_eq!(options.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_status_serialization() {
        let out = ToolOutput::placeholder("demo");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["status"], "placeholder");
    }
}
