//! Tool Registry
//!
//! Holds one adapter per [`ToolKind`] and maps free text to the adapter that
//! should answer it:
//! - every adapter's `can_handle` is evaluated in registration order
//! - among the matches the one earliest in [`ToolKind::PRIORITY`] wins
//! - when nothing matches, the fallback (web search) is returned
//!
//! Execution goes through the registry too, so timeouts and metrics are
//! applied uniformly.

use anyhow::Result;
use mentor_core::{Error, PerformanceMonitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::kind::ToolKind;
use crate::tool::{BoxedTool, OutputStatus, ToolOptions, ToolOutput};

/// Upper bound for one adapter call, including its internal fallbacks
const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// A registered tool
struct RegisteredTool {
    tool: BoxedTool,
}

impl RegisteredTool {
    fn new(tool: BoxedTool) -> Self {
        Self { tool }
    }

    /// Predicate that never propagates a panic
    fn claims(&self, text: &str) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.tool.can_handle(text))) {
            Ok(claimed) => claimed,
            Err(_) => {
                warn!(tool = %self.tool.kind(), "can_handle panicked; treating as no match");
                false
            }
        }
    }
}

/// Statistics about the registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_registered: usize,
    pub selections: u64,
    pub fallback_selections: u64,
    pub total_calls: u64,
    pub failed_calls: u64,
    pub calls_per_tool: BTreeMap<String, u64>,
}

/// Public listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub priority: usize,
    pub available: bool,
}

/// Tool Registry
pub struct ToolRegistry {
    /// Registration order is kept; one entry per kind
    tools: RwLock<Vec<Arc<RegisteredTool>>>,
    stats: RwLock<RegistryStats>,
    monitor: Option<Arc<PerformanceMonitor>>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(Vec::new()),
            stats: RwLock::new(RegistryStats::default()),
            monitor: None,
            timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }

    /// Record every execution with a performance monitor
    pub fn with_monitor(mut self, monitor: Arc<PerformanceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool; a second tool of the same kind replaces the first in place
    pub async fn register(&self, tool: BoxedTool) {
        let kind = tool.kind();
        let entry = Arc::new(RegisteredTool::new(tool));

        let total = {
            let mut tools = self.tools.write().await;
            match tools.iter().position(|t| t.tool.kind() == kind) {
                Some(index) => {
                    warn!(tool = %kind, "Replacing already registered tool");
                    tools[index] = entry;
                }
                None => tools.push(entry),
            }
            tools.len()
        };

        self.stats.write().await.total_registered = total;
        debug!(tool = %kind, "Registered tool");
    }

    /// Get a tool by kind
    pub async fn get(&self, kind: ToolKind) -> Option<BoxedTool> {
        self.tools
            .read()
            .await
            .iter()
            .find(|t| t.tool.kind() == kind)
            .map(|t| t.tool.clone())
    }

    /// Get a tool by display name or alias
    pub async fn get_by_name(&self, name: &str) -> Option<BoxedTool> {
        let kind = name.parse::<ToolKind>().ok()?;
        self.get(kind).await
    }

    /// All tools in registration order
    pub async fn list(&self) -> Vec<BoxedTool> {
        self.tools.read().await.iter().map(|t| t.tool.clone()).collect()
    }

    /// Listing for help pages and the HTTP API, in priority order
    pub async fn summaries(&self) -> Vec<ToolSummary> {
        let mut summaries: Vec<ToolSummary> = self
            .tools
            .read()
            .await
            .iter()
            .map(|t| ToolSummary {
                name: t.tool.name().to_string(),
                description: t.tool.description().to_string(),
                priority: t.tool.kind().priority(),
                available: t.tool.is_available(),
            })
            .collect();
        summaries.sort_by_key(|s| s.priority);
        summaries
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }

    /// Every tool that claims the text, in registration order
    pub async fn matching(&self, text: &str) -> Vec<BoxedTool> {
        self.tools
            .read()
            .await
            .iter()
            .filter(|t| t.claims(text))
            .map(|t| t.tool.clone())
            .collect()
    }

    /// The designated last-resort tool
    pub async fn fallback(&self) -> Option<BoxedTool> {
        self.get(ToolKind::FALLBACK).await
    }

    /// Pick the tool for this text: highest-priority claimant, else the fallback
    pub async fn select_tool(&self, text: &str) -> Option<BoxedTool> {
        let matches = self.matching(text).await;
        let selected = matches.into_iter().min_by_key(|t| t.kind().priority());

        let mut stats = self.stats.write().await;
        stats.selections += 1;

        match selected {
            Some(tool) => {
                debug!(tool = %tool.kind(), "Selected tool");
                Some(tool)
            }
            None => {
                stats.fallback_selections += 1;
                drop(stats);
                let fallback = self.fallback().await;
                match &fallback {
                    Some(tool) => debug!(tool = %tool.kind(), "No tool matched; using fallback"),
                    None => warn!("No tool matched and no fallback tool is registered"),
                }
                fallback
            }
        }
    }

    /// name → description for prompt building
    pub async fn describe_all(&self) -> BTreeMap<String, String> {
        self.tools
            .read()
            .await
            .iter()
            .map(|t| (t.tool.name().to_string(), t.tool.description().to_string()))
            .collect()
    }

    /// Run a tool with the registry timeout, recording metrics
    pub async fn execute(&self, kind: ToolKind, text: &str, options: &ToolOptions) -> Result<ToolOutput> {
        let entry = self
            .tools
            .read()
            .await
            .iter()
            .find(|t| t.tool.kind() == kind)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("tool {}", kind)))?;

        info!(tool = %kind, "Executing tool");

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, entry.tool.execute(text, options)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "{} timed out after {:.1}s",
                kind,
                self.timeout.as_secs_f64()
            ))
            .into()),
        };
        let elapsed = start.elapsed();

        let succeeded = matches!(&result, Ok(out) if out.status != OutputStatus::Failed);
        if let Some(monitor) = &self.monitor {
            monitor.record_tool(kind.name(), elapsed, succeeded).await;
        }

        {
            let mut stats = self.stats.write().await;
            stats.total_calls += 1;
            *stats.calls_per_tool.entry(kind.name().to_string()).or_default() += 1;
            if !succeeded {
                stats.failed_calls += 1;
            }
        }

        match &result {
            Ok(out) => debug!(
                tool = %kind,
                status = ?out.status,
                elapsed_ms = elapsed.as_millis() as u64,
                "Tool finished"
            ),
            Err(e) => warn!(tool = %kind, "Tool failed: {:#}", e),
        }

        result
    }

    /// Get registry statistics
    pub async fn stats(&self) -> RegistryStats {
        self.stats.read().await.clone()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
