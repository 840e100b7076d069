//! Performance tracking for tool calls and whole requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Aggregated metrics for one tool or upstream API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolMetrics {
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_time_ms: u64,
}

impl ToolMetrics {
    fn record(&mut self, duration: Duration, success: bool) {
        self.calls += 1;
        self.total_time_ms += duration.as_millis() as u64;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Average time per call in milliseconds
    pub fn average_ms(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_time_ms as f64 / self.calls as f64
        }
    }

    /// Success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.successes as f64 * 100.0 / self.calls as f64
        }
    }
}

/// Serializable view of everything the monitor has seen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub tools: BTreeMap<String, ToolMetrics>,
    pub apis: BTreeMap<String, ToolMetrics>,
    pub total_requests: u64,
    pub total_request_time_ms: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl PerformanceSnapshot {
    /// Average request duration in milliseconds
    pub fn average_request_ms(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_request_time_ms as f64 / self.total_requests as f64
        }
    }

    /// Cache hit rate as a percentage
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 * 100.0 / lookups as f64
        }
    }
}

/// Collects timing metrics; shared by `Arc` between the registry and the agent
pub struct PerformanceMonitor {
    started_at: DateTime<Utc>,
    metrics: RwLock<PerformanceSnapshot>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            metrics: RwLock::new(PerformanceSnapshot::default()),
        }
    }

    /// Record one tool execution
    pub async fn record_tool(&self, tool: &str, duration: Duration, success: bool) {
        let mut metrics = self.metrics.write().await;
        metrics
            .tools
            .entry(tool.to_string())
            .or_default()
            .record(duration, success);
    }

    /// Record one upstream API call (language model, REST provider)
    pub async fn record_api(&self, api: &str, duration: Duration, success: bool) {
        let mut metrics = self.metrics.write().await;
        metrics
            .apis
            .entry(api.to_string())
            .or_default()
            .record(duration, success);
    }

    /// Record an adapter cache lookup
    pub async fn record_cache(&self, hit: bool) {
        let mut metrics = self.metrics.write().await;
        if hit {
            metrics.cache_hits += 1;
        } else {
            metrics.cache_misses += 1;
        }
    }

    /// Record one end-to-end request
    pub async fn record_request(&self, duration: Duration) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;
        metrics.total_request_time_ms += duration.as_millis() as u64;
    }

    /// Copy of the current metrics
    pub async fn snapshot(&self) -> PerformanceSnapshot {
        self.metrics.read().await.clone()
    }

    /// Human-readable summary
    pub async fn summary(&self) -> String {
        let metrics = self.snapshot().await;
        let uptime = (Utc::now() - self.started_at).num_seconds().max(0);

        let mut out = format!(
            "📊 **Performance Summary**\n\n\
             ⏱️ **Uptime:** {}h {}m\n\
             📈 **Total Requests:** {}\n\
             ⚡ **Average Response Time:** {:.2}s\n\
             💾 **Cache Hit Rate:** {:.1}%\n\n\
             🔧 **Tool Performance:**\n",
            uptime / 3600,
            (uptime % 3600) / 60,
            metrics.total_requests,
            metrics.average_request_ms() / 1000.0,
            metrics.cache_hit_rate(),
        );

        for (name, tool) in &metrics.tools {
            out.push_str(&format!(
                "• **{}:** {:.2}s avg ({:.1}% success)\n",
                name,
                tool.average_ms() / 1000.0,
                tool.success_rate()
            ));
        }

        if !metrics.apis.is_empty() {
            out.push_str("\n🌐 **API Performance:**\n");
            for (name, api) in &metrics.apis {
                out.push_str(&format!(
                    "• **{}:** {:.2}s avg ({:.1}% success)\n",
                    name,
                    api.average_ms() / 1000.0,
                    api.success_rate()
                ));
            }
        }

        out
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
