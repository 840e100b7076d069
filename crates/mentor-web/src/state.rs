//! Application State
//!
//! Everything the handlers share: the orchestrator and the services injected
//! into it.

use anyhow::{Context, Result};
use mentor_chat::{Agent, ConversationMemory};
use mentor_core::{PerformanceMonitor, QuotaTracker, Settings};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct AppState {
    pub agent: Arc<Agent>,
    pub quota: Arc<QuotaTracker>,
    pub monitor: Arc<PerformanceMonitor>,
    pub settings: Settings,
    pub start_time: Instant,
}

impl AppState {
    /// Build the full stack and restore saved conversations
    pub async fn new(settings: Settings) -> Result<Self> {
        let quota = Arc::new(QuotaTracker::new(settings.quota_limit));
        let monitor = Arc::new(PerformanceMonitor::new());
        let agent = Agent::from_settings(&settings, quota.clone(), monitor.clone()).await;

        let state = Self::from_parts(Arc::new(agent), quota, monitor, settings);
        state.restore_memory().await?;
        Ok(state)
    }

    pub fn from_parts(
        agent: Arc<Agent>,
        quota: Arc<QuotaTracker>,
        monitor: Arc<PerformanceMonitor>,
        settings: Settings,
    ) -> Self {
        Self {
            agent,
            quota,
            monitor,
            settings,
            start_time: Instant::now(),
        }
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        self.agent.memory()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    async fn restore_memory(&self) -> Result<()> {
        let Some(path) = &self.settings.memory_file else {
            return Ok(());
        };
        let restored = self
            .memory()
            .load_from(path)
            .await
            .with_context(|| format!("Failed to load conversations from {}", path.display()))?;
        info!(path = %path.display(), restored, "Restored conversations");
        Ok(())
    }

    /// Write conversations to the memory file, if one is configured
    pub async fn persist_memory(&self) {
        if let Err(e) = self.agent.save_memory(&self.settings).await {
            warn!("Failed to save conversations: {:#}", e);
        }
    }
}
