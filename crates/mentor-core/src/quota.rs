//! Daily language-model request budget
//!
//! The tracker is constructed once and shared by `Arc`; every LLM call site
//! checks `can_make_request()` first and records successful calls afterwards.
//! The counter resets automatically when the UTC date changes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Snapshot of quota usage
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub date: NaiveDate,
    pub requests_made: u32,
    pub quota_limit: u32,
    pub remaining: u32,
    pub quota_exceeded: bool,
    pub last_request: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct QuotaState {
    date: NaiveDate,
    requests_made: u32,
    exceeded: bool,
    last_request: Option<DateTime<Utc>>,
}

impl QuotaState {
    fn fresh(date: NaiveDate) -> Self {
        Self {
            date,
            requests_made: 0,
            exceeded: false,
            last_request: None,
        }
    }
}

/// Tracks requests against a daily limit
#[derive(Debug)]
pub struct QuotaTracker {
    limit: u32,
    state: RwLock<QuotaState>,
}

impl QuotaTracker {
    /// Create a tracker with the given daily limit
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            state: RwLock::new(QuotaState::fresh(Utc::now().date_naive())),
        }
    }

    /// Daily limit
    pub fn limit(&self) -> u32 {
        self.limit
    }

    async fn roll_over(&self, today: NaiveDate) {
        let mut state = self.state.write().await;
        if state.date != today {
            info!(previous = %state.date, "Resetting language model quota for new day");
            *state = QuotaState::fresh(today);
        }
    }

    /// Whether another request fits in today's budget
    pub async fn can_make_request(&self) -> bool {
        self.can_make_request_on(Utc::now().date_naive()).await
    }

    async fn can_make_request_on(&self, today: NaiveDate) -> bool {
        self.roll_over(today).await;
        !self.state.read().await.exceeded
    }

    /// Record one successful request
    pub async fn record_request(&self) {
        self.roll_over(Utc::now().date_naive()).await;
        let mut state = self.state.write().await;
        state.requests_made += 1;
        state.last_request = Some(Utc::now());
        if state.requests_made >= self.limit && !state.exceeded {
            state.exceeded = true;
            warn!(
                used = state.requests_made,
                limit = self.limit,
                "Language model quota exhausted"
            );
        }
    }

    /// Mark the quota exhausted after the provider reported it
    pub async fn mark_exceeded(&self) {
        let mut state = self.state.write().await;
        if !state.exceeded {
            warn!("Provider reported quota exhaustion");
        }
        state.exceeded = true;
    }

    /// Manually reset the counter
    pub async fn reset(&self) {
        *self.state.write().await = QuotaState::fresh(Utc::now().date_naive());
    }

    /// Current usage snapshot
    pub async fn status(&self) -> QuotaStatus {
        self.roll_over(Utc::now().date_naive()).await;
        let state = self.state.read().await;
        QuotaStatus {
            date: state.date,
            requests_made: state.requests_made,
            quota_limit: self.limit,
            remaining: self.limit.saturating_sub(state.requests_made),
            quota_exceeded: state.exceeded,
            last_request: state.last_request,
        }
    }

    /// User-facing usage report
    pub async fn usage_message(&self) -> String {
        let status = self.status().await;

        if status.quota_exceeded {
            return format!(
                "⚠️ **API Quota Exceeded**\n\n\
                 📊 **Usage:** {}/{} requests\n\
                 🕐 **Date:** {}\n\
                 🔄 **Reset:** Tomorrow at midnight UTC\n\n\
                 💡 **Note:** Tool-based queries (weather, dictionary, search) still work!",
                status.requests_made, status.quota_limit, status.date
            );
        }

        let level = match status.remaining {
            0..=5 => "🔴 Critical",
            6..=15 => "🟡 Warning",
            _ => "🟢 Good",
        };

        format!(
            "📊 **API Usage Status: {}**\n\n\
             📈 **Used:** {}/{} requests\n\
             📉 **Remaining:** {} requests\n\
             🕐 **Date:** {}",
            level, status.requests_made, status.quota_limit, status.remaining, status.date
        )
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_QUOTA_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exhausts_at_limit() {
        let quota = QuotaTracker::new(2);
        assert!(quota.can_make_request().await);

        quota.record_request().await;
        assert!(quota.can_make_request().await);

        quota.record_request().await;
        assert!(!quota.can_make_request().await);

        let status = quota.status().await;
        assert_eq!(status.requests_made, 2);
        assert_eq!(status.remaining, 0);
        assert!(quota.usage_message().await.contains("Quota Exceeded"));
    }

    #[tokio::test]
    async fn test_new_day_resets() {
        let quota = QuotaTracker::new(1);
        quota.record_request().await;
        assert!(!quota.can_make_request().await);

        let tomorrow = Utc::now().date_naive().succ_opt().unwrap();
        assert!(quota.can_make_request_on(tomorrow).await);
        assert_eq!(quota.status_raw().await, 0);
    }

    #[tokio::test]
    async fn test_mark_exceeded_and_reset() {
        let quota = QuotaTracker::new(10);
        quota.mark_exceeded().await;
        assert!(!quota.can_make_request().await);

        quota.reset().await;
        assert!(quota.can_make_request().await);
        assert!(quota.usage_message().await.contains("🟡 Warning"));
    }

    impl QuotaTracker {
        async fn status_raw(&self) -> u32 {
            self.state.read().await.requests_made
        }
    }
}
