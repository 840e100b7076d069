//! Usage statistics

use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

/// GET /api/stats
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let quota = state.quota.status().await;
    let performance = state.monitor.snapshot().await;
    let memory = state.memory().usage().await;
    let registry = state.agent.registry().stats().await;

    Json(json!({
        "quota": quota,
        "performance": {
            "total_requests": performance.total_requests,
            "average_request_ms": performance.average_request_ms(),
            "cache_hit_rate": performance.cache_hit_rate(),
            "tools": performance.tools,
            "apis": performance.apis,
        },
        "memory": memory,
        "registry": registry,
        "llm_resets": state.agent.reset_count(),
        "uptime_secs": state.uptime_secs(),
    }))
}
