//! Tool API Handlers

use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

/// GET /api/tools - registered tools, highest priority first
pub async fn list_tools_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut tools = state.agent.registry().summaries().await;
    tools.sort_by_key(|t| t.priority);

    Json(json!({
        "count": tools.len(),
        "tools": tools,
    }))
}
