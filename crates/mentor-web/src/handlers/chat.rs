//! Chat API Handlers

use axum::{extract::State, response::Json};
use chrono::Utc;
use mentor_chat::ConversationAnalysis;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::DEFAULT_USER_ID;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub success: bool,
    pub timestamp: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

fn user_or_default(user_id: Option<String>) -> String {
    user_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
}

/// POST /api/chat
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let user_id = user_or_default(request.user_id);
    let success = !request.message.trim().is_empty();
    info!(user_id = %user_id, len = request.message.len(), "Chat request");

    let response = state.agent.process_message(&request.message, &user_id).await;
    if success {
        state.persist_memory().await;
    }

    Json(ChatResponse {
        response,
        success,
        timestamp: Utc::now().to_rfc3339(),
        user_id,
    })
}

/// POST /api/clear
pub async fn clear_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UserRequest>,
) -> Json<TextResponse> {
    let user_id = user_or_default(request.user_id);
    let response = state.agent.clear_conversation(&user_id).await;
    state.persist_memory().await;
    Json(TextResponse {
        response,
        success: Some(true),
    })
}

/// GET /api/help
pub async fn help_handler(State(state): State<Arc<AppState>>) -> Json<TextResponse> {
    Json(TextResponse {
        response: state.agent.help_message().await,
        success: None,
    })
}

/// POST /api/analyze
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UserRequest>,
) -> Json<ConversationAnalysis> {
    let user_id = user_or_default(request.user_id);
    Json(state.memory().analyze(&user_id).await)
}
