//! Router construction

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the complete router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::chat_handler))
        .route("/clear", post(handlers::chat::clear_handler))
        .route("/help", get(handlers::chat::help_handler))
        .route("/analyze", post(handlers::chat::analyze_handler))
        .route("/tools", get(handlers::tools::list_tools_handler))
        .route("/stats", get(handlers::status::stats_handler));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
