//! mentor-web: HTTP front door for the mentor assistant
//!
//! ## Routes
//!
//! ```text
//! GET  /health        - Health check
//! POST /api/chat      - Process one message
//! POST /api/clear     - Forget a user's conversation
//! GET  /api/help      - Feature overview
//! POST /api/analyze   - Conversation analysis as JSON
//! GET  /api/tools     - Registered tools in priority order
//! GET  /api/stats     - Quota, performance and memory usage
//! ```

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

/// Bind address for the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: mentor_core::config::DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
