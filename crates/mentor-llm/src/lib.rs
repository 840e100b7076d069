//! mentor-llm: Language Model Integration
//!
//! ## Supported Providers & Endpoints
//!
//! | Provider | Base URL | Auth Method |
//! |----------|----------|-------------|
//! | Gemini | `https://generativelanguage.googleapis.com/v1beta` | `?key={API_KEY}` |
//!
//! ## Environment Variables
//!
//! ```bash
//! GEMINI_API_KEY=xxx                  # Google Gemini (GOOGLE_API_KEY also accepted)
//! GEMINI_MODEL=gemini-1.5-flash-latest
//! ```
//!
//! The [`ChatManager`] owns the live provider handle and can rebuild it on
//! demand, which the orchestrator uses for its periodic self-reset.

pub mod chat;
pub mod gemini;
pub mod provider;
pub mod scripted;

pub use chat::{ChatManager, ProviderFactory};
pub use gemini::GeminiClient;
pub use provider::{
    is_quota_error, BoxedProvider, ChatMessage, ChatResponse, LlmProvider, ProviderType, TokenUsage,
};
pub use scripted::ScriptedProvider;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::chat::ChatManager;
    pub use super::gemini::GeminiClient;
    pub use super::provider::{ChatMessage, ChatResponse, LlmProvider, ProviderType};
}
