//! Tool layer for the mentor assistant
//!
//! Provides:
//! - `ToolKind`: the closed set of capabilities and their selection priority
//! - `Tool` trait and `FnTool` for closure-backed tools
//! - `ToolRegistry`: registration, keyword matching, priority selection, execution
//! - `TtlCache`: LRU cache with per-entry expiry used by the adapters
//! - `adapters`: weather, search, dictionary, sheets, email, lyrics and vision

pub mod adapters;
pub mod builtin;
pub mod cache;
pub mod kind;
pub mod registry;
pub mod tool;

pub use builtin::{builtin_tools, register_builtin_tools};
pub use cache::{CacheStats, TtlCache};
pub use kind::ToolKind;
pub use registry::{RegistryStats, ToolRegistry, ToolSummary};
pub use tool::{BoxedTool, FnTool, OutputStatus, Tool, ToolOptions, ToolOutput};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::kind::ToolKind;
    pub use crate::registry::ToolRegistry;
    pub use crate::tool::{BoxedTool, Tool, ToolOptions, ToolOutput};
}
