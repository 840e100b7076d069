//! Core types and utilities for the mentor assistant
//!
//! # Modules
//!
//! - `config`: Environment loading and the `Settings` snapshot
//! - `error`: Error types and Result alias
//! - `performance`: Per-tool and per-request timing metrics
//! - `quota`: Daily language-model request budget

pub mod config;
pub mod error;
pub mod performance;
pub mod quota;

// Re-exports
pub use config::Settings;
pub use error::Error;
pub use performance::{PerformanceMonitor, PerformanceSnapshot, ToolMetrics};
pub use quota::{QuotaStatus, QuotaTracker};
