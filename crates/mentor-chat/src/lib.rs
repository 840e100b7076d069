//! Conversation layer for the mentor assistant
//!
//! # Modules
//!
//! - `agent`: the message orchestrator and its dispatch order
//! - `memory`: bounded per-user conversation log and its analysis
//! - `responses`: fixed reply texts and response formatting
//! - `workflow`: template and model-planned multi-step workflows

pub mod agent;
pub mod memory;
pub mod responses;
pub mod workflow;

pub use agent::{Agent, AgentConfig};
pub use memory::{
    Conversation, ConversationAnalysis, ConversationMemory, ConversationMessage, ConversationStats,
    MemoryConfig, MemoryUsage, Role,
};
pub use workflow::{
    WorkflowExecutor, WorkflowPlan, WorkflowPlanner, WorkflowResult, WorkflowStep, WorkflowTemplate,
};
