//! Finch core library
//!
//! Two-phase tool orchestration for a financial-data chat assistant: a small
//! model picks tools, the tools run, and a larger model writes the answer.

pub mod agent;
pub mod ai;
pub mod config;
pub mod constants;
pub mod finance;
pub mod paths;
pub mod storage;
pub mod tools;

pub use agent::{
    LoopEvent, OrchestrationResult, Orchestrator, OrchestratorError, OrchestratorServices,
    StreamEmitter, ToolExecutor,
};
pub use ai::types::{ChatMessage, Conversation, Role, ToolCall, ToolDefinition};
pub use config::{ConfigError, FinchConfig};
pub use storage::{SessionError, SessionGuard, SessionStore};
pub use tools::{FinanceTool, Tool, ToolError, ToolRegistry};
