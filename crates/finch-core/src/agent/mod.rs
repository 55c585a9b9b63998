//! Agent layer for finch
//!
//! ## Orchestrator
//! - `Orchestrator` - Two-phase run: tool selection, execution, response
//! - `LoopEvent` - Event protocol between a streaming run and its consumer
//! - `StreamEmitter` - Wire form of `LoopEvent`s
//!
//! ## Tools
//! - `ToolExecutor` - Runs calls against the registry, never fails
//! - `ToolObserver` / `LoggingObserver` - Post-execution hooks
//!
//! ## Sessions
//! - `session` - Seed conversations with the system prompt

pub mod emitter;
pub mod executor;
pub mod hooks;
pub mod loop_events;
pub mod orchestrator;
pub mod session;

pub use emitter::StreamEmitter;
pub use executor::ToolExecutor;
pub use hooks::{LoggingObserver, ToolObserver};
pub use loop_events::LoopEvent;
pub use orchestrator::{
    OrchestrationResult, Orchestrator, OrchestratorError, OrchestratorServices, Phase,
    StreamingRun, ToolInvocation,
};
pub use session::SYSTEM_PROMPT;
