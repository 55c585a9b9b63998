//! Tool execution observers
//!
//! Observers see every tool call after it ran: the call, its normalized
//! result and how long it took. They cannot change the result.
//!
//! ## Built-in Observers
//! - `LoggingObserver` - logs each execution with timing

use std::time::Duration;

use async_trait::async_trait;

use crate::ai::types::ToolCall;
use crate::tools::registry::ToolResult;

/// Called after each tool execution
#[async_trait]
pub trait ToolObserver: Send + Sync {
    async fn after_execute(&self, call: &ToolCall, result: &ToolResult, duration: Duration);
}

/// Logs all tool executions
pub struct LoggingObserver;

impl LoggingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolObserver for LoggingObserver {
    async fn after_execute(&self, call: &ToolCall, result: &ToolResult, duration: Duration) {
        if result.is_error {
            tracing::warn!(
                tool = %call.name,
                call_id = %call.id,
                elapsed_ms = duration.as_millis() as u64,
                error = %result.content,
                "Tool execution failed"
            );
        } else {
            tracing::info!(
                tool = %call.name,
                call_id = %call.id,
                elapsed_ms = duration.as_millis() as u64,
                output_len = result.content.len(),
                "Tool execution completed"
            );
        }
    }
}
