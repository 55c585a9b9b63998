//! Tool execution
//!
//! Resolves a `ToolCall` against the registry, runs it under a timeout, and
//! normalizes every outcome into a `ToolResult`. Nothing here fails: unknown
//! tools, bad arguments, upstream errors and timeouts all become error
//! content for the response model to read. A panicking tool is caught here
//! too, so a run always reaches its response phase.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;

use super::hooks::ToolObserver;
use crate::ai::types::ToolCall;
use crate::constants::tools::{DEFAULT_TOOL_TIMEOUT, MAX_TOOL_OUTPUT_CHARS};
use crate::tools::registry::{ToolError, ToolRegistry, ToolResult};
use crate::tools::truncation::truncate_head;

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    observers: Vec<Arc<dyn ToolObserver>>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
            observers: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ToolObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run one call. Always yields a result answering `call.id`.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let start = Instant::now();

        let result = match self.registry.lookup(&call.name) {
            Err(unknown) => ToolResult::error(call, unknown),
            Ok(tool) => {
                let invocation = AssertUnwindSafe(tool.invoke(call.arguments_value())).catch_unwind();
                let outcome = match tokio::time::timeout(self.timeout, invocation).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(panic)) => Err(ToolError::Upstream(format!(
                        "tool panicked: {}",
                        panic_message(panic.as_ref())
                    ))),
                    Err(_) => Err(ToolError::Timeout(self.timeout)),
                };

                match outcome {
                    Ok(output) => ToolResult::success(
                        call,
                        truncate_head(&output, MAX_TOOL_OUTPUT_CHARS).into_output(),
                    ),
                    Err(e) => ToolResult::error(call, format!("{} failed: {}", call.name, e)),
                }
            }
        };

        let duration = start.elapsed();
        for observer in &self.observers {
            observer.after_execute(call, &result, duration).await;
        }

        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
