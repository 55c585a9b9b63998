//! Event protocol for streamed runs.
//!
//! `LoopEvent` is everything a streaming run emits. Transport layers (HTTP
//! body, CLI) consume these and render them; `StreamEmitter` gives the wire
//! form.

use serde::Serialize;
use serde_json::Value;

/// Events emitted by a streaming orchestration.
///
/// Per run: every `Tool` precedes every `Text`, and exactly one `Done`
/// comes last.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoopEvent {
    /// A tool was invoked with these arguments.
    Tool { name: String, args: Value },

    /// A fragment of the answer (or a folded-in error message).
    Text { content: String },

    /// The run is over.
    Done,
}

impl LoopEvent {
    pub fn is_done(&self) -> bool {
        matches!(self, LoopEvent::Done)
    }
}
