//! Two-phase orchestrator.
//!
//! One run per prompt:
//!
//! ```text
//!  SelectingTools ──► ExecutingTools ──► Responding ──► Done
//!        │                                   ▲
//!        └──── no tool calls ────────────────┘ (selector text is final)
//! ```
//!
//! The small selector model sees the registry schemas and either answers
//! directly or asks for tools. Requested tools run in order, each result is
//! appended as a `tool` message, and the responder model writes the answer
//! from the augmented conversation. There is a single selection round.
//!
//! `run()` returns the whole result; `run_streaming()` emits `LoopEvent`s
//! over a bounded channel. Both share the selection and execution phases,
//! so their outcomes match.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ai::model::{ChatModel, ModelError, StreamPart};
use crate::ai::types::{ChatMessage, Conversation, ConversationError, ToolCall};
use crate::constants::server::EVENT_CHANNEL_BUFFER;

use super::executor::ToolExecutor;
use super::loop_events::LoopEvent;

/// Orchestration state, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SelectingTools,
    ExecutingTools,
    Responding,
    Done,
}

/// Ledger entry for one invoked tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    pub args: Value,
}

/// Final answer plus the tools used to produce it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationResult {
    pub response: String,
    pub tool_calls: Vec<ToolInvocation>,
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("conversation invariant violated: {0}")]
    Conversation(#[from] ConversationError),

    #[error("run cancelled")]
    Cancelled,
}

/// Shared services a run needs.
pub struct OrchestratorServices {
    /// Picks tools; called once with the registry schemas
    pub selector: Arc<dyn ChatModel>,
    /// Writes the answer after tools ran
    pub responder: Arc<dyn ChatModel>,
    pub executor: Arc<ToolExecutor>,
}

/// Handle to a streaming run
pub struct StreamingRun {
    pub events: mpsc::Receiver<LoopEvent>,
    /// Resolves when the run ends, after `Done` was emitted
    pub handle: JoinHandle<Result<OrchestrationResult, OrchestratorError>>,
}

/// Conversation after selection and execution
struct Prepared {
    conversation: Conversation,
    ledger: Vec<ToolInvocation>,
    /// Selector text when it asked for no tools
    direct_answer: Option<String>,
}

pub struct Orchestrator {
    services: OrchestratorServices,
}

impl Orchestrator {
    pub fn new(services: OrchestratorServices) -> Self {
        Self { services }
    }

    /// Blocking run: the full answer or the first model error.
    pub async fn run(
        &self,
        conversation: Conversation,
    ) -> Result<OrchestrationResult, OrchestratorError> {
        let prepared = self.select_and_execute(conversation, None).await?;

        let response = match prepared.direct_answer {
            Some(text) => text,
            None => {
                debug!(phase = ?Phase::Responding, model = self.services.responder.name());
                self.services
                    .responder
                    .complete(&prepared.conversation, &[])
                    .await?
                    .content
            }
        };

        debug!(phase = ?Phase::Done, tool_calls = prepared.ledger.len());
        Ok(OrchestrationResult {
            response,
            tool_calls: prepared.ledger,
        })
    }

    /// Streaming run on a spawned task.
    ///
    /// Emits one `Tool` per invoked tool, then `Text` fragments, then exactly
    /// one `Done`. Errors are folded into a `Text` event before `Done`.
    /// Dropping the receiver or cancelling `cancel` stops the run: no further
    /// tools are invoked and the model stream is dropped.
    pub fn run_streaming(self, conversation: Conversation, cancel: CancellationToken) -> StreamingRun {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);

        let handle = tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
                result = self.stream_inner(conversation, &tx) => result,
            };

            match &result {
                Ok(_) => {}
                Err(OrchestratorError::Cancelled) => debug!("Streaming run cancelled"),
                Err(e) => {
                    warn!("Streaming run failed: {}", e);
                    let _ = tx
                        .send(LoopEvent::Text {
                            content: format!("Error: {e}"),
                        })
                        .await;
                }
            }
            let _ = tx.send(LoopEvent::Done).await;
            result
        });

        StreamingRun { events: rx, handle }
    }

    async fn stream_inner(
        &self,
        conversation: Conversation,
        tx: &mpsc::Sender<LoopEvent>,
    ) -> Result<OrchestrationResult, OrchestratorError> {
        let prepared = self.select_and_execute(conversation, Some(tx)).await?;

        let response = match prepared.direct_answer {
            Some(text) => {
                if !text.is_empty() {
                    emit(tx, LoopEvent::Text {
                        content: text.clone(),
                    })
                    .await?;
                }
                text
            }
            None => {
                debug!(phase = ?Phase::Responding, model = self.services.responder.name());
                let mut parts = self.services.responder.stream(&prepared.conversation).await?;
                let mut response = String::new();

                while let Some(part) = parts.recv().await {
                    match part {
                        StreamPart::TextDelta { delta } => {
                            if delta.is_empty() {
                                continue;
                            }
                            response.push_str(&delta);
                            emit(tx, LoopEvent::Text { content: delta }).await?;
                        }
                        StreamPart::Finish { reason } => {
                            debug!(?reason, "Responder stream finished");
                            break;
                        }
                        StreamPart::Error { error } => {
                            return Err(ModelError::Stream(error).into());
                        }
                    }
                }
                response
            }
        };

        debug!(phase = ?Phase::Done, tool_calls = prepared.ledger.len());
        Ok(OrchestrationResult {
            response,
            tool_calls: prepared.ledger,
        })
    }

    /// SelectingTools and ExecutingTools, shared by both variants
    async fn select_and_execute(
        &self,
        mut conversation: Conversation,
        events: Option<&mpsc::Sender<LoopEvent>>,
    ) -> Result<Prepared, OrchestratorError> {
        let selector = &self.services.selector;
        let tools = self.services.executor.registry().definitions();
        debug!(
            phase = ?Phase::SelectingTools,
            model = selector.name(),
            tools = tools.len()
        );

        let turn = selector.complete(&conversation, &tools).await?;
        if turn.tool_calls.is_empty() {
            info!("Selector requested no tools, answering directly");
            return Ok(Prepared {
                conversation,
                ledger: Vec::new(),
                direct_answer: Some(turn.content),
            });
        }

        let calls = with_unique_ids(turn.tool_calls);
        conversation.push(ChatMessage::assistant_with_tools(
            turn.content,
            calls.clone(),
        ))?;

        debug!(phase = ?Phase::ExecutingTools, count = calls.len());
        let mut ledger = Vec::with_capacity(calls.len());
        for call in &calls {
            if let Some(tx) = events {
                emit(tx, LoopEvent::Tool {
                    name: call.name.clone(),
                    args: call.arguments_value(),
                })
                .await?;
            }

            let result = self.services.executor.execute(call).await;
            conversation.push(result.into_message())?;
            ledger.push(ToolInvocation {
                name: call.name.clone(),
                args: call.arguments_value(),
            });
        }

        Ok(Prepared {
            conversation,
            ledger,
            direct_answer: None,
        })
    }
}

/// A closed channel means the consumer went away
async fn emit(tx: &mpsc::Sender<LoopEvent>, event: LoopEvent) -> Result<(), OrchestratorError> {
    tx.send(event)
        .await
        .map_err(|_| OrchestratorError::Cancelled)
}

/// Models occasionally repeat ids; fall back to positional ids then
fn with_unique_ids(mut calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = HashSet::new();
    if calls.iter().all(|c| seen.insert(c.id.clone())) {
        return calls;
    }
    for (index, call) in calls.iter_mut().enumerate() {
        call.id = format!("call_{index}");
    }
    calls
}
