//! Conversation types shared by the orchestrator and the model clients

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the tool-selection model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique within one assistant turn
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Arguments as a JSON object value
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}

/// Tool schema advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A single conversation message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant turn that requests tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Tool output answering the call with `tool_call_id`
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

/// Violations of the conversation's causal ordering
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("tool message has no tool_call_id")]
    MissingToolCallId,

    #[error("tool result '{0}' does not answer any pending tool call")]
    OrphanToolResult(String),

    #[error("tool result '{id}' names tool '{actual}' but the call was for '{expected}'")]
    ToolNameMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("tool call id '{0}' is used twice in one assistant turn")]
    DuplicateToolCallId(String),
}

/// Ordered message sequence
///
/// Every `tool` message must answer a tool call issued by an earlier
/// assistant message, and each call is answered at most once. Messages are
/// only ever appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    /// Issued call id -> tool name, until answered
    pending: HashMap<String, String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// `[system, user]`; neither message can reference a tool call
    pub fn from_prompt(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            pending: HashMap::new(),
        }
    }

    /// Append a message, rejecting tool results that answer nothing
    pub fn push(&mut self, message: ChatMessage) -> Result<(), ConversationError> {
        match message.role {
            Role::Tool => {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or(ConversationError::MissingToolCallId)?;
                let expected = self
                    .pending
                    .get(id)
                    .ok_or_else(|| ConversationError::OrphanToolResult(id.to_string()))?;
                if let Some(actual) = message.tool_name.as_deref() {
                    if actual != expected {
                        return Err(ConversationError::ToolNameMismatch {
                            id: id.to_string(),
                            expected: expected.clone(),
                            actual: actual.to_string(),
                        });
                    }
                }
                self.pending.remove(id);
            }
            Role::Assistant if !message.tool_calls.is_empty() => {
                let mut issued: HashMap<String, String> = HashMap::new();
                for call in &message.tool_calls {
                    if issued.insert(call.id.clone(), call.name.clone()).is_some() {
                        return Err(ConversationError::DuplicateToolCallId(call.id.clone()));
                    }
                }
                self.pending.extend(issued);
            }
            _ => {}
        }

        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Whether some issued tool call still lacks its result
    pub fn has_pending_tool_calls(&self) -> bool {
        !self.pending.is_empty()
    }
}
