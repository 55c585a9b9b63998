//! Model abstraction used by the orchestrator
//!
//! The orchestrator only sees `ChatModel`; the Ollama client is one
//! implementation and tests script their own.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::ai::types::{Conversation, ToolCall, ToolDefinition};
use crate::config::ConfigError;

static MODEL_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:/-]*$").expect("valid model name regex"));

/// Validated model identifier (e.g. `granite4:350m`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ModelName(String);

impl ModelName {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || !MODEL_NAME_PATTERN.is_match(trimmed) {
            return Err(ConfigError::InvalidModel(name.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side of the pipeline a model serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Small model that decides which tools to call
    ToolSelection,
    /// Larger model that writes the final answer
    Response,
}

/// A complete (non-streamed) assistant turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantTurn {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// Incremental output of a streamed model call
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    TextDelta { delta: String },
    Finish { reason: Option<String> },
    Error { error: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Transport(String),

    #[error("model server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed model output: {0}")]
    Malformed(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model stream failed: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::Transport(err.to_string())
    }
}

/// A chat model the orchestrator can call
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logging
    fn name(&self) -> &str;

    /// One blocking call; `tools` may be empty
    async fn complete(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<AssistantTurn, ModelError>;

    /// Streamed call without tools. Dropping the receiver aborts the request.
    async fn stream(
        &self,
        conversation: &Conversation,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>, ModelError>;
}

/// A locally available model
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_size: Option<String>,
}

/// Builds models by name and lists what is available
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn chat_model(&self, name: &ModelName, role: ModelRole) -> Arc<dyn ChatModel>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ollama_style_names() {
        for name in ["granite4:350m", "llama3.1:8b", "library/qwen2.5:7b-instruct", "phi4"] {
            assert!(ModelName::parse(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_empty_or_spaced_names() {
        for name in ["", "   ", "granite 4", ":latest", "a;b"] {
            assert!(
                matches!(ModelName::parse(name), Err(ConfigError::InvalidModel(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(ModelName::parse(" phi4 ").unwrap().as_str(), "phi4");
    }
}
