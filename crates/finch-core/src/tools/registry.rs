//! Tool registry
//!
//! Built once through `ToolRegistryBuilder` and immutable afterwards, so it
//! can be shared across requests without locking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::ai::types::{ChatMessage, ToolCall, ToolDefinition};
use crate::config::ConfigError;

/// Why a tool invocation failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Upstream(String),

    #[error("timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        ToolError::Upstream(format!("{err:#}"))
    }
}

/// Lookup of a name the registry does not know
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct UnknownTool(pub String);

/// Normalized outcome of one tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(call: &ToolCall, msg: impl std::fmt::Display) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: msg.to_string(),
            is_error: true,
        }
    }

    /// The `tool` message answering the originating call
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::tool_result(self.tool_call_id, self.name, self.content)
    }
}

/// Parse tool arguments into a typed struct
pub fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Trait for tool implementations
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (id)
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Run the tool and return its text payload
    async fn invoke(&self, params: Value) -> Result<String, ToolError>;
}

/// Immutable name -> tool map
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Get a tool by name
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, UnknownTool> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownTool(name.to_string()))
    }

    /// Schemas for every tool, sorted by name so model requests are stable
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Freeze the registry; two tools with one name is a configuration error
    pub fn build(self) -> Result<ToolRegistry, ConfigError> {
        let mut tools = HashMap::with_capacity(self.tools.len());
        for tool in self.tools {
            let name = tool.name().to_string();
            if tools.contains_key(&name) {
                return Err(ConfigError::DuplicateTool(name));
            }
            tracing::debug!("Registered tool: {}", name);
            tools.insert(name, tool);
        }
        Ok(ToolRegistry { tools })
    }
}
