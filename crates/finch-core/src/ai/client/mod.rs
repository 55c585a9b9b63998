//! Ollama model client
//!
//! - `core` - HTTP client, error mapping, model listing
//! - `tools` - non-streaming calls with tool schemas (tool selection)
//! - `streaming` - NDJSON streaming calls (responses)

pub mod config;
mod core;
mod streaming;
mod tools;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use self::config::{ModelOptions, OllamaConfig};
pub use self::core::OllamaClient;
use crate::ai::model::{
    AssistantTurn, ChatModel, ModelError, ModelInfo, ModelName, ModelProvider, ModelRole,
    StreamPart,
};
use crate::ai::types::{Conversation, ToolDefinition};

/// One named model on an Ollama server, with fixed generation options
pub struct OllamaChatModel {
    client: Arc<OllamaClient>,
    model: ModelName,
    options: ModelOptions,
}

impl OllamaChatModel {
    pub fn new(client: Arc<OllamaClient>, model: ModelName, options: ModelOptions) -> Self {
        Self {
            client,
            model,
            options,
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    fn name(&self) -> &str {
        self.model.as_str()
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
    ) -> Result<AssistantTurn, ModelError> {
        self.client
            .call_with_tools(self.model.as_str(), conversation, tools, &self.options)
            .await
    }

    async fn stream(
        &self,
        conversation: &Conversation,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>, ModelError> {
        self.client
            .call_streaming(self.model.as_str(), conversation, &self.options)
            .await
    }
}

/// Hands out `OllamaChatModel`s sharing one HTTP client
pub struct OllamaProvider {
    client: Arc<OllamaClient>,
}

impl OllamaProvider {
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn chat_model(&self, name: &ModelName, role: ModelRole) -> Arc<dyn ChatModel> {
        Arc::new(OllamaChatModel::new(
            self.client.clone(),
            name.clone(),
            ModelOptions::for_role(role),
        ))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
        self.client.list_models().await
    }
}
