//! Non-streaming chat calls with tool schemas

use serde_json::Value;
use tracing::debug;

use super::config::ModelOptions;
use super::core::OllamaClient;
use crate::ai::model::{AssistantTurn, ModelError};
use crate::ai::parsers::ollama::{build_chat_body, parse_chat_response};
use crate::ai::types::{Conversation, ToolDefinition};

impl OllamaClient {
    /// One blocking `/api/chat` call. With `tools`, the model may answer
    /// with tool calls instead of text.
    pub async fn call_with_tools(
        &self,
        model: &str,
        conversation: &Conversation,
        tools: &[ToolDefinition],
        options: &ModelOptions,
    ) -> Result<AssistantTurn, ModelError> {
        let body = build_chat_body(model, conversation, tools, options, false);
        let timeout = self.config().request_timeout;

        let call = async {
            let response = self.post_chat(&body).await?;
            let value: Value = response.json().await?;
            parse_chat_response(&value)
        };

        let turn = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| ModelError::Timeout(timeout))??;

        debug!(
            model,
            tool_calls = turn.tool_calls.len(),
            content_len = turn.content.len(),
            "Ollama chat response"
        );
        Ok(turn)
    }
}
