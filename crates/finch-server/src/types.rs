//! Request and response types for the API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use finch_core::ai::ModelInfo;

// ============================================================================
// Chat Types
// ============================================================================

/// Body of both chat endpoints
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Selector model; the configured default when absent
    #[serde(default)]
    pub tool_model: Option<String>,
    /// Responder model; the configured default when absent
    #[serde(default)]
    pub chat_model: Option<String>,
    pub prompt: String,
    /// Keeps prior turns under this id when given
    #[serde(default)]
    pub session_id: Option<String>,
}

// ============================================================================
// Tool Types
// ============================================================================

#[derive(Serialize)]
pub struct ToolResponse {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

// ============================================================================
// Model Types
// ============================================================================

#[derive(Serialize)]
pub struct ModelsListResponse {
    pub models: Vec<ModelInfo>,
    pub default_tool_model: String,
    pub default_chat_model: String,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
