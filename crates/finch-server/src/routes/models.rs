//! Model listing endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::error::AppError;
use crate::types::ModelsListResponse;
use crate::AppState;

/// Build the models router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_models))
}

/// Models installed on the Ollama server
async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsListResponse>, AppError> {
    let models = state.models.list_models().await.map_err(|e| {
        tracing::warn!("Failed to list models: {}", e);
        AppError::BadGateway(e.to_string())
    })?;

    Ok(Json(ModelsListResponse {
        models,
        default_tool_model: state.config.default_tool_model.clone(),
        default_chat_model: state.config.default_chat_model.clone(),
    }))
}
