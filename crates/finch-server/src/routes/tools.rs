//! Tool listing endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::types::ToolResponse;
use crate::AppState;

/// Build the tools router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_tools))
}

/// Schemas the selector model is offered
async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolResponse>> {
    let response = state
        .executor
        .registry()
        .definitions()
        .into_iter()
        .map(|t| ToolResponse {
            name: t.name,
            description: t.description,
            parameters: t.parameters,
        })
        .collect();

    Json(response)
}
