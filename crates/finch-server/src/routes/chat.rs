//! Chat endpoints: blocking JSON and streamed `data:` lines.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use finch_core::agent::session;
use finch_core::agent::{StreamingRun, SYSTEM_PROMPT};
use finch_core::ai::{ModelName, ModelRole};
use finch_core::{
    Conversation, OrchestrationResult, Orchestrator, OrchestratorServices, SessionGuard,
    StreamEmitter,
};

use crate::error::AppError;
use crate::types::ChatRequest;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(chat))
        .route("/stream", post(chat_stream))
}

/// Everything a run needs, resolved before any model is called
struct ChatRun {
    orchestrator: Orchestrator,
    conversation: Conversation,
    session: Option<SessionGuard>,
    prompt: String,
}

fn prepare_run(state: &AppState, req: ChatRequest) -> Result<ChatRun, AppError> {
    let tool_model = resolve_model(req.tool_model.as_deref(), &state.config.default_tool_model)?;
    let chat_model = resolve_model(req.chat_model.as_deref(), &state.config.default_chat_model)?;

    if req.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("prompt must not be empty".to_string()));
    }

    let session = req
        .session_id
        .as_deref()
        .map(|id| state.sessions.acquire(id))
        .transpose()?;

    let conversation = match &session {
        Some(guard) => session::build_with_history(&SYSTEM_PROMPT, guard.history(), &req.prompt)?,
        None => session::build(&SYSTEM_PROMPT, &req.prompt),
    };

    let orchestrator = Orchestrator::new(OrchestratorServices {
        selector: state.models.chat_model(&tool_model, ModelRole::ToolSelection),
        responder: state.models.chat_model(&chat_model, ModelRole::Response),
        executor: state.executor.clone(),
    });

    info!(
        tool_model = %tool_model,
        chat_model = %chat_model,
        session_id = session.as_ref().map(|s| s.id()).unwrap_or("-"),
        "Starting chat run"
    );

    Ok(ChatRun {
        orchestrator,
        conversation,
        session,
        prompt: req.prompt,
    })
}

fn resolve_model(requested: Option<&str>, default: &str) -> Result<ModelName, AppError> {
    Ok(ModelName::parse(requested.unwrap_or(default))?)
}

/// Run to completion and answer with the full result
async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<OrchestrationResult>, AppError> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %run_id);

    async move {
        let run = prepare_run(&state, req)?;
        let result = run.orchestrator.run(run.conversation).await?;

        if let Some(guard) = run.session {
            guard.commit(&run.prompt, &result.response);
        }
        info!(tool_calls = result.tool_calls.len(), "Chat run finished");
        Ok::<_, AppError>(Json(result))
    }
    .instrument(span)
    .await
}

/// Stream `data: <json>\n\n` lines as the run progresses.
///
/// The response body owns a drop guard on the run's cancellation token, so a
/// client disconnect stops the run.
async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("chat_stream", %run_id);
    let _entered = span.enter();

    let run = prepare_run(&state, req)?;
    let cancel = CancellationToken::new();
    let StreamingRun { events, handle } = run
        .orchestrator
        .run_streaming(run.conversation, cancel.clone());

    let session = run.session;
    let prompt = run.prompt;
    tokio::spawn(
        async move {
            match handle.await {
                Ok(Ok(result)) => {
                    if let Some(guard) = session {
                        guard.commit(&prompt, &result.response);
                    }
                    info!(tool_calls = result.tool_calls.len(), "Streaming run finished");
                }
                Ok(Err(e)) => debug!("Streaming run ended without an answer: {}", e),
                Err(e) => error!("Streaming run task failed: {}", e),
            }
        }
        .instrument(span.clone()),
    );

    let guard = cancel.drop_guard();
    let body = ReceiverStream::new(events).map(move |event| {
        let _cancel_on_drop = &guard;
        Ok::<_, Infallible>(StreamEmitter::emit(&event))
    });

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}
