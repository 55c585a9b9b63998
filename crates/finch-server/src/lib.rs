//! Finch Server
//!
//! HTTP API for the financial assistant: blocking and streamed chat, tool and
//! model listings. This is a library crate; the server is started via
//! `start_server()`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use finch_core::agent::{LoggingObserver, ToolExecutor};
use finch_core::ai::client::{OllamaClient, OllamaConfig, OllamaProvider};
use finch_core::ai::ModelProvider;
use finch_core::finance::yahoo::YahooFinance;
use finch_core::tools::finance_registry;
use finch_core::{FinchConfig, SessionStore, ToolRegistry};

pub mod error;
pub mod routes;
pub mod types;

use types::HealthResponse;

/// Configuration for starting the server.
pub struct ServerConfig {
    /// Port to listen on (default: 8000).
    pub port: u16,
    pub finch: FinchConfig,
}

impl From<FinchConfig> for ServerConfig {
    fn from(finch: FinchConfig) -> Self {
        Self {
            port: finch.port,
            finch,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FinchConfig>,
    /// Registry plus timeout and logging, shared by every run
    pub executor: Arc<ToolExecutor>,
    pub models: Arc<dyn ModelProvider>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: FinchConfig, registry: ToolRegistry, models: Arc<dyn ModelProvider>) -> Self {
        let executor = ToolExecutor::new(Arc::new(registry))
            .with_timeout(config.tool_timeout())
            .with_observer(Arc::new(LoggingObserver::new()));

        Self {
            config: Arc::new(config),
            executor: Arc::new(executor),
            models,
            sessions: Arc::new(SessionStore::new()),
        }
    }

    /// Production wiring: Yahoo Finance tools and an Ollama model server
    pub fn from_config(config: FinchConfig) -> anyhow::Result<Self> {
        let market = YahooFinance::new().context("Failed to create market data client")?;
        let registry = finance_registry(Arc::new(market))?;
        let client = OllamaClient::new(OllamaConfig::from_finch_config(&config))?;

        tracing::info!(
            tools = registry.len(),
            ollama = %config.ollama_host,
            "Initialized tool registry and model client"
        );
        Ok(Self::new(config, registry, Arc::new(OllamaProvider::new(client))))
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health))
        .nest("/agent/trading", routes::api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &FinchConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.cors_allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Start the Finch server and block until shutdown.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let state = AppState::from_config(config.finch)?;
    let app = build_router(state);

    tracing::info!("Finch server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use finch_core::ai::{
        AssistantTurn, ChatModel, ModelError, ModelInfo, ModelName, ModelRole, StreamPart,
    };
    use finch_core::{Conversation, Role, Tool, ToolCall, ToolDefinition, ToolError};
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    /// Scripted stand-in for an Ollama server
    #[derive(Clone, Default)]
    struct FakeProvider {
        tool_calls: Vec<ToolCall>,
        fail: bool,
        /// Conversation lengths seen by responders
        seen: Arc<Mutex<Vec<usize>>>,
    }

    struct FakeModel {
        role: ModelRole,
        provider: FakeProvider,
    }

    impl FakeModel {
        fn answer(&self, conversation: &Conversation) -> String {
            self.provider.seen.lock().unwrap().push(conversation.len());
            let outputs: Vec<&str> = conversation
                .messages()
                .iter()
                .filter(|m| m.role == Role::Tool)
                .map(|m| m.content.as_str())
                .collect();
            format!("From the data: {}", outputs.join(", "))
        }
    }

    #[async_trait]
    impl ChatModel for FakeModel {
        fn name(&self) -> &str {
            "fake"
        }

        async fn complete(
            &self,
            conversation: &Conversation,
            _tools: &[ToolDefinition],
        ) -> Result<AssistantTurn, ModelError> {
            if self.provider.fail {
                return Err(ModelError::Transport("connection refused".into()));
            }
            match self.role {
                ModelRole::ToolSelection if self.provider.tool_calls.is_empty() => {
                    Ok(AssistantTurn::text("Hello! Which stock?"))
                }
                ModelRole::ToolSelection => Ok(AssistantTurn {
                    content: String::new(),
                    tool_calls: self.provider.tool_calls.clone(),
                }),
                ModelRole::Response => Ok(AssistantTurn::text(self.answer(conversation))),
            }
        }

        async fn stream(
            &self,
            conversation: &Conversation,
        ) -> Result<mpsc::UnboundedReceiver<StreamPart>, ModelError> {
            let (tx, rx) = mpsc::unbounded_channel();
            let _ = tx.send(StreamPart::TextDelta {
                delta: self.answer(conversation),
            });
            let _ = tx.send(StreamPart::Finish { reason: None });
            Ok(rx)
        }
    }

    #[async_trait]
    impl ModelProvider for FakeProvider {
        fn chat_model(&self, _name: &ModelName, role: ModelRole) -> Arc<dyn ChatModel> {
            Arc::new(FakeModel {
                role,
                provider: self.clone(),
            })
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, ModelError> {
            Ok(vec![ModelInfo {
                name: "granite4:350m".into(),
                size: Some(366_000_000),
                family: Some("granite".into()),
                parameter_size: None,
            }])
        }
    }

    struct MetricsTool;

    #[async_trait]
    impl Tool for MetricsTool {
        fn name(&self) -> &str {
            "get_key_financial_metrics"
        }

        fn description(&self) -> &str {
            "Key metrics"
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object", "properties": { "ticker": { "type": "string" } } })
        }

        async fn invoke(&self, _params: Value) -> Result<String, ToolError> {
            Ok("{\"currentPrice\": 182.55}".into())
        }
    }

    fn metrics_call() -> ToolCall {
        let mut args = Map::new();
        args.insert("ticker".into(), json!("NVDA"));
        ToolCall::new("call_0", "get_key_financial_metrics", args)
    }

    fn state(provider: FakeProvider) -> AppState {
        let registry = ToolRegistry::builder()
            .register(Arc::new(MetricsTool))
            .build()
            .unwrap();
        AppState::new(FinchConfig::default(), registry, Arc::new(provider))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn nvda_request() -> Value {
        json!({
            "tool_model": "granite4:350m",
            "chat_model": "granite4:1b",
            "prompt": "What is the current price of NVDA?"
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = build_router(state(FakeProvider::default()));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn blocking_chat_returns_answer_and_ledger() {
        let provider = FakeProvider {
            tool_calls: vec![metrics_call()],
            ..Default::default()
        };
        let app = build_router(state(provider));

        let response = app
            .oneshot(post("/agent/trading/chat", nvda_request()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(body["response"].as_str().unwrap().contains("182.55"));
        assert_eq!(
            body["tool_calls"],
            json!([{ "name": "get_key_financial_metrics", "args": { "ticker": "NVDA" } }])
        );
    }

    #[tokio::test]
    async fn streaming_chat_emits_data_lines() {
        let provider = FakeProvider {
            tool_calls: vec![metrics_call()],
            ..Default::default()
        };
        let app = build_router(state(provider));

        let response = app
            .oneshot(post("/agent/trading/chat/stream", nvda_request()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let body = body_string(response).await;
        let events: Vec<Value> = body
            .split("\n\n")
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| serde_json::from_str(chunk.strip_prefix("data: ").unwrap()).unwrap())
            .collect();

        assert_eq!(
            events[0],
            json!({ "type": "tool", "name": "get_key_financial_metrics", "args": { "ticker": "NVDA" } })
        );
        assert_eq!(events[1]["type"], "text");
        assert!(events[1]["content"].as_str().unwrap().contains("182.55"));
        assert_eq!(events.last().unwrap(), &json!({ "type": "done" }));
    }

    #[tokio::test]
    async fn invalid_model_is_bad_request() {
        let app = build_router(state(FakeProvider::default()));
        let response = app
            .oneshot(post(
                "/agent/trading/chat",
                json!({ "tool_model": "", "chat_model": "granite4:1b", "prompt": "hi" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn omitted_models_use_defaults() {
        let app = build_router(state(FakeProvider::default()));
        let response = app
            .oneshot(post("/agent/trading/chat", json!({ "prompt": "hi" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["response"], "Hello! Which stock?");
        assert_eq!(body["tool_calls"], json!([]));
    }

    #[tokio::test]
    async fn model_failure_is_bad_gateway() {
        let provider = FakeProvider {
            fail: true,
            ..Default::default()
        };
        let app = build_router(state(provider));

        let response = app
            .oneshot(post("/agent/trading/chat", nvda_request()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn busy_session_is_conflict() {
        let state = state(FakeProvider::default());
        let _held = state.sessions.acquire("desk-1").unwrap();
        let app = build_router(state.clone());

        let mut request = nvda_request();
        request["session_id"] = json!("desk-1");
        let response = app
            .oneshot(post("/agent/trading/chat", request))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn session_history_carries_over() {
        let provider = FakeProvider {
            tool_calls: vec![metrics_call()],
            ..Default::default()
        };
        let seen = provider.seen.clone();
        let state = state(provider);

        let mut request = nvda_request();
        request["session_id"] = json!("desk-2");
        for _ in 0..2 {
            let response = build_router(state.clone())
                .oneshot(post("/agent/trading/chat", request.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        // [system, user, assistant, tool], then two more history messages
        assert_eq!(seen.lock().unwrap().as_slice(), &[4, 6]);
    }

    #[tokio::test]
    async fn lists_tools_and_models() {
        let app = build_router(state(FakeProvider::default()));

        let response = app
            .clone()
            .oneshot(Request::get("/agent/trading/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let tools: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(tools[0]["name"], "get_key_financial_metrics");
        assert_eq!(tools[0]["parameters"]["type"], "object");

        let response = app
            .oneshot(Request::get("/agent/trading/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let models: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(models["models"][0]["name"], "granite4:350m");
        assert_eq!(models["default_tool_model"], "granite4:350m");
    }
}
