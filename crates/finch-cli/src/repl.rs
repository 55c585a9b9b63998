//! Interactive chat loop
//!
//! Reads one question per line, streams the answer to stdout, and keeps the
//! conversation in a local session. Ctrl-C stops the current answer; an empty
//! stdin or `exit` ends the session.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use finch_core::agent::{session, LoggingObserver, StreamingRun, SYSTEM_PROMPT};
use finch_core::ai::client::{OllamaClient, OllamaConfig, OllamaProvider};
use finch_core::ai::{ModelName, ModelProvider, ModelRole};
use finch_core::finance::YahooFinance;
use finch_core::tools::finance_registry;
use finch_core::{
    FinchConfig, LoopEvent, Orchestrator, OrchestratorServices, SessionStore, ToolExecutor,
};

const GREETING: &str = "Hi! I am your financial analysis assistant. How can I help you today?";
const FOLLOW_UP: &str = "Do you have any other questions?";
const SESSION_ID: &str = "repl";

pub async fn run(
    config: FinchConfig,
    tool_model: Option<String>,
    chat_model: Option<String>,
) -> Result<()> {
    let tool_model = ModelName::parse(tool_model.as_deref().unwrap_or(&config.default_tool_model))?;
    let chat_model = ModelName::parse(chat_model.as_deref().unwrap_or(&config.default_chat_model))?;

    let market = YahooFinance::new().context("Failed to create market data client")?;
    let registry = finance_registry(Arc::new(market))?;
    let executor = Arc::new(
        ToolExecutor::new(Arc::new(registry))
            .with_timeout(config.tool_timeout())
            .with_observer(Arc::new(LoggingObserver::new())),
    );
    let provider = OllamaProvider::new(OllamaClient::new(OllamaConfig::from_finch_config(&config))?);
    let sessions = SessionStore::new();

    tracing::info!(%tool_model, %chat_model, "Starting chat session");
    println!("{GREETING}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if matches!(prompt, "exit" | "quit") {
            break;
        }

        let guard = sessions.acquire(SESSION_ID)?;
        let conversation = session::build_with_history(&SYSTEM_PROMPT, guard.history(), prompt)?;
        let orchestrator = Orchestrator::new(OrchestratorServices {
            selector: provider.chat_model(&tool_model, ModelRole::ToolSelection),
            responder: provider.chat_model(&chat_model, ModelRole::Response),
            executor: executor.clone(),
        });

        let cancel = CancellationToken::new();
        let StreamingRun { mut events, handle } =
            orchestrator.run_streaming(conversation, cancel.clone());
        render(&mut events, &cancel).await?;

        match handle.await? {
            Ok(result) => guard.commit(prompt, &result.response),
            Err(e) => tracing::warn!("Run ended without an answer: {}", e),
        }
        println!("\n{FOLLOW_UP}");
    }

    Ok(())
}

/// Print events until `Done`; Ctrl-C cancels the run
async fn render(
    events: &mut tokio::sync::mpsc::Receiver<LoopEvent>,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(LoopEvent::Tool { name, args }) => {
                    println!("\x1b[2m[{name}] {args}\x1b[0m");
                }
                Some(LoopEvent::Text { content }) => {
                    print!("{content}");
                    stdout.flush()?;
                }
                Some(LoopEvent::Done) | None => break,
            },
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                cancel.cancel();
            }
        }
    }
    println!();
    Ok(())
}
