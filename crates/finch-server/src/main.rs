//! Finch Server binary

use anyhow::Context;

use finch_core::FinchConfig;
use finch_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = FinchConfig::load().context("Failed to load configuration")?;
    start_server(ServerConfig::from(config)).await
}
