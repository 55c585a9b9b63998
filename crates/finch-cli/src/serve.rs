//! `finch serve` - HTTP API server

use anyhow::Result;

use finch_core::FinchConfig;
use finch_server::ServerConfig;

/// Run the serve command.
pub async fn run(config: FinchConfig, port: Option<u16>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut server_config = ServerConfig::from(config);
    if let Some(port) = port {
        server_config.port = port;
    }
    print_banner(&server_config);

    let server = finch_server::start_server(server_config);

    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => {
            println!("\n  Shutting down...");
        }
    }

    Ok(())
}

fn print_banner(config: &ServerConfig) {
    println!();
    println!("  \x1b[1;36mFinch\x1b[0m server starting");
    println!("  ─────────────────────────────────────");
    println!("  Local:  http://localhost:{}", config.port);
    println!("  Ollama: {}", config.finch.ollama_host);
    println!();
}
