//! Finch - financial analysis assistant
//!
//! - `finch chat` - interactive session in the terminal (default)
//! - `finch serve` - HTTP API server
//! - `finch tools` - list the available data tools

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use finch_core::{paths, FinanceTool, FinchConfig};

mod repl;
mod serve;

/// Finch - Financial Analysis Assistant
#[derive(Parser)]
#[command(name = "finch")]
#[command(about = "Ask questions about stocks, answered from live market data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat in the terminal
    ///
    /// A small model picks data tools for each question and a larger model
    /// writes the answer, streamed as it is generated. Earlier questions stay
    /// in context for the rest of the session.
    Chat {
        /// Model that selects tools (default from config)
        #[arg(long)]
        tool_model: Option<String>,
        /// Model that writes answers (default from config)
        #[arg(long)]
        chat_model: Option<String>,
    },

    /// Start the HTTP API server
    Serve {
        /// Port to listen on (default from config, 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the financial data tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = FinchConfig::load().context("Failed to load configuration")?;

    match cli.command {
        // Serve mode logs to stdout
        Some(Commands::Serve { port }) => serve::run(config, port).await,
        Some(Commands::Tools) => {
            for tool in FinanceTool::ALL {
                println!("{:<28} {}", tool.name(), tool.purpose());
            }
            Ok(())
        }
        Some(Commands::Chat {
            tool_model,
            chat_model,
        }) => {
            init_file_logging()?;
            repl::run(config, tool_model, chat_model).await
        }
        None => {
            init_file_logging()?;
            repl::run(config, None, None).await
        }
    }
}

/// Log to ~/.finch/logs/finch.log so output stays readable
fn init_file_logging() -> Result<()> {
    let log_dir = paths::logs_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let log_file = std::fs::File::create(log_dir.join("finch.log"))
        .context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}
