mod config;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gateway::AppState;
use mcp::{Catalog, Server};
use runtime::{HostCommand, LocalToolHost, McpToolHost, OpenAiBackend, ToolHostClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;

#[derive(Parser)]
#[command(name = "toolbridge")]
#[command(about = "Bridge an LLM to an MCP tool host over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file (default: ./toolbridge.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP bridge service
    Serve,
    /// Run the tool host on stdin/stdout
    Host,
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs always go to stderr; the host's stdout carries protocol frames only.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Host) => cmd_host().await,
        Some(Commands::Serve) | None => {
            let config = Config::discover(cli.config.as_deref())?;
            cmd_serve(config).await
        }
    }
}

async fn cmd_host() -> Result<()> {
    let server = Server::new(Catalog::builtin());
    info!(tools = server.catalog().len(), "tool host ready on stdio");
    server.serve_stdio().await?;
    Ok(())
}

async fn cmd_serve(config: Config) -> Result<()> {
    let api_key = config
        .backend
        .resolve_api_key(std::env::var("OPENAI_API_KEY").ok());
    if api_key.is_none() {
        warn!("no OpenAI API key configured; chat requests will fail");
    }

    let mut builder = OpenAiBackend::builder(api_key, &config.backend.model)
        .api_base(&config.backend.api_base)
        .timeout(config.backend.timeout());
    if let Some(max_tokens) = config.backend.max_tokens {
        builder = builder.max_tokens(max_tokens);
    }
    let backend = builder.build()?;
    info!(%backend, "backend ready");

    if config.host.embedded {
        info!("serving tools in-process");
        return bridge(&config, backend, LocalToolHost::default()).await;
    }

    let command = match &config.host.command {
        Some(command) => HostCommand {
            command: command.clone(),
            args: config.host.args.clone(),
        },
        None => HostCommand {
            command: std::env::current_exe()?.to_string_lossy().into_owned(),
            args: vec!["host".to_string()],
        },
    };
    let host = McpToolHost::new(command).with_timeout(config.host.timeout());
    bridge(&config, backend, host).await
}

async fn bridge<H: ToolHostClient + 'static>(
    config: &Config,
    backend: OpenAiBackend,
    host: H,
) -> Result<()> {
    // Connect eagerly so the first request does not pay for the spawn.
    if let Err(e) = host.connect().await {
        warn!(error = %e, "tool host unavailable, will retry on first use");
    }

    let state = AppState::new(backend, host).with_system_prompt(config.server.system_prompt.as_str());
    gateway::serve(config.server.bind, state).await?;
    Ok(())
}
