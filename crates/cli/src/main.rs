//! Nexus CLI
//!
//! Main entry point for the nexus command-line tool.
//! Answers questions over the internal document corpus and manages its index.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, IndexCommand};
use nexus_core::{config::AppConfig, logging};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

/// Nexus - persona-aware answers from internal documentation
#[derive(Parser, Debug)]
#[command(name = "nexus")]
#[command(about = "Persona-aware answers from internal documentation", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "NEXUS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "NEXUS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama, gemini)
    #[arg(short, long, global = true, env = "NEXUS_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "NEXUS_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question against the internal documents
    Ask(AskCommand),

    /// Manage the persisted index
    Index(IndexCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Index(cmd) => cmd.name(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load_from(cli.workspace, cli.config)
        .context("Failed to load configuration")?
        .with_overrides(
            cli.provider,
            cli.model,
            cli.log_level,
            cli.verbose,
            cli.no_color,
        );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Documents: {:?}", config.documents_dir());
    tracing::debug!(
        "Generation: {}/{}",
        config.generation.provider,
        config.generation.model
    );

    let command_name = cli.command.name();
    let span = tracing::info_span!("command", name = command_name);

    let result = async {
        match cli.command {
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Index(cmd) => cmd.execute(&config).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) => tracing::debug!("Command failed: {}", e),
    }

    result.with_context(|| format!("nexus {} failed", command_name))
}
