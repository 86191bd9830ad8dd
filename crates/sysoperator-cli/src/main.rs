//! # sysoperator-cli
//!
//! Command-line interface for SysOperator.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sysoperator_core::Config;
use sysoperator_tools::{Dispatcher, ToolRegistry};

mod commands;

/// Application context containing shared state.
pub struct AppContext {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub dispatcher: Arc<Dispatcher>,
}

/// SysOperator - infrastructure tools over the Model Context Protocol
#[derive(Parser)]
#[command(name = "sysoperator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the user and project files
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tools over stdio (the default)
    Serve,
    /// List available tools
    Tools {
        /// Print the full catalogue as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a single tool call and print its result
    Call {
        /// Tool name
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(short, long, value_name = "JSON")]
        args: Option<String>,
    },
    /// Check for the executables and credentials tools depend on
    Doctor,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Validate the configuration
    Validate,
}

fn init_logging(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(level)
        }
    });

    // stdout carries protocol traffic.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(cli.verbose, &config.general.log_level);

    let registry = ToolRegistry::with_builtins().context("Failed to register tools")?;
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), &config));
    let ctx = AppContext {
        config,
        config_path: cli.config,
        dispatcher,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::run(&ctx).await?,
        Commands::Tools { json } => commands::tools::run(&ctx, json)?,
        Commands::Call { tool, args } => commands::call::run(&ctx, &tool, args.as_deref()).await?,
        Commands::Doctor => commands::doctor::run(&ctx).await?,
        Commands::Config { action } => commands::config::handle(action, &ctx)?,
    }

    Ok(())
}
