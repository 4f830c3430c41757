//! promptline CLI: the main entry point.
//!
//! Commands:
//! - `serve`     Start the HTTP chat gateway
//! - `profiles`  List the profiles the gateway would start with
//! - `screen`    Run a prompt file through length bounds and the security screen
//! - `config`    Show, validate, locate or initialise configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "promptline",
    about = "promptline: profile-aware chat gateway",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml (default: ~/.promptline/config.toml)
    #[arg(short, long, global = true, env = "PROMPTLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// List available behavior profiles
    Profiles {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Screen a prompt file before registering it
    Screen {
        /// File containing the prompt text (`-` reads stdin)
        file: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Load and validate the configuration
    Validate,
    /// Print the default config file path
    Path,
    /// Write a default config file if none exists
    Init,
}

/// Filter directive: `RUST_LOG`, then `LOG_LEVEL`, then the verbosity flag.
fn log_filter(verbose: bool) -> tracing_subscriber::EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(config_path, port, host).await?,
        Commands::Profiles { json } => commands::profiles::run(config_path, json)?,
        Commands::Screen { file } => commands::screen::run(&file)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Init => commands::config_cmd::init()?,
        },
    }

    Ok(())
}
