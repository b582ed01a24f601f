//! Dirbridge - LDAP directory integration
//!
//! Previews and syncs directory users into local-user records and verifies
//! passwords by re-binding as the matched entry.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use dirbridge_core::DirectoryConfig;
use dirbridge_directory::DirectoryService;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirbridge")]
#[command(author = "Dirbridge Team")]
#[command(version = dirbridge_core::VERSION)]
#[command(about = "LDAP directory preview, sync and authentication", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML, or a JSON settings payload ending in .json)
    #[arg(short, long, global = true, env = "DIRBRIDGE_CONFIG")]
    config: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DIRBRIDGE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and reconcile directory users without committing anything
    Preview,

    /// Compute the changes a sync would apply to the local user population
    Sync {
        /// Path to a JSON file listing existing local users ({"email": ..., "active": ...})
        #[arg(long)]
        existing: Option<String>,
    },

    /// Verify a username and password against the directory
    Authenticate {
        /// Username matched against the user RDN attribute
        #[arg(short, long)]
        username: String,

        /// Password to verify
        #[arg(short, long, env = "DIRBRIDGE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Validate the configuration and optionally bind the service account
    CheckConfig {
        /// Also dial the server and bind the service account
        #[arg(long)]
        connect: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.log_json);

    let config = load_config(cli.config.as_deref())?;
    debug!(url = %config.url(), encryption = config.encryption.as_str(), "Configuration loaded");

    let ctx = CommandContext {
        config,
        service: DirectoryService::ldap(),
        output_format: cli.output,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Preview => commands::preview::execute(&ctx).await,
        Commands::Sync { existing } => commands::sync::execute(&ctx, existing.as_deref()).await,
        Commands::Authenticate { username, password } => {
            commands::authenticate::execute(&ctx, &username, &password).await
        }
        Commands::CheckConfig { connect } => commands::check_config::execute(&ctx, connect).await,
    }
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output; logs go to stderr
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

/// Load from a file when given, otherwise from the environment alone.
/// `DIRBRIDGE_*` variables override file values and validation runs last,
/// so the environment may supply fields the file leaves blank.
fn load_config(path: Option<&str>) -> Result<DirectoryConfig> {
    let mut config = match path {
        Some(path) if path.ends_with(".json") => {
            let payload = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings payload {}", path))?;
            DirectoryConfig::parse_json(&payload)?
        }
        Some(path) => DirectoryConfig::read_file(path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => return DirectoryConfig::from_env().context("Failed to load configuration from environment"),
    };

    config.apply_env()?;
    Ok(config.finish()?)
}
