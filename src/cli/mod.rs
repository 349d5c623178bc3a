//! # Command Line Interface
//!
//! `confresolve` merges YAML files in order, resolves placeholders against the process
//! environment, decrypts secrets and prints the result.

pub mod output;

use crate::loader::load_files;
use crate::resolver::Resolver;
use crate::tree::Env;
use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "confresolve")]
#[command(about = "Merge layered YAML configuration and resolve placeholders and secrets")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration files, lowest precedence first
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Environment file loaded before resolution (defaults to ./.env when present)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Run the CLI
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    initialise_logging(cli.verbose, cli.log_json)?;
    load_environment(cli.env_file.as_deref())?;

    let trees = load_files(&cli.files)?;
    let env: Env = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();
    info!(files = cli.files.len(), "Resolving configuration");

    let resolved = Resolver::new().resolve(&trees, &env).await?;
    output::print_tree(&resolved, cli.format)
}

fn initialise_logging(verbose: bool, json: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", default_level);
    }

    let builder = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if installed.is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
    Ok(())
}

fn load_environment(env_file: Option<&Path>) -> anyhow::Result<()> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load environment file {}", path.display()))?;
            debug!(path = %path.display(), "Loaded environment file");
        }
        None => {
            if let Err(e) = dotenvy::dotenv() {
                if !e.not_found() {
                    return Err(e).context("Failed to load .env file");
                }
            }
        }
    }
    Ok(())
}
