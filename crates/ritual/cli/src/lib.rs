//! Ritual CLI
//!
//! Terminal front end for the ritual engine:
//! - List and inspect the registered rituals
//! - Validate ritual definition files
//! - Walk a full session on a synthetic clock and print its journal

#![deny(unsafe_code)]

pub mod commands;
pub mod config;
pub mod error;
pub mod output;

use clap::{Parser, Subcommand};
use commands::walk::WalkOptions;
use config::CliConfig;
use error::CliResult;
use ritual_engine::SessionCoordinator;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Alias used by `walk` when neither `--alias` nor the config names one
pub const FALLBACK_ALIAS: &str = "witness";

/// Ritual CLI application
#[derive(Parser, Debug)]
#[command(name = "ritual")]
#[command(about = "Ritual session engine CLI", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RITUAL_CONFIG")]
    pub config: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered rituals
    List,

    /// Show the steps of a ritual
    Show {
        /// Ritual slug or id
        slug: String,
    },

    /// Validate a ritual definition file (TOML)
    Validate {
        file: PathBuf,
    },

    /// Walk a full session of a ritual
    Walk {
        /// Ritual slug or id
        slug: String,

        /// Witness alias
        #[arg(short, long)]
        alias: Option<String>,

        /// Length of the recorded silence, in seconds
        #[arg(long)]
        silence_secs: Option<u32>,

        /// Presence rating (0-5); submits a survey when given
        #[arg(short, long)]
        rating: Option<u8>,

        /// Survey notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Mark the recording as containing detected silence
        #[arg(long)]
        silence_detected: bool,
    },

    /// Show the effective configuration
    Config,
}

/// Parse process arguments and run
pub fn run() -> CliResult<()> {
    run_with_args(std::env::args_os())
}

/// Parse the given arguments and run
pub fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_tracing(cli.verbose);

    let config = CliConfig::load(cli.config.as_deref())?;
    let format = cli.output;

    match cli.command {
        Commands::List => commands::ritual::list(&build_coordinator(&config)?, format),
        Commands::Show { slug } => {
            commands::ritual::show(&build_coordinator(&config)?, &slug, format)
        }
        Commands::Validate { file } => commands::ritual::validate(&file),
        Commands::Walk {
            slug,
            alias,
            silence_secs,
            rating,
            notes,
            silence_detected,
        } => {
            let alias = alias
                .or_else(|| config.default_alias.clone())
                .unwrap_or_else(|| FALLBACK_ALIAS.to_string());
            let options = WalkOptions {
                alias,
                silence_secs,
                rating,
                notes,
                silence_detected,
            };
            let mut coordinator = build_coordinator(&config)?;
            commands::walk::execute(&mut coordinator, &slug, options, format)
        }
        Commands::Config => output::print_single(&config, format),
    }
}

/// Coordinator with the built-in catalog plus the configured rituals dir
fn build_coordinator(config: &CliConfig) -> CliResult<SessionCoordinator> {
    let mut coordinator = SessionCoordinator::bootstrap(config.engine.clone())?;
    if let Some(dir) = &config.rituals_dir {
        coordinator.load_rituals_from_dir(dir)?;
    }
    Ok(coordinator)
}

/// Logs go to stderr so structured output on stdout stays parseable
fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    // a subscriber may already be installed when embedded
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
