//! flatdeploy CLI - flatten a package's runtime dependencies into one directory

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use flatdeploy_core::config::CONFIG_FILE_NAME;
use miette::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;

/// flatdeploy - deploy runtime dependencies into a single directory
#[derive(Debug, Parser)]
#[command(name = "flatdeploy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file describing the package and its dependency graph
    #[arg(short = 'C', long, global = true, default_value = CONFIG_FILE_NAME)]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Merge every dependency's install root into the target root
    Deploy(commands::deploy::DeployArgs),

    /// Show the order in which dependencies would be merged
    Order,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG takes precedence over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Deploy(args) => commands::deploy::run(&cli.config, args),
        Commands::Order => commands::order::run(&cli.config),
    }
}
