//! Scanline CLI - drive the scanline facade from the command line.
//!
//! Scanline resolves a scanner configuration, runs one image (or a directory
//! of images) through the bundled still-image engine and prints the
//! `processed` result as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Decode a single image
//! scanline decode label.png --reader ean_reader
//!
//! # Decode the first frame of a directory sequence
//! scanline decode ./frames/ --sequence
//!
//! # View configuration
//! scanline config show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scanline_core::config::load_overrides;
use scanline_core::Config;
use serde_json::{Map, Value};

mod cli;
mod logging;

/// Scanline - barcode scanning session orchestration.
#[derive(Parser, Debug)]
#[command(name = "scanline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the platform default
    #[arg(short, long, global = true, env = "SCANLINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode one image and print the result
    Decode(cli::decode::DecodeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    // Logging isn't up yet, so config problems go straight to stderr.
    let tree = match load_overrides(&config_path) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default logging settings. Check the file at `scanline config path`."
            );
            Value::Object(Map::new())
        }
    };
    logging::init(&logging::LogSettings::from_tree(
        &tree,
        cli.verbose,
        cli.json_logs,
    ));

    tracing::debug!(
        "Scanline v{} (config: {})",
        scanline_core::VERSION,
        config_path.display()
    );

    match cli.command {
        Commands::Decode(args) => cli::decode::execute(args, &config_path).await,
        Commands::Config(args) => cli::config::execute(args, &config_path).await,
    }
}
