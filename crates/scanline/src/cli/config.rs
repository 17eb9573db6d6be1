//! The `scanline config` command.
//!
//! Every subcommand works on the file named by the global `--config` flag,
//! which defaults to [`Config::default_path`].

use std::path::Path;

use clap::{Args, Subcommand};
use scanline_core::config::{load_overrides, resolve};
use scanline_core::Config;

/// Logging section appended to a freshly initialized file. Read by the CLI
/// only; the scanner passes it through untouched.
const LOGGING_TEMPLATE: &str = r#"
[logging]
# error, warn, info, debug or trace
level = "info"
# "pretty" or "json"
format = "pretty"
"#;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the resolved configuration (defaults plus config file)
    Show {
        /// Print as a JSON override tree instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Show config file path
    Path,

    /// Write a config file holding the defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command against the file at `path`.
pub async fn execute(args: ConfigArgs, path: &Path) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show { json } => {
            let config = load_config(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config.to_value()?)?);
            } else {
                println!("{}", config.to_toml()?);
            }
        }
        ConfigCommand::Path => println!("{}", path.display()),
        ConfigCommand::Init { force } => {
            write_defaults(path, force)?;
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// Defaults with the file at `path` merged on top. A missing file means defaults.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    let overrides = load_overrides(path)?;
    Ok(resolve(&Config::default(), [&overrides])?)
}

fn write_defaults(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut contents = Config::default().to_toml()?;
    contents.push_str(LOGGING_TEMPLATE);
    std::fs::write(path, contents)?;

    tracing::info!("Config file created at: {}", path.display());
    Ok(())
}
