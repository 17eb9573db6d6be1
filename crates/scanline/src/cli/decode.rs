//! The `scanline decode` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use scanline_core::config::{load_overrides, merge};
use scanline_core::{FrameEngine, FrameEngineOptions, ReaderRegistry, RuntimeEnv, Scanner};
use serde_json::{json, Value};

/// Arguments for the `decode` command.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Image file, or a directory of frames with --sequence
    #[arg(required = true)]
    pub input: PathBuf,

    /// Reader to enable (repeatable); defaults to the configured readers
    #[arg(short, long = "reader")]
    pub readers: Vec<String>,

    /// Treat the input as a directory of frames
    #[arg(long)]
    pub sequence: bool,

    /// Downscale frames so the longer side is at most N pixels
    #[arg(long)]
    pub size: Option<u32>,

    /// Run the locator on a half-resolution frame
    #[arg(long)]
    pub half_sample: bool,

    /// Give up after this many milliseconds
    #[arg(long, env = "SCANLINE_TIMEOUT_MS", default_value = "5000")]
    pub timeout_ms: u64,

    /// Development mode: decode in-process with debug enabled
    #[arg(long)]
    pub dev: bool,

    /// Pretty-print the result JSON
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the decode command, merging the flags over the config file at `config_path`.
pub async fn execute(args: DecodeArgs, config_path: &Path) -> anyhow::Result<()> {
    let request = load_request(&args, config_path)?;
    tracing::debug!("Decode request: {}", request);

    let env = RuntimeEnv {
        development: args.dev || RuntimeEnv::from_env().development,
    };
    let options = FrameEngineOptions {
        decode_timeout_ms: args.timeout_ms,
        ..FrameEngineOptions::default()
    };
    let registry = Arc::new(ReaderRegistry::new());
    let scanner = Scanner::with_env(FrameEngine::factory(registry, options), env);

    let result = tokio::time::timeout(
        Duration::from_millis(args.timeout_ms),
        scanner.decode_single(&request, None),
    )
    .await
    .map_err(|_| {
        anyhow::anyhow!(
            "Timed out after {}ms decoding {}",
            args.timeout_ms,
            args.input.display()
        )
    })??;

    match &result.code_result {
        Some(code) => tracing::info!("Decoded {} ({})", code.code, code.format),
        None => tracing::info!("No barcode found in {}", args.input.display()),
    }

    let output = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", output);

    Ok(())
}

fn load_request(args: &DecodeArgs, config_path: &Path) -> anyhow::Result<Value> {
    let file = load_overrides(config_path)
        .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
    Ok(build_request(args, &file))
}

/// Merge the command-line flags over the config file overrides.
fn build_request(args: &DecodeArgs, file: &Value) -> Value {
    let src = args.input.to_string_lossy();
    let mut flags = json!({
        "src": src,
        "inputStream": {
            "src": src,
            "sequence": args.sequence,
        },
    });
    if let Some(size) = args.size {
        flags["inputStream"]["size"] = json!(size);
    }
    if args.half_sample {
        flags["locator"] = json!({ "halfSample": true });
    }
    if !args.readers.is_empty() {
        flags["decoder"] = json!({ "readers": args.readers });
    }
    if args.dev {
        flags["debug"] = json!(true);
    }

    let mut request = file.clone();
    merge(&mut request, &flags);
    request
}
