//! Logging setup for the CLI.
//!
//! Settings come from the `[logging]` section of the config file, with the
//! `--verbose` and `--json-logs` flags layered on top. `RUST_LOG`, when set,
//! replaces the computed filter entirely. Output always goes to stderr so
//! stdout carries only decode results.

use serde_json::Value;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl LogSettings {
    /// Read `logging.level` / `logging.format` from a config override tree.
    ///
    /// `verbose` raises the level to at least debug; `json` forces JSON output.
    /// Unknown levels fall back to info.
    pub fn from_tree(tree: &Value, verbose: bool, json: bool) -> Self {
        let section = tree.get("logging");
        let configured = section
            .and_then(|s| s.get("level"))
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
            .filter(|level| LEVELS.contains(&level.as_str()))
            .unwrap_or_else(|| "info".to_string());
        let level = if verbose && configured != "trace" {
            "debug".to_string()
        } else {
            configured
        };
        let json = json
            || section
                .and_then(|s| s.get("format"))
                .and_then(Value::as_str)
                .is_some_and(|format| format.eq_ignore_ascii_case("json"));

        Self { level, json }
    }

    /// Filter directives scoping the level to this project's crates.
    pub fn directives(&self) -> String {
        format!("warn,scanline={0},scanline_core={0}", self.level)
    }
}

/// Install the global subscriber.
pub fn init(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.directives()));

    if settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_without_section() {
        let settings = LogSettings::from_tree(&json!({}), false, false);
        assert_eq!(settings.level, "info");
        assert!(!settings.json);
        assert_eq!(
            settings.directives(),
            "warn,scanline=info,scanline_core=info"
        );
    }

    #[test]
    fn test_section_is_read() {
        let tree = json!({ "logging": { "level": "WARN", "format": "json" } });
        let settings = LogSettings::from_tree(&tree, false, false);
        assert_eq!(settings.level, "warn");
        assert!(settings.json);
    }

    #[test]
    fn test_flags_override_section() {
        let tree = json!({ "logging": { "level": "error", "format": "pretty" } });
        let settings = LogSettings::from_tree(&tree, true, true);
        assert_eq!(settings.level, "debug");
        assert!(settings.json);

        let tree = json!({ "logging": { "level": "trace" } });
        assert_eq!(LogSettings::from_tree(&tree, true, false).level, "trace");
    }

    #[test]
    fn test_unknown_level_falls_back() {
        let tree = json!({ "logging": { "level": "chatty" } });
        assert_eq!(LogSettings::from_tree(&tree, false, false).level, "info");
    }
}
