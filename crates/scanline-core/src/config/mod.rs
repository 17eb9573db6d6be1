//! Scanner configuration.
//!
//! A [`Config`] is always produced by [`resolve`]: the baseline defaults with
//! any number of override trees deep-merged on top, followed by
//! [`Config::normalize`]. Override trees are plain JSON values so callers can
//! pass partial configurations; keys this crate does not recognize are kept and
//! handed to the engine unchanged.
//!
//! An optional TOML file (`~/.config/scanline/config.toml` on Linux) supplies
//! user-level overrides for the CLI.

mod resolve;
mod types;

pub use resolve::{clamp_workers, merge, resolve};
pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Input stream settings
    pub input_stream: InputStreamConfig,

    /// Run the locator before decoding
    pub locate: bool,

    /// Requested worker count; always 0 after normalization
    pub num_of_workers: u32,

    /// Maximum frames processed per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,

    /// Debug mode requested by the caller
    pub debug: bool,

    /// Decoder settings
    pub decoder: DecoderConfig,

    /// Locator settings
    pub locator: LocatorConfig,

    /// Unrecognized top-level keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_stream: InputStreamConfig::default(),
            locate: true,
            num_of_workers: 0,
            frequency: None,
            debug: false,
            decoder: DecoderConfig::default(),
            locator: LocatorConfig::default(),
            extra: Map::new(),
        }
    }
}

impl Config {
    /// Load the defaults merged with the user config file, if one exists.
    pub fn load() -> Result<Self, ConfigError> {
        let overrides = load_overrides(&Self::default_path())?;
        resolve(&Self::default(), [&overrides])
    }

    /// Load the defaults merged with a specific TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let overrides = parse_toml(&content)?;
        resolve(&Self::default(), [&overrides])
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.scanline.scanline/config.toml
    /// - Linux: ~/.config/scanline/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\scanline\config\config.toml
    ///
    /// Falls back to ~/.scanline/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "scanline", "scanline")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".scanline").join("config.toml")
            })
    }

    /// Force post-merge invariants.
    ///
    /// Worker execution is disabled, so any requested worker count is
    /// clamped to zero.
    pub fn normalize(&mut self) {
        if self.num_of_workers > 0 {
            tracing::debug!(
                "numOfWorkers={} requested, worker execution is disabled; forcing 0",
                self.num_of_workers
            );
            self.num_of_workers = 0;
        }
    }

    /// Serialize into an override tree.
    pub fn to_value(&self) -> Result<Value, ConfigError> {
        serde_json::to_value(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Read the override tree stored at `path`.
///
/// A missing file yields an empty tree.
pub fn load_overrides(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_toml(&content)
}

fn parse_toml(content: &str) -> Result<Value, ConfigError> {
    let table: toml::Table = toml::from_str(content)?;
    serde_json::to_value(table).map_err(|e| ConfigError::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.num_of_workers, 0);
        assert!(config.locate);
        assert!(config.locator.half_sample);
        assert_eq!(config.input_stream.stream_type, InputStreamType::LiveStream);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[inputStream]"));
        assert!(toml.contains("numOfWorkers = 0"));
    }

    #[test]
    fn test_normalize_clamps_workers() {
        let mut config = Config {
            num_of_workers: 4,
            ..Config::default()
        };
        config.normalize();
        assert_eq!(config.num_of_workers, 0);
    }

    #[test]
    fn test_load_from_merges_file_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "numOfWorkers = 2\n\n[inputStream]\ntype = \"ImageStream\"\nsrc = \"shelf.png\"\n\n[locator]\nhalfSample = false"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.num_of_workers, 0);
        assert_eq!(config.input_stream.stream_type, InputStreamType::ImageStream);
        assert_eq!(config.input_stream.src.as_deref(), Some("shelf.png"));
        assert!(!config.locator.half_sample);
        // untouched defaults survive
        assert_eq!(config.locator.patch_size, "medium");
        assert_eq!(config.input_stream.constraints.height, 480);
    }

    #[test]
    fn test_load_overrides_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let value = load_overrides(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(value, Value::Object(Map::new()));
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "numOfWorkers = ").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
