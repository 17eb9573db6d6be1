//! Error types for the scanline orchestration layer.
//!
//! Errors are grouped by where they originate: configuration resolution,
//! lifecycle transitions, and the decoding-engine collaborator. Argument
//! validation problems are modeled separately as [`ValidationError`]; those are
//! reported as diagnostics and never propagated to the caller.

use std::path::PathBuf;
use thiserror::Error;

use crate::events::Topic;
use crate::instance::LifecycleState;

/// Top-level error type for scanline operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid lifecycle transition
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Failure reported by the decoding engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pending single-shot decode was discarded before a frame was processed
    #[error("Decode interrupted before a frame was processed")]
    Interrupted,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A recognized key holds a value of the wrong shape
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by lifecycle transitions on an instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// `init` was called while a previous `init` on the same instance is pending
    #[error("init already in progress on instance {instance}")]
    InitInProgress { instance: u64 },

    /// The operation needs an initialized instance
    #[error("instance {instance} is {state:?}, expected an initialized instance")]
    NotReady {
        instance: u64,
        state: LifecycleState,
    },
}

/// Errors reported by a decoding engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The input stream could not be opened
    #[error("Input stream error: {message}")]
    InputStream { message: String },

    /// A frame could not be decoded into an image buffer
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// The requested input is not supported by this engine
    #[error("Unsupported input: {0}")]
    Unsupported(String),

    /// Loading a frame took too long
    #[error("Timeout loading {path} after {timeout_ms}ms")]
    Timeout { path: PathBuf, timeout_ms: u64 },
}

/// Soft argument-validation failures.
///
/// These are logged and the offending call becomes a no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no callback supplied for '{0}' subscription, ignoring")]
    MissingCallback(Topic),

    #[error("set_readers called with no readers, ignoring")]
    NoReaders,

    #[error("register_reader called with no name, ignoring")]
    MissingReaderName,

    #[error("register_reader called with no reader for '{0}', ignoring")]
    MissingReader(String),
}

/// Convenience type alias for scanline results.
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_wraps_into_scan_error() {
        let err: ScanError = ConfigError::Invalid("numOfWorkers: expected u32".into()).into();
        assert!(err.to_string().contains("numOfWorkers"));
    }

    #[test]
    fn test_validation_error_names_topic() {
        let err = ValidationError::MissingCallback(Topic::Detected);
        assert!(err.to_string().contains("detected"));
    }
}
