//! Reader selection and registration.
//!
//! Readers are registered by name in a [`ReaderRegistry`] shared by every
//! instance a [`Scanner`](crate::Scanner) creates. Which registered readers
//! actually run on a frame is decided per instance by a list of
//! [`ReaderSpec`]s, taken from `decoder.readers` or from `set_readers`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::image_wrapper::ImageWrapper;
use crate::types::CodeResult;

/// Names of the standard symbology readers.
pub const KNOWN_READERS: &[&str] = &[
    "code_128_reader",
    "ean_reader",
    "ean_8_reader",
    "code_39_reader",
    "code_39_vin_reader",
    "codabar_reader",
    "upc_reader",
    "upc_e_reader",
    "i2of5_reader",
    "2of5_reader",
    "code_93_reader",
    "code_32_reader",
];

/// A symbology reader.
///
/// Implementations receive the whole frame; localization, if any, is their
/// own business.
pub trait BarcodeReader: Send + Sync {
    /// Format name reported in decoded results (e.g. "code_128").
    fn format(&self) -> &str;

    /// Try to decode a symbol from the frame.
    fn decode(&self, frame: &ImageWrapper, options: &Value) -> Option<CodeResult>;
}

/// One entry of a reader selection list.
///
/// Deserializes from either a bare name (`"ean_reader"`) or a table with a
/// `format` and reader-specific `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawReaderSpec", into = "RawReaderSpec")]
pub struct ReaderSpec {
    /// Registered reader name
    pub format: String,

    /// Options passed to the reader on every decode
    pub config: Value,
}

impl ReaderSpec {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            config: Value::Null,
        }
    }

    pub fn with_config(format: impl Into<String>, config: Value) -> Self {
        Self {
            format: format.into(),
            config,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawReaderSpec {
    Name(String),
    Full {
        format: String,
        #[serde(default)]
        config: Value,
    },
}

impl From<RawReaderSpec> for ReaderSpec {
    fn from(raw: RawReaderSpec) -> Self {
        match raw {
            RawReaderSpec::Name(format) => Self::new(format),
            RawReaderSpec::Full { format, config } => Self { format, config },
        }
    }
}

impl From<ReaderSpec> for RawReaderSpec {
    fn from(spec: ReaderSpec) -> Self {
        if spec.config.is_null() {
            RawReaderSpec::Name(spec.format)
        } else {
            RawReaderSpec::Full {
                format: spec.format,
                config: spec.config,
            }
        }
    }
}

/// Name-to-reader table shared across instances.
#[derive(Default)]
pub struct ReaderRegistry {
    readers: RwLock<HashMap<String, Arc<dyn BarcodeReader>>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `reader` under `name`, replacing any previous registration.
    pub fn register(&self, name: &str, reader: Arc<dyn BarcodeReader>) {
        let mut readers = self.readers.write().unwrap_or_else(PoisonError::into_inner);
        if readers.insert(name.to_string(), reader).is_some() {
            tracing::debug!("Replaced reader registration for '{}'", name);
        } else {
            tracing::debug!("Registered reader '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BarcodeReader>> {
        self.readers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.readers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.readers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a selection list into runnable readers.
    ///
    /// Unregistered names are skipped with a warning.
    pub fn select(&self, specs: &[ReaderSpec]) -> Vec<(Arc<dyn BarcodeReader>, Value)> {
        let readers = self.readers.read().unwrap_or_else(PoisonError::into_inner);
        specs
            .iter()
            .filter_map(|spec| match readers.get(&spec.format) {
                Some(reader) => Some((reader.clone(), spec.config.clone())),
                None => {
                    tracing::warn!("No reader registered for '{}', skipping", spec.format);
                    None
                }
            })
            .collect()
    }
}

/// Check a `set_readers` argument.
pub fn validate_readers(readers: &[ReaderSpec]) -> Result<(), ValidationError> {
    if readers.is_empty() {
        return Err(ValidationError::NoReaders);
    }
    Ok(())
}

/// Check a `register_reader` argument pair.
pub fn validate_registration(
    name: &str,
    reader: Option<Arc<dyn BarcodeReader>>,
) -> Result<Arc<dyn BarcodeReader>, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingReaderName);
    }
    reader.ok_or_else(|| ValidationError::MissingReader(name.to_string()))
}
