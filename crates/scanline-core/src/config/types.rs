//! Sub-configuration structs with the scanner's baseline defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::ReaderSpec;

/// Kind of input feeding the processing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputStreamType {
    /// One or more still images
    ImageStream,
    /// A pre-recorded video
    VideoStream,
    /// A live camera feed
    LiveStream,
}

/// Input stream settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputStreamConfig {
    /// Display name of the stream
    pub name: String,

    /// Source kind
    #[serde(rename = "type")]
    pub stream_type: InputStreamType,

    /// Treat `src` as a sequence of frames rather than a single image
    pub sequence: bool,

    /// Longest side, in pixels, frames are scaled down to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    /// Path or URL of the source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    /// Capture constraints for camera sources
    pub constraints: Constraints,

    /// Region of the frame to scan
    pub area: Area,

    /// Only use the first channel of color frames
    pub single_channel: bool,
}

impl Default for InputStreamConfig {
    fn default() -> Self {
        Self {
            name: "Live".to_string(),
            stream_type: InputStreamType::LiveStream,
            sequence: false,
            size: None,
            src: None,
            constraints: Constraints::default(),
            area: Area::default(),
            single_channel: false,
        }
    }
}

/// Camera capture constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Constraints {
    pub width: u32,
    pub height: u32,
    pub facing_mode: String,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            facing_mode: "environment".to_string(),
        }
    }
}

/// Scan area as CSS-style percentage offsets from each edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Area {
    pub top: String,
    pub right: String,
    pub left: String,
    pub bottom: String,
}

impl Default for Area {
    fn default() -> Self {
        Self {
            top: "0%".to_string(),
            right: "0%".to_string(),
            left: "0%".to_string(),
            bottom: "0%".to_string(),
        }
    }
}

/// Decoder settings.
///
/// Only `readers` is read by this crate; every other key is carried through
/// untouched for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Readers to run on each frame, in order
    pub readers: Vec<ReaderSpec>,

    /// Engine-specific options
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            readers: vec![ReaderSpec::new("code_128_reader")],
            options: Map::new(),
        }
    }
}

/// Locator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocatorConfig {
    /// Halve the frame before localization
    pub half_sample: bool,

    /// Patch size preset ("x-small" through "x-large")
    pub patch_size: String,

    /// Engine-specific options
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            half_sample: true,
            patch_size: "medium".to_string(),
            options: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_stream_defaults() {
        let config = InputStreamConfig::default();
        assert_eq!(config.stream_type, InputStreamType::LiveStream);
        assert!(!config.sequence);
        assert_eq!(config.constraints.width, 640);
        assert_eq!(config.area.top, "0%");
    }

    #[test]
    fn test_input_stream_type_key_is_renamed() {
        let value = serde_json::to_value(InputStreamConfig::default()).unwrap();
        assert_eq!(value["type"], "LiveStream");
        assert!(value.get("singleChannel").is_some());
        assert!(value.get("src").is_none());
    }

    #[test]
    fn test_decoder_keeps_unknown_options() {
        let decoder: DecoderConfig = serde_json::from_value(serde_json::json!({
            "readers": ["ean_reader"],
            "multiple": true
        }))
        .unwrap();
        assert_eq!(decoder.readers, vec![ReaderSpec::new("ean_reader")]);
        assert_eq!(decoder.options["multiple"], true);
    }

    #[test]
    fn test_locator_defaults() {
        let locator = LocatorConfig::default();
        assert!(locator.half_sample);
        assert_eq!(locator.patch_size, "medium");
    }
}
