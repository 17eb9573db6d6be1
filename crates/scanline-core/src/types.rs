//! Result payloads carried on the event bus.
//!
//! These mirror what a decoding engine reports for each processed frame.

use serde::{Deserialize, Serialize};

/// A point in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A successfully decoded symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeResult {
    /// Decoded payload text
    pub code: String,

    /// Reader format that produced the code (e.g. "code_128")
    pub format: String,

    /// Start offset of the symbol on the scan line
    #[serde(default)]
    pub start: u32,

    /// End offset of the symbol on the scan line
    #[serde(default)]
    pub end: u32,

    /// Scan direction: 1 forward, -1 reverse
    #[serde(default = "default_direction")]
    pub direction: i8,
}

fn default_direction() -> i8 {
    1
}

impl CodeResult {
    pub fn new(code: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            format: format.into(),
            start: 0,
            end: 0,
            direction: default_direction(),
        }
    }
}

/// Payload of a `processed` or `detected` event.
///
/// `code_result` is `None` when the frame was processed but nothing decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// The decoded symbol, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_result: Option<CodeResult>,

    /// Bounding quadrilateral of the decoded symbol
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Vec<Point>>,

    /// All candidate regions examined in the frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boxes: Vec<Vec<Point>>,

    /// Scan line used for decoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<[Point; 2]>,

    /// Angle of the scan line in radians
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,

    /// Index of the frame within the input stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<usize>,
}

impl ScanResult {
    /// A processed frame that yielded no symbol.
    pub fn empty(frame: usize) -> Self {
        Self {
            frame: Some(frame),
            ..Self::default()
        }
    }

    /// A processed frame with a decoded symbol.
    pub fn decoded(frame: usize, code_result: CodeResult) -> Self {
        Self {
            code_result: Some(code_result),
            frame: Some(frame),
            ..Self::default()
        }
    }

    /// Whether this frame produced a decoded symbol.
    pub fn is_detected(&self) -> bool {
        self.code_result.is_some()
    }
}
