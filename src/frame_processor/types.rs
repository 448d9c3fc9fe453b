// SPDX-License-Identifier: MPL-2.0

//! Core types for decode requests and scan results

use super::normalize::normalize;
use super::symbology::Symbology;
use crate::constants::DEFAULT_DECODE_MAX_DIMENSION;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What an engine recognized in one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    /// Payload exactly as the engine produced it
    pub text: String,
    /// Scheme the payload was encoded with
    pub symbology: Symbology,
}

/// Outcome of one decode submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A code was recognized
    Found(DecodedCode),
    /// The image holds no readable code; the expected case for most frames
    NotFound,
    /// The engine itself failed
    EngineError(String),
}

/// Per-request tuning passed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeHints {
    /// Spend extra passes (full resolution, inverted image) before giving up
    pub try_harder: bool,
    /// Images larger than this on either side are downscaled first
    pub max_dimension: u32,
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self {
            try_harder: false,
            max_dimension: DEFAULT_DECODE_MAX_DIMENSION,
        }
    }
}

/// A normalized scan result
///
/// Built once per successful decode and handed to the caller; there are no
/// mutators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    text: String,
    raw_text: String,
    format: Symbology,
    timestamp: DateTime<Utc>,
    was_normalized: bool,
}

impl ScanResult {
    /// Build a result from a decoded code
    ///
    /// With `auto_normalize` off the text is passed through untouched.
    pub fn new(code: DecodedCode, auto_normalize: bool, timestamp: DateTime<Utc>) -> Self {
        let text = if auto_normalize {
            normalize(&code.text)
        } else {
            code.text.clone()
        };
        let was_normalized = text != code.text;

        Self {
            text,
            raw_text: code.text,
            format: code.symbology,
            timestamp,
            was_normalized,
        }
    }

    /// Normalized text (or raw text when normalization is off)
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text as the engine produced it
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Detected symbology
    pub fn format(&self) -> Symbology {
        self.format
    }

    /// When the frame or file was captured
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether normalization changed the text
    pub fn was_normalized(&self) -> bool {
        self.was_normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(text: &str) -> DecodedCode {
        DecodedCode {
            text: text.to_string(),
            symbology: Symbology::Code128,
        }
    }

    #[test]
    fn test_normalization_off_keeps_raw() {
        let result = ScanResult::new(code("]C1ABC "), false, Utc::now());
        assert_eq!(result.text(), "]C1ABC ");
        assert!(!result.was_normalized());
    }

    #[test]
    fn test_result_serializes_snake_case_format() {
        let result = ScanResult::new(code("ABC"), true, Utc::now());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["format"], "code128");
        assert_eq!(json["raw_text"], "ABC");
        assert_eq!(json["was_normalized"], false);
    }
}
