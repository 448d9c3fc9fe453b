// SPDX-License-Identifier: MPL-2.0

//! Integration tests for result normalization

use chrono::Utc;
use codescan::frame_processor::{DecodedCode, ScanResult, Symbology, normalize};

fn result(text: &str) -> ScanResult {
    ScanResult::new(
        DecodedCode {
            text: text.to_string(),
            symbology: Symbology::Code128,
        },
        true,
        Utc::now(),
    )
}

#[test]
fn test_aim_prefix_controls_and_whitespace() {
    let result = result("]C1\x00ABC123 ");
    assert_eq!(result.text(), "ABC123");
    assert_eq!(result.raw_text(), "]C1\x00ABC123 ");
    assert!(result.was_normalized());
}

#[test]
fn test_clean_text_untouched() {
    let result = result("ABC123");
    assert_eq!(result.text(), "ABC123");
    assert_eq!(result.raw_text(), "ABC123");
    assert!(!result.was_normalized());
}

#[test]
fn test_normalize_is_idempotent() {
    let inputs = [
        "]C1\x00ABC123 ",
        "  hello\tworld  ",
        "]Q3https://example.com/\r\n",
        "]d2\x1d0104012345678901",
        "",
        "]",
        "plain",
    ];
    for input in inputs {
        let once = normalize(input);
        assert_eq!(normalize(&once), once, "normalizing {:?} twice changed it", input);
    }
}

#[test]
fn test_whitespace_only_becomes_empty() {
    let result = result("   \n");
    assert_eq!(result.text(), "");
    assert!(result.was_normalized());
}
