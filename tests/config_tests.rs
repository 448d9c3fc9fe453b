// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use codescan::config::{ScannerOptions, TargetRegion, load_options};
use codescan::errors::ConfigError;
use codescan::frame_processor::{DecodeEngine, QrDetector, Symbology};
use codescan::Facing;
use std::io::Write;
use std::time::Duration;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_options_default() {
    let options = ScannerOptions::default();

    assert_eq!(options.fps, 10.0);
    assert_eq!(options.preferred_camera, Facing::Environment);
    assert!(options.auto_normalize, "Normalization should be on by default");
    assert!(options.formats.is_none());
    assert!(options.target_region.is_none());
    assert!(!options.continuous);
}

#[test]
fn test_partial_config_file_uses_defaults() {
    let file = write_config(r#"{ "fps": 5, "preferred_camera": "user", "continuous": true }"#);
    let options = load_options(file.path()).unwrap();

    assert_eq!(options.fps, 5.0);
    assert_eq!(options.preferred_camera, Facing::User);
    assert!(options.continuous);
    assert!(options.auto_normalize);
    assert_eq!(options.max_engine_errors, 5);
}

#[test]
fn test_config_file_region_and_formats() {
    let file = write_config(
        r#"{
            "formats": ["qr_code"],
            "target_region": { "width": 60, "height": 40 },
            "constraints": { "device_id": "/dev/video2", "width": 1920 }
        }"#,
    );
    let options = load_options(file.path()).unwrap();
    assert_eq!(options.formats, Some(vec![Symbology::QrCode]));
    assert_eq!(options.target_region, Some(TargetRegion::new(60.0, 40.0)));

    let detector = QrDetector::new();
    let resolved = options.resolve(detector.symbologies()).unwrap();
    assert_eq!(resolved.constraints().device_id.as_deref(), Some("/dev/video2"));
    assert_eq!(resolved.constraints().facing, Some(Facing::Environment));
    assert_eq!(resolved.constraints().width, Some(1920));
}

#[test]
fn test_invalid_config_file() {
    let file = write_config("{ not json");
    assert!(matches!(load_options(file.path()), Err(ConfigError::Parse(_))));

    let file = write_config(r#"{ "formats": ["bogus"] }"#);
    assert!(matches!(load_options(file.path()), Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_options(&dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_qr_detector_rejects_barcodes() {
    let options = ScannerOptions {
        formats: Some(vec![Symbology::Ean13]),
        ..Default::default()
    };
    let err = options.resolve(QrDetector::new().symbologies()).unwrap_err();
    assert_eq!(err, ConfigError::UnsupportedSymbology("ean13".to_string()));
}

#[test]
fn test_resolved_timing() {
    let options = ScannerOptions {
        fps: 4.0,
        ready_timeout_ms: 2500,
        ..Default::default()
    };
    let resolved = options.resolve(QrDetector::new().symbologies()).unwrap();
    assert_eq!(resolved.interval(), Duration::from_millis(250));
    assert_eq!(resolved.ready_timeout(), Duration::from_millis(2500));
    assert_eq!(resolved.formats(), &[Symbology::QrCode]);
}
