// SPDX-License-Identifier: MPL-2.0

//! codescan - camera capture-and-scan orchestrator for barcodes and QR codes
//!
//! This library opens a camera (or a virtual one), samples frames at a
//! fixed rate, optionally crops a centered target region and hands each
//! frame to a decode engine until a code is found.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`scanner`]: The orchestrator, its lifecycle and the sampling loop
//! - [`backends`]: Media capture providers (V4L2, virtual camera)
//! - [`media`]: Capture surfaces, rasterization and still images
//! - [`frame_processor`]: Decode engine contract, QR detector, normalization
//! - [`config`]: Scanner options and config file loading
//! - [`errors`]: Error types
//!
//! # Example
//!
//! ```ignore
//! let scanner = Scanner::new(V4l2Provider::new(), QrDetector::new(), ScannerOptions::default())?;
//! let surface = VideoSurface::new();
//! scanner
//!     .start(&surface, Arc::new(|result| println!("{}", result.text())), None)
//!     .await?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod media;
pub mod scanner;

// Re-export commonly used types
pub use backends::camera::v4l2::V4l2Provider;
pub use backends::camera::{CameraDevice, Facing, MediaCaptureProvider, MediaConstraints};
pub use backends::virtual_camera::VirtualCameraProvider;
pub use config::{ResolvedOptions, ScannerOptions, TargetRegion};
pub use errors::{AcquisitionError, ConfigError, FileDecodeError, ScannerError, ScannerResult};
pub use frame_processor::{DecodeEngine, DecodeOutcome, QrDetector, ScanResult, Symbology};
pub use media::VideoSurface;
pub use scanner::{OnError, OnResult, ScanState, Scanner};
