// SPDX-License-Identifier: MPL-2.0

//! Frame processor module for code recognition
//!
//! This module holds everything between an encoded still image and a
//! [`ScanResult`]: the [`DecodeEngine`] contract, the bundled QR detector,
//! the symbology mapping table and text normalization.

pub mod normalize;
pub mod symbology;
pub mod tasks;
pub mod types;

pub use normalize::normalize;
pub use symbology::{Symbology, SymbologyTable};
pub use tasks::{DecodeEngine, QrDetector};
pub use types::{DecodeHints, DecodeOutcome, DecodedCode, ScanResult};
