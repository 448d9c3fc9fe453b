// SPDX-License-Identifier: GPL-3.0-only

//! Decode engine contract and implementations
//!
//! The scanner never recognizes symbols itself. It hands encoded still
//! images to a [`DecodeEngine`] and acts on the [`DecodeOutcome`].

pub mod qr_detector;

pub use qr_detector::QrDetector;

use super::symbology::{Symbology, SymbologyTable};
use super::types::{DecodeHints, DecodeOutcome};
use crate::media::StillImage;
use std::future::Future;

/// External symbol recognizer
pub trait DecodeEngine: Send + Sync + 'static {
    /// Mapping between scanner symbologies and the engine's identifiers
    fn symbologies(&self) -> &SymbologyTable;

    /// Look for one code in `image`
    ///
    /// Only symbologies in `allowed` may be reported. A miss is
    /// [`DecodeOutcome::NotFound`], never an error.
    fn decode(
        &self,
        image: StillImage,
        allowed: &[Symbology],
        hints: &DecodeHints,
    ) -> impl Future<Output = DecodeOutcome> + Send;

    /// Clear any state carried between decode calls
    fn reset(&self) {}
}
