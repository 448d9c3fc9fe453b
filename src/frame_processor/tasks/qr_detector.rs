// SPDX-License-Identifier: GPL-3.0-only

//! QR code decode engine
//!
//! Wraps the rqrr recognizer. Still images are decoded to grayscale,
//! downscaled for speed and searched for QR grids; the first grid that
//! decodes wins.

use super::DecodeEngine;
use crate::frame_processor::symbology::{Symbology, SymbologyTable};
use crate::frame_processor::types::{DecodeHints, DecodeOutcome, DecodedCode};
use crate::media::StillImage;
use image::GrayImage;
use image::imageops::{self, FilterType};
use tracing::{debug, trace, warn};

/// rqrr's only format, under the identifier this adapter reports
const RQRR_QR: &str = "rqrr/qr";

/// QR code detector
///
/// Recognition is CPU-bound and runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct QrDetector {
    table: SymbologyTable,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    pub fn new() -> Self {
        Self {
            table: SymbologyTable::new(&[(Symbology::QrCode, RQRR_QR)]),
        }
    }
}

impl DecodeEngine for QrDetector {
    fn symbologies(&self) -> &SymbologyTable {
        &self.table
    }

    async fn decode(
        &self,
        image: StillImage,
        allowed: &[Symbology],
        hints: &DecodeHints,
    ) -> DecodeOutcome {
        if !allowed.contains(&Symbology::QrCode) {
            return DecodeOutcome::NotFound;
        }

        let hints = *hints;
        let outcome = tokio::task::spawn_blocking(move || detect_sync(&image, &hints))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "QR detection task panicked");
                Err(format!("detection task failed: {}", e))
            });

        match outcome {
            Ok(Some(text)) => match self.table.symbology(RQRR_QR) {
                Some(symbology) => DecodeOutcome::Found(DecodedCode { text, symbology }),
                None => DecodeOutcome::EngineError(format!("unmapped engine format {}", RQRR_QR)),
            },
            Ok(None) => DecodeOutcome::NotFound,
            Err(reason) => DecodeOutcome::EngineError(reason),
        }
    }

    fn reset(&self) {
        // rqrr keeps no state between images
        trace!("QR detector reset");
    }
}

/// Synchronous detection (runs in blocking task)
fn detect_sync(image: &StillImage, hints: &DecodeHints) -> Result<Option<String>, String> {
    let start = std::time::Instant::now();

    let gray = image
        .decode()
        .map_err(|e| format!("cannot decode still image: {}", e))?
        .to_luma8();

    let scaled = downscale(&gray, hints.max_dimension);
    let mut found = scan_gray(scaled.as_ref().unwrap_or(&gray));

    if found.is_none() && hints.try_harder {
        if scaled.is_some() {
            found = scan_gray(&gray);
        }
        if found.is_none() {
            let mut inverted = gray.clone();
            imageops::invert(&mut inverted);
            found = scan_gray(&inverted);
        }
    }

    trace!(
        width = gray.width(),
        height = gray.height(),
        found = found.is_some(),
        elapsed_ms = start.elapsed().as_millis(),
        "QR detection complete"
    );

    Ok(found)
}

/// Downscale so neither side exceeds `max_dimension`
///
/// Returns `None` when the image is already small enough.
fn downscale(gray: &GrayImage, max_dimension: u32) -> Option<GrayImage> {
    let (width, height) = gray.dimensions();
    if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
        return None;
    }

    let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
    let new_width = ((width as f32 / scale) as u32).max(1);
    let new_height = ((height as f32 / scale) as u32).max(1);
    Some(imageops::resize(gray, new_width, new_height, FilterType::Triangle))
}

/// Run rqrr over a grayscale image and return the first decodable payload
fn scan_gray(gray: &GrayImage) -> Option<String> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        gray.width() as usize,
        gray.height() as usize,
        |x, y| gray.get_pixel(x as u32, y as u32).0[0],
    );

    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((meta, content)) => {
                debug!(version = meta.version.0, "Decoded QR grid");
                return Some(content);
            }
            Err(e) => debug!(error = ?e, "Failed to decode QR grid"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png(image: &GrayImage) -> StillImage {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        StillImage::from_encoded(bytes)
    }

    #[test]
    fn test_downscale_keeps_aspect() {
        let gray = GrayImage::new(1280, 720);
        let scaled = downscale(&gray, 640).unwrap();
        assert_eq!(scaled.dimensions(), (640, 360));
        assert!(downscale(&GrayImage::new(320, 240), 640).is_none());
    }

    #[tokio::test]
    async fn test_blank_image_not_found() {
        let detector = QrDetector::new();
        let blank = GrayImage::from_pixel(64, 64, image::Luma([255]));
        let outcome = detector
            .decode(png(&blank), &[Symbology::QrCode], &DecodeHints::default())
            .await;
        assert_eq!(outcome, DecodeOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_engine_error() {
        let detector = QrDetector::new();
        let outcome = detector
            .decode(
                StillImage::from_encoded(vec![1, 2, 3]),
                &[Symbology::QrCode],
                &DecodeHints::default(),
            )
            .await;
        assert!(matches!(outcome, DecodeOutcome::EngineError(_)));
    }

    #[tokio::test]
    async fn test_qr_not_allowed_is_skipped() {
        let detector = QrDetector::new();
        let outcome = detector
            .decode(
                StillImage::from_encoded(vec![1, 2, 3]),
                &[Symbology::Ean13],
                &DecodeHints::default(),
            )
            .await;
        assert_eq!(outcome, DecodeOutcome::NotFound);
    }

    #[test]
    fn test_table_maps_qr_only() {
        let detector = QrDetector::new();
        assert_eq!(detector.symbologies().supported(), vec![Symbology::QrCode]);
        assert_eq!(detector.symbologies().symbology(RQRR_QR), Some(Symbology::QrCode));
    }
}
