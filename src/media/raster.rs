// SPDX-License-Identifier: GPL-3.0-only

//! Frame rasterization and still image encoding

use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::errors::{ScannerError, ScannerResult};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::sync::Arc;

/// A rectangle in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// The whole frame
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Clip to a `width` x `height` frame
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An encoded still image handed to the decode engine
#[derive(Debug, Clone)]
pub struct StillImage {
    data: Arc<[u8]>,
}

impl StillImage {
    /// Wrap already encoded bytes (PNG, JPEG, anything `image` reads)
    pub fn from_encoded(bytes: Vec<u8>) -> Self {
        Self {
            data: Arc::from(bytes.into_boxed_slice()),
        }
    }

    /// Decode back into pixels
    pub fn decode(&self) -> Result<DynamicImage, image::ImageError> {
        image::load_from_memory(&self.data)
    }
}

/// Drawable surface used to turn a video frame into a still image
///
/// The scanner keeps one sink per session and resizes it whenever the
/// camera or the crop mode changes, so implementations should reuse their
/// buffer when the size does not change.
pub trait FrameSink: Send {
    /// Resize the backing buffer
    fn resize(&mut self, width: u32, height: u32);

    /// Current buffer size
    fn dimensions(&self) -> (u32, u32);

    /// Draw `src` of `frame`, scaled to fill the whole buffer
    fn draw(&mut self, frame: &CameraFrame, src: PixelRect);

    /// Encode the buffer contents
    fn encode(&self) -> ScannerResult<StillImage>;
}

/// RGBA canvas that encodes to PNG
#[derive(Debug, Default)]
pub struct RasterCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw RGBA contents
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Row copy for the common unscaled RGBA case
    fn copy_rows(&mut self, frame: &CameraFrame, src: PixelRect) {
        let stride = frame.stride as usize;
        let row_bytes = src.width as usize * 4;

        for row in 0..src.height as usize {
            let start = (src.y as usize + row) * stride + src.x as usize * 4;
            let dst = row * row_bytes;
            match frame.data.get(start..start + row_bytes) {
                Some(line) => self.pixels[dst..dst + row_bytes].copy_from_slice(line),
                None => self.pixels[dst..dst + row_bytes].fill(0),
            }
        }
    }
}

impl FrameSink for RasterCanvas {
    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize * 4, 0);
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw(&mut self, frame: &CameraFrame, src: PixelRect) {
        let src = src.clamp_to(frame.width, frame.height);
        if src.is_empty() || self.width == 0 || self.height == 0 {
            return;
        }

        if frame.format == PixelFormat::RGBA
            && (src.width, src.height) == (self.width, self.height)
        {
            self.copy_rows(frame, src);
            return;
        }

        // Nearest neighbour scaling; decoders care about edges, not smoothness
        let x_ratio = src.width as f32 / self.width as f32;
        let y_ratio = src.height as f32 / self.height as f32;
        for y in 0..self.height {
            let sy = src.y + ((y as f32 * y_ratio) as u32).min(src.height - 1);
            for x in 0..self.width {
                let sx = src.x + ((x as f32 * x_ratio) as u32).min(src.width - 1);
                let offset = (y as usize * self.width as usize + x as usize) * 4;
                self.pixels[offset..offset + 4].copy_from_slice(&frame.rgba_at(sx, sy));
            }
        }
    }

    fn encode(&self) -> ScannerResult<StillImage> {
        if self.width == 0 || self.height == 0 {
            return Err(ScannerError::Media("canvas has no size".to_string()));
        }

        let mut png = Vec::with_capacity(self.pixels.len() / 2);
        PngEncoder::new_with_quality(&mut png, CompressionType::Fast, FilterType::NoFilter)
            .write_image(&self.pixels, self.width, self.height, ExtendedColorType::Rgba8)
            .map_err(|e| ScannerError::Media(format!("PNG encoding failed: {}", e)))?;

        Ok(StillImage::from_encoded(png))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x2 frame where each pixel's red channel is its x + 10*y
    fn gradient_frame() -> CameraFrame {
        let mut data = Vec::new();
        for y in 0..2u8 {
            for x in 0..4u8 {
                data.extend_from_slice(&[x + 10 * y, 0, 0, 255]);
            }
        }
        CameraFrame::from_rgba(4, 2, data)
    }

    #[test]
    fn test_crop_copies_subrect() {
        let frame = gradient_frame();
        let mut canvas = RasterCanvas::new();
        canvas.resize(2, 1);
        canvas.draw(
            &frame,
            PixelRect {
                x: 1,
                y: 1,
                width: 2,
                height: 1,
            },
        );
        assert_eq!(canvas.pixels()[0], 11);
        assert_eq!(canvas.pixels()[4], 12);
    }

    #[test]
    fn test_scaled_draw() {
        let frame = gradient_frame();
        let mut canvas = RasterCanvas::new();
        canvas.resize(2, 1);
        canvas.draw(&frame, PixelRect::full(4, 2));
        assert_eq!(canvas.pixels()[0], 0);
        assert_eq!(canvas.pixels()[4], 2);
    }

    #[test]
    fn test_encode_round_trips_dimensions() {
        let frame = gradient_frame();
        let mut canvas = RasterCanvas::new();
        canvas.resize(4, 2);
        canvas.draw(&frame, PixelRect::full(4, 2));

        let still = canvas.encode().unwrap();
        let decoded = still.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 2));
    }

    #[test]
    fn test_encode_empty_canvas_fails() {
        let canvas = RasterCanvas::new();
        assert!(matches!(canvas.encode(), Err(ScannerError::Media(_))));
    }

    #[test]
    fn test_clamp_rect() {
        let rect = PixelRect {
            x: 900,
            y: 700,
            width: 500,
            height: 400,
        };
        assert_eq!(
            rect.clamp_to(1000, 800),
            PixelRect {
                x: 900,
                y: 700,
                width: 100,
                height: 100
            }
        );
    }
}
