// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for capture providers
//!
//! Everything downstream of a provider works on RGBA or Gray8 frames, so
//! packed webcam formats are expanded here on the capture thread.

use super::types::CameraFrame;
use image::ImageFormat;

/// Split a padded buffer into rows of `row_bytes` meaningful bytes
///
/// `stride` is the driver's bytesperline; values smaller than a row mean the
/// buffer is tightly packed. A short final row is returned as far as it goes.
fn rows(
    data: &[u8],
    row_bytes: usize,
    stride: u32,
    height: u32,
) -> impl Iterator<Item = &[u8]> {
    let stride = (stride as usize).max(row_bytes).max(1);
    data.chunks(stride)
        .take(height as usize)
        .map(move |row| &row[..row.len().min(row_bytes)])
}

/// Convert a packed 4:2:2 buffer to RGBA
///
/// `y_first` selects YUYV (Y0 U Y1 V) over UYVY (U Y0 V Y1) byte order.
/// Uses BT.601 coefficients for YUV to RGB conversion.
fn packed_422_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    y_first: bool,
) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let row_pixels = width as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for row in rows(data, row_pixels * 2, stride, height) {
        let row_start = rgba.len();
        for chunk in row.chunks_exact(4) {
            let (y0, u, y1, v) = if y_first {
                (chunk[0], chunk[1], chunk[2], chunk[3])
            } else {
                (chunk[1], chunk[0], chunk[3], chunk[2])
            };
            let u = u as f32 - 128.0;
            let v = v as f32 - 128.0;

            for y in [y0 as f32, y1 as f32] {
                if rgba.len() - row_start >= row_pixels * 4 {
                    break;
                }
                rgba.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
                rgba.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
                rgba.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
                rgba.push(255);
            }
        }
        rgba.resize(row_start + row_pixels * 4, 0);
    }

    rgba.resize(pixel_count * 4, 0);
    rgba
}

/// Convert YUYV (YUV 4:2:2) to RGBA
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, stride, true)
}

/// Convert UYVY (YUV 4:2:2) to RGBA
pub fn uyvy_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, stride, false)
}

/// Convert RGB to RGBA by adding alpha=255
pub fn rgb_to_rgba(rgb: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);
    for row in rows(rgb, width as usize * 3, stride, height) {
        let row_start = rgba.len();
        for chunk in row.chunks_exact(3) {
            rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
        }
        rgba.resize(row_start + width as usize * 4, 0);
    }
    rgba.resize(pixel_count * 4, 0);
    rgba
}

/// Decode one MJPEG frame into an RGBA [`CameraFrame`]
pub fn mjpeg_to_frame(data: &[u8]) -> Result<CameraFrame, image::ImageError> {
    let rgba = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_white() {
        // Pure white in YUV (Y=255, U=128, V=128)
        let yuyv = vec![255u8, 128, 255, 128];
        let rgba = yuyv_to_rgba(&yuyv, 2, 1, 0);

        assert_eq!(rgba.len(), 8);
        assert!(rgba[0] > 250);
        assert!(rgba[1] > 250);
        assert!(rgba[2] > 250);
        assert_eq!(rgba[3], 255);
        assert_eq!(rgba[7], 255);
    }

    #[test]
    fn test_uyvy_matches_yuyv() {
        let yuyv = vec![60u8, 90, 200, 170];
        let uyvy = vec![90u8, 60, 170, 200];
        assert_eq!(yuyv_to_rgba(&yuyv, 2, 1, 4), uyvy_to_rgba(&uyvy, 2, 1, 4));
    }

    #[test]
    fn test_short_buffer_is_padded() {
        let rgba = yuyv_to_rgba(&[16, 128, 16, 128], 4, 1, 8);
        assert_eq!(rgba.len(), 16);
    }

    #[test]
    fn test_padded_rows_are_skipped() {
        // 2x2 YUYV with bytesperline 8: four padding bytes per row
        let yuyv = [
            255, 128, 255, 128, 9, 9, 9, 9, //
            0, 128, 0, 128, 9, 9, 9, 9,
        ];
        let rgba = yuyv_to_rgba(&yuyv, 2, 2, 8);
        assert_eq!(rgba.len(), 16);
        assert_eq!(rgba[0..4], [255, 255, 255, 255]);
        assert_eq!(rgba[8..12], [0, 0, 0, 255]);

        // 1x2 RGB with bytesperline 4
        let rgb = [10, 20, 30, 0, 40, 50, 60, 0];
        assert_eq!(rgb_to_rgba(&rgb, 1, 2, 4), vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn test_rgb_to_rgba() {
        let rgb = vec![255, 128, 64, 0, 0, 0];
        let rgba = rgb_to_rgba(&rgb, 2, 1, 6);

        assert_eq!(rgba.len(), 8);
        assert_eq!(rgba[0..4], [255, 128, 64, 255]);
        assert_eq!(rgba[4..8], [0, 0, 0, 255]);
    }
}
