// SPDX-License-Identifier: GPL-3.0-only

//! Still image frame source for the virtual camera

use crate::backends::camera::types::CameraFrame;
use crate::constants::file_formats;
use crate::errors::AcquisitionError;
use std::path::Path;
use tracing::info;

/// Load an image file as a single RGBA frame
pub fn load_image_as_frame(path: &Path) -> Result<CameraFrame, AcquisitionError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    if !file_formats::is_image_extension(extension) {
        return Err(AcquisitionError::ConstraintsUnsatisfiable(format!(
            "unsupported file format: {}",
            path.display()
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => AcquisitionError::from(io),
        other => AcquisitionError::Backend(format!(
            "Failed to load image '{}': {}",
            path.display(),
            other
        )),
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    info!(width, height, "Image loaded successfully");

    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_video_files() {
        let err = load_image_as_frame(Path::new("/tmp/clip.mp4")).unwrap_err();
        assert!(matches!(err, AcquisitionError::ConstraintsUnsatisfiable(_)));
    }

    #[test]
    fn test_missing_file_is_no_device() {
        let err = load_image_as_frame(Path::new("/nonexistent/dir/frame.png")).unwrap_err();
        assert_eq!(err, AcquisitionError::NoDevice);
    }

    #[test]
    fn test_loads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let frame = load_image_as_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.rgba_at(2, 1), [1, 2, 3, 255]);
    }
}
