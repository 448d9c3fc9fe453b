// SPDX-License-Identifier: GPL-3.0-only
// Shared types for media capture providers

//! Shared types for camera backends

use crate::constants::facing_hints;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Which way a camera points relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Front camera, looking at the user
    User,
    /// Back camera, looking away from the user
    #[default]
    Environment,
}

impl Facing {
    /// Guess the facing from a device label
    ///
    /// Pure label heuristics; desktop webcams rarely say anything useful,
    /// in which case `None` is returned.
    pub fn infer_from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if facing_hints::ENVIRONMENT.iter().any(|hint| label.contains(hint)) {
            Some(Facing::Environment)
        } else if facing_hints::USER.iter().any(|hint| label.contains(hint)) {
            Some(Facing::User)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::User => write!(f, "user"),
            Facing::Environment => write!(f, "environment"),
        }
    }
}

/// A camera as reported by enumeration
///
/// Snapshot only; hot-plug changes are not tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Stable identifier (device path for V4L2)
    pub id: String,
    /// Human readable name, may be empty before permission is granted
    pub label: String,
    /// Inferred orientation, no accuracy guarantee
    pub facing: Option<Facing>,
}

impl CameraDevice {
    /// Build a device record, inferring facing from the label
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        let facing = Facing::infer_from_label(&label);
        Self {
            id: id.into(),
            label,
            facing,
        }
    }
}

/// Media constraints passed to a capture provider
///
/// Every field is optional; providers treat `facing` as a preference and
/// `device_id` as an exact requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    /// Exact device to open
    pub device_id: Option<String>,
    /// Preferred camera orientation
    pub facing: Option<Facing>,
    /// Ideal frame width in pixels
    pub width: Option<u32>,
    /// Ideal frame height in pixels
    pub height: Option<u32>,
    /// Ideal capture frame rate
    pub frame_rate: Option<u32>,
}

impl MediaConstraints {
    /// Constraints that only express a facing preference
    pub fn facing(facing: Facing) -> Self {
        Self {
            facing: Some(facing),
            ..Default::default()
        }
    }

    /// Overlay `overrides` on top of `self`; set fields in `overrides` win
    pub fn merged_with(&self, overrides: &MediaConstraints) -> Self {
        Self {
            device_id: overrides.device_id.clone().or_else(|| self.device_id.clone()),
            facing: overrides.facing.or(self.facing),
            width: overrides.width.or(self.width),
            height: overrides.height.or(self.height),
            frame_rate: overrides.frame_rate.or(self.frame_rate),
        }
    }

    /// Copy of these constraints pinned to one device
    pub fn with_device(&self, device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..self.clone()
        }
    }
}

/// Pixel layout of [`CameraFrame::data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Bytes used by one pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::RGBA => 4,
            Self::Gray8 => 1,
        }
    }
}

/// One decoded video frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, row-major, `stride` bytes per row
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// When the frame left the device
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// Read one pixel as RGBA, gray frames are expanded
    ///
    /// Out-of-range reads return opaque black rather than panicking.
    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        let bpp = self.format.bytes_per_pixel();
        let offset = y as usize * self.stride as usize + x as usize * bpp;
        match self.format {
            PixelFormat::RGBA => match self.data.get(offset..offset + 4) {
                Some(px) => [px[0], px[1], px[2], px[3]],
                None => [0, 0, 0, 255],
            },
            PixelFormat::Gray8 => {
                let v = self.data.get(offset).copied().unwrap_or(0);
                [v, v, v, 255]
            }
        }
    }
}

/// Sending half of a stream's frame channel
///
/// A watch channel: slow consumers only ever see the latest frame.
pub type FrameSender = watch::Sender<Option<Arc<CameraFrame>>>;

/// Receiving half of a stream's frame channel
pub type FrameReceiver = watch::Receiver<Option<Arc<CameraFrame>>>;

/// Create an empty frame channel
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    watch::channel(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_from_label() {
        assert_eq!(
            Facing::infer_from_label("Back Camera"),
            Some(Facing::Environment)
        );
        assert_eq!(
            Facing::infer_from_label("FaceTime HD Camera"),
            Some(Facing::User)
        );
        assert_eq!(Facing::infer_from_label("USB2.0 HD UVC WebCam"), None);
        assert_eq!(Facing::infer_from_label(""), None);
    }

    #[test]
    fn test_constraints_override_wins() {
        let base = MediaConstraints {
            facing: Some(Facing::Environment),
            width: Some(1280),
            ..Default::default()
        };
        let overrides = MediaConstraints {
            width: Some(1920),
            ..Default::default()
        };

        let merged = base.merged_with(&overrides);
        assert_eq!(merged.width, Some(1920));
        assert_eq!(merged.facing, Some(Facing::Environment));
        assert_eq!(merged.device_id, None);
    }

    #[test]
    fn test_with_device_keeps_other_fields() {
        let base = MediaConstraints::facing(Facing::User);
        let pinned = base.with_device("/dev/video2");
        assert_eq!(pinned.device_id.as_deref(), Some("/dev/video2"));
        assert_eq!(pinned.facing, Some(Facing::User));
    }

    #[test]
    fn test_rgba_at_respects_stride() {
        let frame = CameraFrame {
            width: 1,
            height: 2,
            data: Arc::from(vec![1, 2, 3, 4, 0, 0, 5, 6, 7, 8, 0, 0].as_slice()),
            format: PixelFormat::RGBA,
            stride: 6,
            captured_at: Instant::now(),
        };
        assert_eq!(frame.rgba_at(0, 1), [5, 6, 7, 8]);
        assert_eq!(frame.rgba_at(3, 3), [0, 0, 0, 255]);
    }
}
