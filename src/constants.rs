// SPDX-License-Identifier: GPL-3.0-only

//! Scanner-wide constants

use std::time::Duration;

/// Frames sampled per second when the caller does not say otherwise
pub const DEFAULT_FPS: f64 = 10.0;

/// Upper bound for the sampling rate; faster sampling only queues work
/// behind the decode engine
pub const MAX_FPS: f64 = 60.0;

/// Consecutive engine failures tolerated before the error callback fires
pub const DEFAULT_MAX_ENGINE_ERRORS: u32 = 5;

/// Decode engine working size; larger frames are downscaled first
pub const DEFAULT_DECODE_MAX_DIMENSION: u32 = 640;

/// Timing constants for session setup
pub mod timing {
    use super::Duration;

    /// How long `start` waits for the surface to report its dimensions
    pub const SURFACE_READY_TIMEOUT: Duration = Duration::from_secs(10);

    /// How long a stopped capture thread gets to exit before it is detached
    pub const CAPTURE_STOP_TIMEOUT: Duration = Duration::from_secs(2);
}

/// Capture defaults for providers that negotiate a format
pub mod capture {
    /// Requested width when constraints leave it open
    pub const DEFAULT_WIDTH: u32 = 1280;

    /// Requested height when constraints leave it open
    pub const DEFAULT_HEIGHT: u32 = 720;

    /// Number of mmap buffers queued on V4L2 devices
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Frame rate of the virtual camera when constraints leave it open
    pub const VIRTUAL_CAMERA_FPS: u32 = 30;

    /// Consecutive failed device reads before a capture thread gives up
    pub const MAX_CAPTURE_ERRORS: u32 = 10;

    /// Pause between failed device reads
    pub const CAPTURE_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(50);
}

/// Image file helpers
pub mod file_formats {
    /// Extensions accepted by the virtual camera and `scan_image`
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

    /// Check whether an extension (without dot) names a supported image
    pub fn is_image_extension(ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        IMAGE_EXTENSIONS.contains(&ext.as_str())
    }
}

/// Label fragments used to guess which way a camera faces
pub mod facing_hints {
    /// Fragments that suggest a user-facing (front) camera
    pub const USER: &[&str] = &["front", "user", "facetime", "selfie", "integrated"];

    /// Fragments that suggest an environment-facing (back) camera
    pub const ENVIRONMENT: &[&str] = &["back", "rear", "environment", "world"];
}
