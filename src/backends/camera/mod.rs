// SPDX-License-Identifier: MPL-2.0

//! Media capture provider abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Scan Orchestrator │
//! └──────────┬──────────┘
//!            │ acquire / enumerate
//!            ▼
//! ┌──────────────────────────┐
//! │ MediaCaptureProvider     │  ← Common interface
//! └──────────┬───────────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!    ┌──────┐  ┌─────────┐
//!    │ V4L2 │  │ Virtual │  ← Concrete implementations
//!    └──────┘  └─────────┘
//! ```
//!
//! A provider hands out [`CaptureStream`]s. Each stream publishes its frames
//! on a watch channel and owns whatever thread or device handle produces
//! them until [`CaptureStream::release`] is called.

pub mod format_converters;
pub mod frame_loop;
pub mod types;
pub mod v4l2;

pub use types::*;

use crate::errors::AcquisitionError;
use std::future::Future;

/// An open camera stream
pub trait CaptureStream: Send + Sync {
    /// Device this stream was opened on
    fn device(&self) -> &CameraDevice;

    /// Subscribe to the stream's frames
    ///
    /// The receiver yields `None` until the first frame arrives.
    fn frames(&self) -> FrameReceiver;

    /// Stop all tracks and free the device
    ///
    /// Must be idempotent; once it returns the device is no longer in use.
    fn release(&self);

    /// Whether the stream still delivers frames
    fn is_live(&self) -> bool;
}

/// Source of camera streams
///
/// Implementations must be cheap to share behind an `Arc`; every async
/// method may be called from any task.
pub trait MediaCaptureProvider: Send + Sync + 'static {
    /// Open a stream matching `constraints`
    ///
    /// # Returns
    /// * `Ok(stream)` - Stream is open and producing (or about to produce) frames
    /// * `Err(AcquisitionError)` - Permission, device or constraint failure
    fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> impl Future<Output = Result<Box<dyn CaptureStream>, AcquisitionError>> + Send;

    /// List available video inputs
    fn enumerate(&self) -> impl Future<Output = Result<Vec<CameraDevice>, AcquisitionError>> + Send;
}

/// Pick the device that best matches `constraints`
///
/// An exact `device_id` must match or the request fails. Otherwise a device
/// with the preferred facing wins, falling back to the first device.
pub fn select_device<'a>(
    devices: &'a [CameraDevice],
    constraints: &MediaConstraints,
) -> Result<&'a CameraDevice, AcquisitionError> {
    if let Some(id) = constraints.device_id.as_deref() {
        return devices
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| AcquisitionError::ConstraintsUnsatisfiable(format!("no device {}", id)));
    }

    let preferred = constraints
        .facing
        .and_then(|facing| devices.iter().find(|d| d.facing == Some(facing)));

    preferred
        .or_else(|| devices.first())
        .ok_or(AcquisitionError::NoDevice)
}
