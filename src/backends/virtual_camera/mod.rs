// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera provider
//!
//! Exposes a single virtual device that replays one still image at a fixed
//! frame rate. Useful for headless runs and for exercising the scanner
//! without hardware.
//!
//! ```text
//! Image file / in-memory frame
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ Capture thread   │  ← re-stamps and publishes the frame every 1/fps
//! └──────────────────┘
//!        │
//!        ▼
//!   FrameReceiver (watch)
//! ```

mod file_source;

pub use file_source::load_image_as_frame;

use crate::backends::camera::frame_loop::{CaptureLoopController, LoopAction};
use crate::backends::camera::types::{
    CameraDevice, CameraFrame, FrameReceiver, MediaConstraints, frame_channel,
};
use crate::backends::camera::{CaptureStream, MediaCaptureProvider};
use crate::constants::capture::VIRTUAL_CAMERA_FPS;
use crate::errors::AcquisitionError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;

/// Where the virtual camera gets its picture from
#[derive(Debug, Clone)]
enum VirtualSource {
    File(PathBuf),
    Frame(Arc<CameraFrame>),
}

/// Capture provider with one virtual device
#[derive(Debug, Clone)]
pub struct VirtualCameraProvider {
    device: CameraDevice,
    source: VirtualSource,
    fps: u32,
}

impl VirtualCameraProvider {
    /// Virtual camera that streams an image file
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            device: CameraDevice::new(
                format!("virtual:{}", path.display()),
                format!("Virtual Camera ({})", name),
            ),
            source: VirtualSource::File(path),
            fps: VIRTUAL_CAMERA_FPS,
        }
    }

    /// Virtual camera that streams an in-memory frame
    pub fn from_frame(frame: CameraFrame) -> Self {
        Self {
            device: CameraDevice::new("virtual:frame", "Virtual Camera"),
            source: VirtualSource::Frame(Arc::new(frame)),
            fps: VIRTUAL_CAMERA_FPS,
        }
    }

    /// Override the replay frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    /// The single device this provider exposes
    pub fn device(&self) -> &CameraDevice {
        &self.device
    }
}

impl MediaCaptureProvider for VirtualCameraProvider {
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn CaptureStream>, AcquisitionError> {
        if let Some(id) = constraints.device_id.as_deref()
            && id != self.device.id
        {
            return Err(AcquisitionError::ConstraintsUnsatisfiable(format!(
                "no device {}",
                id
            )));
        }

        let fps = constraints.frame_rate.unwrap_or(self.fps).max(1);
        let interval = Duration::from_secs_f64(1.0 / fps as f64);
        let source = self.source.clone();
        let (sender, receiver) = frame_channel();

        info!(device = %self.device.id, fps, "Starting virtual camera");

        let (controller, ready) = CaptureLoopController::spawn(
            "virtual-camera",
            move || match source {
                VirtualSource::File(path) => load_image_as_frame(&path).map(Arc::new),
                VirtualSource::Frame(frame) => Ok(frame),
            },
            move |frame: &mut Arc<CameraFrame>| {
                let stamped = CameraFrame {
                    captured_at: Instant::now(),
                    ..CameraFrame::clone(frame)
                };
                sender.send_replace(Some(Arc::new(stamped)));
                // Woken early by `request_stop`
                std::thread::park_timeout(interval);
                LoopAction::Continue
            },
        );

        ready
            .await
            .map_err(|_| AcquisitionError::Backend("virtual camera thread exited".to_string()))??;

        Ok(Box::new(VirtualStream {
            device: self.device.clone(),
            receiver,
            controller: Mutex::new(Some(controller)),
            live: AtomicBool::new(true),
        }))
    }

    async fn enumerate(&self) -> Result<Vec<CameraDevice>, AcquisitionError> {
        Ok(vec![self.device.clone()])
    }
}

/// An open virtual camera stream
pub struct VirtualStream {
    device: CameraDevice,
    receiver: FrameReceiver,
    controller: Mutex<Option<CaptureLoopController>>,
    live: AtomicBool,
}

impl CaptureStream for VirtualStream {
    fn device(&self) -> &CameraDevice {
        &self.device
    }

    fn frames(&self) -> FrameReceiver {
        self.receiver.clone()
    }

    fn release(&self) {
        if !self.live.swap(false, Ordering::SeqCst) {
            return;
        }
        let controller = self
            .controller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(mut controller) = controller {
            controller.stop();
        }
        info!(device = %self.device.id, "Virtual camera released");
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> CameraFrame {
        CameraFrame::from_rgba(4, 2, vec![128; 4 * 2 * 4])
    }

    #[tokio::test]
    async fn test_stream_publishes_frames() {
        let provider = VirtualCameraProvider::from_frame(frame()).with_fps(100);
        let stream = provider.acquire(&MediaConstraints::default()).await.unwrap();

        let mut frames = stream.frames();
        frames.wait_for(|f| f.is_some()).await.unwrap();
        let current = frames.borrow().clone().unwrap();
        assert_eq!((current.width, current.height), (4, 2));

        stream.release();
        assert!(!stream.is_live());
        stream.release();
    }

    #[tokio::test]
    async fn test_release_does_not_wait_out_frame_interval() {
        let provider = VirtualCameraProvider::from_frame(frame()).with_fps(1);
        let stream = provider.acquire(&MediaConstraints::default()).await.unwrap();
        stream.frames().wait_for(|f| f.is_some()).await.unwrap();

        let start = Instant::now();
        stream.release();
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(stream.frames().has_changed().is_err());
    }

    #[tokio::test]
    async fn test_wrong_device_is_rejected() {
        let provider = VirtualCameraProvider::from_frame(frame());
        let constraints = MediaConstraints::default().with_device("/dev/video0");
        let result = provider.acquire(&constraints).await;
        assert!(matches!(
            result,
            Err(AcquisitionError::ConstraintsUnsatisfiable(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_fails_acquisition() {
        let provider = VirtualCameraProvider::from_file("/nonexistent/code.png");
        let result = provider.acquire(&MediaConstraints::default()).await;
        assert!(matches!(result, Err(AcquisitionError::NoDevice)));
    }

    #[tokio::test]
    async fn test_enumerate_lists_single_device() {
        let provider = VirtualCameraProvider::from_file("/tmp/qr.png");
        let devices = provider.enumerate().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "virtual:/tmp/qr.png");
        assert_eq!(devices[0].label, "Virtual Camera (qr.png)");
    }
}
