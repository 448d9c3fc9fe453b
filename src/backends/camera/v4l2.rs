// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture provider
//!
//! Opens `/dev/video*` capture nodes through the `v4l` crate. Frames are
//! read from memory-mapped buffers on a dedicated thread, converted to RGBA
//! and published on the stream's watch channel.

use super::format_converters::{mjpeg_to_frame, rgb_to_rgba, uyvy_to_rgba, yuyv_to_rgba};
use super::frame_loop::{CaptureLoopController, LoopAction};
use super::types::{
    CameraDevice, CameraFrame, FrameReceiver, FrameSender, MediaConstraints, PixelFormat,
    frame_channel,
};
use super::{CaptureStream, MediaCaptureProvider, select_device};
use crate::constants::capture::{
    CAPTURE_RETRY_DELAY, DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_CAPTURE_ERRORS, V4L2_BUFFER_COUNT,
};
use crate::errors::AcquisitionError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream as _;
use v4l::video::Capture;
use v4l::video::capture::Parameters;
use v4l::{Device, Format, FourCC};

/// Pixel formats we can convert, in order of preference
const PREFERRED_FOURCCS: [&[u8; 4]; 5] = [b"YUYV", b"MJPG", b"UYVY", b"RGB3", b"GREY"];

/// Capture provider backed by Video4Linux2 devices
#[derive(Debug, Default, Clone)]
pub struct V4l2Provider;

impl V4l2Provider {
    pub fn new() -> Self {
        Self
    }
}

/// Enumerate capture-capable V4L2 nodes (blocking)
fn enumerate_blocking() -> Vec<CameraDevice> {
    let mut devices = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path().to_string_lossy().to_string();
        let Ok(dev) = Device::with_path(node.path()) else {
            debug!(path = %path, "Skipping device that cannot be opened");
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        // Metadata nodes share the card name but cannot capture frames
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            continue;
        }
        let label = node.name().unwrap_or(caps.card);
        devices.push(CameraDevice::new(path, label));
    }

    devices.sort_by(|a, b| a.id.cmp(&b.id));
    devices
}

/// Per-thread capture state
struct V4l2Capture {
    stream: MmapStream<'static>,
    format: Format,
    sender: FrameSender,
    frame_count: u64,
    consecutive_errors: u32,
}

/// Open the device and negotiate a format we can convert
fn open_capture(
    path: &str,
    constraints: &MediaConstraints,
    sender: FrameSender,
) -> Result<V4l2Capture, AcquisitionError> {
    let dev = Device::with_path(path)?;

    let width = constraints.width.unwrap_or(DEFAULT_WIDTH);
    let height = constraints.height.unwrap_or(DEFAULT_HEIGHT);

    let supported: Vec<FourCC> = dev
        .enum_formats()
        .map(|formats| formats.into_iter().map(|f| f.fourcc).collect())
        .unwrap_or_default();

    let fourcc = PREFERRED_FOURCCS
        .iter()
        .map(|code| FourCC::new(code))
        .find(|code| supported.is_empty() || supported.contains(code))
        .ok_or_else(|| {
            AcquisitionError::ConstraintsUnsatisfiable(format!(
                "no convertible pixel format among {:?}",
                supported
            ))
        })?;

    let format = dev
        .set_format(&Format::new(width, height, fourcc))
        .map_err(|e| AcquisitionError::ConstraintsUnsatisfiable(e.to_string()))?;

    if !PREFERRED_FOURCCS.iter().any(|code| FourCC::new(code) == format.fourcc) {
        return Err(AcquisitionError::ConstraintsUnsatisfiable(format!(
            "driver switched to unsupported format {}",
            format.fourcc
        )));
    }

    if let Some(fps) = constraints.frame_rate {
        if let Err(e) = dev.set_params(&Parameters::with_fps(fps)) {
            warn!(path, fps, error = %e, "Failed to set frame rate, keeping driver default");
        }
    }

    info!(
        path,
        width = format.width,
        height = format.height,
        fourcc = %format.fourcc,
        "V4L2 format configured"
    );

    let stream = MmapStream::with_buffers(&dev, Type::VideoCapture, V4L2_BUFFER_COUNT)?;

    Ok(V4l2Capture {
        stream,
        format,
        sender,
        frame_count: 0,
        consecutive_errors: 0,
    })
}

/// Convert one raw buffer according to the negotiated format
fn convert_frame(buf: &[u8], format: &Format) -> Option<CameraFrame> {
    let (width, height) = (format.width, format.height);
    let fourcc = &format.fourcc.repr;

    let rgba = match fourcc {
        b"YUYV" => yuyv_to_rgba(buf, width, height, format.stride),
        b"UYVY" => uyvy_to_rgba(buf, width, height, format.stride),
        b"RGB3" => rgb_to_rgba(buf, width, height, format.stride),
        b"MJPG" => {
            return match mjpeg_to_frame(buf) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    debug!(error = %e, "Dropping corrupt MJPEG frame");
                    None
                }
            };
        }
        b"GREY" => {
            return Some(CameraFrame {
                width,
                height,
                data: Arc::from(buf),
                format: PixelFormat::Gray8,
                stride: format.stride.max(width),
                captured_at: Instant::now(),
            });
        }
        _ => return None,
    };

    Some(CameraFrame::from_rgba(width, height, rgba))
}

fn capture_step(capture: &mut V4l2Capture) -> LoopAction {
    let frame = match capture.stream.next() {
        Ok((buf, _meta)) => convert_frame(buf, &capture.format),
        Err(e) => return capture_failed(&mut capture.consecutive_errors, &e),
    };
    capture.consecutive_errors = 0;

    if let Some(frame) = frame {
        capture.frame_count += 1;
        if capture.frame_count == 1 {
            debug!(width = frame.width, height = frame.height, "First frame captured");
        }
        capture.sender.send_replace(Some(Arc::new(frame)));
    }
    LoopAction::Continue
}

/// Back off after a failed read; give up once the device keeps failing
///
/// Stopping drops the frame sender, which is how the scanner learns that the
/// device is gone.
fn capture_failed(consecutive_errors: &mut u32, error: &std::io::Error) -> LoopAction {
    *consecutive_errors += 1;
    if *consecutive_errors >= MAX_CAPTURE_ERRORS {
        warn!(error = %error, attempts = *consecutive_errors, "Device stopped delivering frames");
        return LoopAction::Stop;
    }
    debug!(error = %error, attempt = *consecutive_errors, "Failed to capture frame");
    std::thread::sleep(CAPTURE_RETRY_DELAY);
    LoopAction::Continue
}

impl MediaCaptureProvider for V4l2Provider {
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn CaptureStream>, AcquisitionError> {
        let devices = tokio::task::spawn_blocking(enumerate_blocking)
            .await
            .map_err(|e| AcquisitionError::Backend(e.to_string()))?;
        let device = select_device(&devices, constraints)?.clone();

        info!(device = %device.id, label = %device.label, "Opening V4L2 camera");

        let (sender, receiver) = frame_channel();
        let path = device.id.clone();
        let constraints = constraints.clone();
        let (controller, ready) = CaptureLoopController::spawn(
            "v4l2-capture",
            move || open_capture(&path, &constraints, sender),
            capture_step,
        );

        ready
            .await
            .map_err(|_| AcquisitionError::Backend("capture thread exited".to_string()))??;

        Ok(Box::new(V4l2Stream {
            device,
            receiver,
            controller: Mutex::new(Some(controller)),
            live: AtomicBool::new(true),
        }))
    }

    async fn enumerate(&self) -> Result<Vec<CameraDevice>, AcquisitionError> {
        tokio::task::spawn_blocking(enumerate_blocking)
            .await
            .map_err(|e| AcquisitionError::Backend(e.to_string()))
    }
}

/// An open V4L2 stream
pub struct V4l2Stream {
    device: CameraDevice,
    receiver: FrameReceiver,
    controller: Mutex<Option<CaptureLoopController>>,
    live: AtomicBool,
}

impl CaptureStream for V4l2Stream {
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
        info!(device = %self.device.id, "V4L2 camera released");
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_grey_keeps_stride() {
        let mut format = Format::new(2, 2, FourCC::new(b"GREY"));
        format.stride = 4;
        let frame = convert_frame(&[10, 20, 0, 0, 30, 40, 0, 0], &format).unwrap();
        assert_eq!(frame.format, PixelFormat::Gray8);
        assert_eq!(frame.rgba_at(1, 1), [40, 40, 40, 255]);
    }

    #[test]
    fn test_persistent_read_errors_stop_capture() {
        let error = std::io::Error::from_raw_os_error(19);
        let mut consecutive = 0;
        for _ in 1..MAX_CAPTURE_ERRORS {
            assert_eq!(capture_failed(&mut consecutive, &error), LoopAction::Continue);
        }
        assert_eq!(capture_failed(&mut consecutive, &error), LoopAction::Stop);
        assert_eq!(consecutive, MAX_CAPTURE_ERRORS);
    }

    #[test]
    fn test_convert_rgb_honors_stride() {
        let mut format = Format::new(1, 2, FourCC::new(b"RGB3"));
        format.stride = 4;
        let frame = convert_frame(&[1, 2, 3, 0, 4, 5, 6, 0], &format).unwrap();
        assert_eq!(frame.rgba_at(0, 1), [4, 5, 6, 255]);
    }

    #[test]
    fn test_convert_unknown_fourcc() {
        let format = Format::new(2, 2, FourCC::new(b"H264"));
        assert!(convert_frame(&[0; 8], &format).is_none());
    }

    #[test]
    fn test_corrupt_mjpeg_is_dropped() {
        let format = Format::new(2, 2, FourCC::new(b"MJPG"));
        assert!(convert_frame(&[0xFF, 0xD8, 0x00], &format).is_none());
    }
}
