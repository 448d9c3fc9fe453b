// SPDX-License-Identifier: GPL-3.0-only

//! Capture surface
//!
//! The surface is what a caller hands to `Scanner::start`: a stream gets
//! attached to it, it reports intrinsic dimensions once frames flow, and a
//! UI can read [`VideoSurface::current_frame`] to render a preview.

use crate::backends::camera::types::{CameraFrame, FrameReceiver};
use crate::errors::{AcquisitionError, ScannerError, ScannerResult};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default)]
struct SurfaceState {
    source: Option<FrameReceiver>,
    playing: bool,
}

/// Drawable target a camera stream is attached to
///
/// Cheap to clone; clones share the same attachment.
#[derive(Debug, Clone, Default)]
pub struct VideoSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Attach a stream's frames; playback starts paused
    pub fn attach(&self, frames: FrameReceiver) {
        let mut state = self.lock();
        state.source = Some(frames);
        state.playing = false;
    }

    /// Drop the current stream, if any
    pub fn detach(&self) {
        let mut state = self.lock();
        if state.source.take().is_some() {
            debug!("Surface detached");
        }
        state.playing = false;
    }

    pub fn is_attached(&self) -> bool {
        self.lock().source.is_some()
    }

    /// Begin playback of the attached stream
    pub fn play(&self) {
        let mut state = self.lock();
        state.playing = state.source.is_some();
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Intrinsic size of the attached video, once known
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let state = self.lock();
        let frame = state.source.as_ref()?.borrow().clone()?;
        Some((frame.width, frame.height))
    }

    /// Latest frame while playing
    pub fn current_frame(&self) -> Option<Arc<CameraFrame>> {
        let state = self.lock();
        if !state.playing {
            return None;
        }
        state.source.as_ref()?.borrow().clone()
    }

    /// True once the attached stream's producer has gone away
    ///
    /// The last frame stays readable through [`current_frame`](Self::current_frame)
    /// after that, so samplers must check this to avoid decoding it forever.
    pub fn source_ended(&self) -> bool {
        self.lock()
            .source
            .as_ref()
            .is_some_and(|source| source.has_changed().is_err())
    }

    /// Wait until the attached stream reports its dimensions
    ///
    /// # Returns
    /// * `Ok((width, height))` - First frame arrived
    /// * `Err(ScannerError::ReadinessTimeout)` - Nothing arrived within `timeout`
    /// * `Err(ScannerError::Acquisition)` - Not attached, or the stream ended
    pub async fn wait_ready(&self, timeout: Duration) -> ScannerResult<(u32, u32)> {
        let mut frames = self
            .lock()
            .source
            .clone()
            .ok_or_else(|| AcquisitionError::Backend("no stream attached".to_string()))?;

        let ready = tokio::time::timeout(timeout, async {
            let frame = frames.wait_for(|f| f.is_some()).await.ok()?;
            frame.as_ref().map(|f| (f.width, f.height))
        })
        .await;

        match ready {
            Ok(Some(dimensions)) => Ok(dimensions),
            Ok(None) => Err(AcquisitionError::StreamEnded.into()),
            Err(_) => Err(ScannerError::ReadinessTimeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::frame_channel;

    #[tokio::test]
    async fn test_ready_after_first_frame() {
        let surface = VideoSurface::new();
        let (tx, rx) = frame_channel();
        surface.attach(rx);
        assert_eq!(surface.dimensions(), None);

        tx.send_replace(Some(Arc::new(CameraFrame::from_rgba(8, 6, vec![0; 8 * 6 * 4]))));

        let dims = surface.wait_ready(Duration::from_secs(1)).await.unwrap();
        assert_eq!(dims, (8, 6));
        assert_eq!(surface.dimensions(), Some((8, 6)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_times_out() {
        let surface = VideoSurface::new();
        let (_tx, rx) = frame_channel();
        surface.attach(rx);

        let err = surface.wait_ready(Duration::from_secs(10)).await.unwrap_err();
        assert_eq!(err, ScannerError::ReadinessTimeout);
    }

    #[tokio::test]
    async fn test_closed_stream_is_not_a_timeout() {
        let surface = VideoSurface::new();
        let (tx, rx) = frame_channel();
        surface.attach(rx);
        drop(tx);

        let err = surface.wait_ready(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, ScannerError::Acquisition(AcquisitionError::StreamEnded));
    }

    #[test]
    fn test_ended_source_keeps_last_frame() {
        let surface = VideoSurface::new();
        assert!(!surface.source_ended());

        let (tx, rx) = frame_channel();
        surface.attach(rx);
        surface.play();
        tx.send_replace(Some(Arc::new(CameraFrame::from_rgba(1, 1, vec![0; 4]))));
        assert!(!surface.source_ended());

        drop(tx);
        assert!(surface.source_ended());
        assert!(surface.current_frame().is_some());
    }

    #[test]
    fn test_frames_hidden_until_playing() {
        let surface = VideoSurface::new();
        let (tx, rx) = frame_channel();
        surface.attach(rx);
        tx.send_replace(Some(Arc::new(CameraFrame::from_rgba(1, 1, vec![0; 4]))));

        assert!(surface.current_frame().is_none());
        surface.play();
        assert!(surface.current_frame().is_some());

        surface.detach();
        assert!(!surface.is_playing());
        assert!(surface.current_frame().is_none());
    }
}
