// SPDX-License-Identifier: GPL-3.0-only

//! Scanner lifecycle state and the per-instance session

use crate::backends::camera::CaptureStream;
use crate::errors::ScannerError;
use crate::frame_processor::ScanResult;
use crate::media::{FrameSink, VideoSurface};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Callback invoked with each scan result
pub type OnResult = Arc<dyn Fn(ScanResult) + Send + Sync>;

/// Callback invoked with errors that happen away from the caller's `await`
pub type OnError = Arc<dyn Fn(ScannerError) + Send + Sync>;

/// Lifecycle of a scanner
///
/// ```text
/// Idle ──start──▶ Starting ──ready──▶ Scanning ──hit──▶ Found
///  ▲                 │                   │                │
///  ├──────error──────┘                   ├──────stop──────┘
///  └───────────────stream ended──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    /// Acquiring a stream and waiting for the surface
    Starting,
    /// Sampling frames and submitting them for decoding
    Scanning,
    /// A code was found; the stream stays open until `stop`
    Found,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::Starting => write!(f, "starting"),
            ScanState::Scanning => write!(f, "scanning"),
            ScanState::Found => write!(f, "found"),
        }
    }
}

/// Everything one scanner owns while a session is open
pub(crate) struct Session {
    pub state: ScanState,
    /// Bumped by every start, stop and switch
    pub generation: u64,
    pub stream: Option<Box<dyn CaptureStream>>,
    pub surface: Option<VideoSurface>,
    /// Rasterization buffer, reused across frames and sessions
    pub sink: Box<dyn FrameSink>,
    pub task: Option<JoinHandle<()>>,
}

/// Resources taken out of a session, released once the lock is dropped
pub(crate) struct Teardown {
    stream: Option<Box<dyn CaptureStream>>,
    surface: Option<VideoSurface>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(sink: Box<dyn FrameSink>) -> Self {
        Self {
            state: ScanState::Idle,
            generation: 0,
            stream: None,
            surface: None,
            sink,
            task: None,
        }
    }

    /// Move to a new generation and go idle, handing back what must be released
    pub fn invalidate(&mut self) -> Teardown {
        self.generation += 1;
        self.state = ScanState::Idle;
        self.take_resources()
    }

    /// Take the stream, surface and loop handle without touching the generation
    pub fn take_resources(&mut self) -> Teardown {
        Teardown {
            stream: self.stream.take(),
            surface: self.surface.take(),
            task: self.task.take(),
        }
    }
}

impl Teardown {
    /// Release the stream and detach the surface
    ///
    /// A running loop is left to notice the generation change on its own so
    /// that an in-flight decode finishes cleanly.
    pub fn release(self) {
        if let Some(stream) = self.stream {
            debug!(device = %stream.device().id, "Releasing camera stream");
            stream.release();
        }
        if let Some(surface) = self.surface {
            surface.detach();
        }
        drop(self.task);
    }
}
