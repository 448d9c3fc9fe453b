// SPDX-License-Identifier: GPL-3.0-only

//! Scan orchestrator
//!
//! [`Scanner`] ties a [`MediaCaptureProvider`], a [`DecodeEngine`] and a
//! [`FrameSink`] together:
//!
//! 1. `start` acquires a stream, attaches it to the caller's surface and
//!    waits for the first frame.
//! 2. A loop task samples the surface, crops the target region, encodes the
//!    frame and submits it to the engine. The next sample is scheduled only
//!    after the previous decode resolved.
//! 3. Hits are normalized and handed to the result callback.
//!
//! Every `start`, `stop` and `switch_camera` bumps a generation number.
//! Async continuations compare the generation they captured with the
//! current one and give up when they have been overtaken.

mod scan_loop;
pub mod state;

pub use state::{OnError, OnResult, ScanState};

use crate::backends::camera::{CameraDevice, MediaCaptureProvider, MediaConstraints};
use crate::config::{ResolvedOptions, ScannerOptions};
use crate::errors::{FileDecodeError, ScannerError, ScannerResult};
use crate::frame_processor::{DecodeEngine, DecodeOutcome, ScanResult};
use crate::media::{FrameSink, RasterCanvas, StillImage, VideoSurface};
use chrono::Utc;
use scan_loop::ScanLoop;
use state::Session;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Camera capture-and-scan orchestrator
pub struct Scanner<P, E> {
    id: Uuid,
    provider: Arc<P>,
    engine: Arc<E>,
    options: ResolvedOptions,
    session: Arc<Mutex<Session>>,
    generation: watch::Sender<u64>,
}

impl<P, E> std::fmt::Debug for Scanner<P, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self
            .session
            .lock()
            .map(|session| session.state)
            .unwrap_or_default();
        f.debug_struct("Scanner")
            .field("id", &self.id)
            .field("state", &state)
            .field("generation", &*self.generation.borrow())
            .finish()
    }
}

impl<P, E> Scanner<P, E>
where
    P: MediaCaptureProvider,
    E: DecodeEngine,
{
    /// Create a scanner
    ///
    /// Options are validated against the engine's symbology table here;
    /// an unsupported format fails construction.
    pub fn new(provider: P, engine: E, options: ScannerOptions) -> ScannerResult<Self> {
        let options = options.resolve(engine.symbologies())?;
        let id = Uuid::new_v4();
        info!(scanner = %id, formats = ?options.formats(), "Scanner created");
        let (generation, _) = watch::channel(0);

        Ok(Self {
            id,
            provider: Arc::new(provider),
            engine: Arc::new(engine),
            options,
            session: Arc::new(Mutex::new(Session::new(Box::new(RasterCanvas::new())))),
            generation,
        })
    }

    /// Replace the rasterization buffer
    pub fn with_sink(self, sink: impl FrameSink + 'static) -> Self {
        self.lock().sink = Box::new(sink);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish the session's generation to waiting continuations
    fn publish_generation(&self, generation: u64) {
        self.generation.send_replace(generation);
    }

    /// Start scanning into `surface`
    ///
    /// Resolves once the stream is open, the surface is ready and the loop is
    /// running. Results and later errors arrive through the callbacks.
    ///
    /// # Errors
    /// * `AlreadyScanning` - A session is starting or scanning; nothing is touched
    /// * `Acquisition` - The provider refused the stream
    /// * `ReadinessTimeout` - No frame arrived in time; the stream is released
    /// * `Superseded` - `stop` or another start overtook this call
    pub async fn start(
        &self,
        surface: &VideoSurface,
        on_result: OnResult,
        on_error: Option<OnError>,
    ) -> ScannerResult<()> {
        let constraints = self.options.constraints().clone();
        self.start_with(constraints, surface, on_result, on_error).await
    }

    /// Restart on a specific device
    pub async fn switch_camera(
        &self,
        device_id: &str,
        surface: &VideoSurface,
        on_result: OnResult,
        on_error: Option<OnError>,
    ) -> ScannerResult<()> {
        info!(scanner = %self.id, device = %device_id, "Switching camera");
        self.stop();
        let constraints = self.options.constraints().with_device(device_id);
        self.start_with(constraints, surface, on_result, on_error).await
    }

    async fn start_with(
        &self,
        constraints: MediaConstraints,
        surface: &VideoSurface,
        on_result: OnResult,
        on_error: Option<OnError>,
    ) -> ScannerResult<()> {
        let (generation, previous, was_found) = {
            let mut session = self.lock();
            let was_found = match session.state {
                ScanState::Starting | ScanState::Scanning => {
                    return Err(ScannerError::AlreadyScanning);
                }
                ScanState::Found => true,
                ScanState::Idle => false,
            };
            let previous = session.invalidate();
            session.state = ScanState::Starting;
            self.publish_generation(session.generation);
            (session.generation, previous, was_found)
        };
        previous.release();
        if was_found {
            self.engine.reset();
        }

        info!(scanner = %self.id, generation, "Starting scanner");

        match self
            .open_session(generation, &constraints, surface, &on_result, &on_error)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                self.abort_start(generation);
                if err != ScannerError::Superseded
                    && let Some(on_error) = on_error
                {
                    on_error(err.clone());
                }
                Err(err)
            }
        }
    }

    /// Acquire, attach, wait for readiness, size the sink and spawn the loop
    async fn open_session(
        &self,
        generation: u64,
        constraints: &MediaConstraints,
        surface: &VideoSurface,
        on_result: &OnResult,
        on_error: &Option<OnError>,
    ) -> ScannerResult<()> {
        let stream = self.provider.acquire(constraints).await?;
        let device = stream.device().id.clone();

        {
            let mut session = self.lock();
            if session.generation != generation {
                drop(session);
                debug!(scanner = %self.id, generation, "Stream arrived after stop, releasing");
                stream.release();
                return Err(ScannerError::Superseded);
            }
            surface.attach(stream.frames());
            session.stream = Some(stream);
            session.surface = Some(surface.clone());
        }

        let mut generations = self.generation.subscribe();
        let (width, height) = tokio::select! {
            ready = surface.wait_ready(self.options.ready_timeout()) => ready?,
            _ = generations.wait_for(|g| *g != generation) => {
                return Err(ScannerError::Superseded);
            }
        };

        let mut session = self.lock();
        if session.generation != generation {
            return Err(ScannerError::Superseded);
        }
        surface.play();
        session.sink.resize(width, height);
        session.state = ScanState::Scanning;
        let scan_loop = self.scan_loop(generation, on_result.clone(), on_error.clone());
        session.task = Some(tokio::spawn(scan_loop.run()));

        info!(scanner = %self.id, device = %device, width, height, "Scanning started");
        Ok(())
    }

    /// Undo a failed start if no newer call owns the session
    fn abort_start(&self, generation: u64) {
        let teardown = {
            let mut session = self.lock();
            if session.generation != generation {
                return;
            }
            session.state = ScanState::Idle;
            session.take_resources()
        };
        teardown.release();
        warn!(scanner = %self.id, generation, "Scanner start failed");
    }

    fn scan_loop(
        &self,
        generation: u64,
        on_result: OnResult,
        on_error: Option<OnError>,
    ) -> ScanLoop<E> {
        ScanLoop {
            scanner: self.id,
            generation,
            engine: Arc::clone(&self.engine),
            options: self.options.clone(),
            session: Arc::clone(&self.session),
            generations: self.generation.subscribe(),
            on_result,
            on_error,
        }
    }

    /// Stop scanning and release the camera
    ///
    /// Idempotent. The stream is released before this returns; a decode that
    /// is still running completes but its result is dropped.
    pub fn stop(&self) {
        let teardown = {
            let mut session = self.lock();
            if session.state == ScanState::Idle {
                return;
            }
            let teardown = session.invalidate();
            self.publish_generation(session.generation);
            teardown
        };
        teardown.release();
        self.engine.reset();
        info!(scanner = %self.id, "Scanner stopped");
    }

    /// Decode a single image file
    ///
    /// Independent of the camera session; it may run while the loop does.
    pub async fn scan_image(&self, path: impl AsRef<Path>) -> ScannerResult<ScanResult> {
        let path = path.as_ref();
        debug!(scanner = %self.id, path = %path.display(), "Scanning image file");
        let bytes = tokio::fs::read(path).await.map_err(FileDecodeError::from)?;
        self.scan_image_bytes(bytes).await
    }

    /// Decode a single encoded image held in memory
    pub async fn scan_image_bytes(&self, bytes: Vec<u8>) -> ScannerResult<ScanResult> {
        image::guess_format(&bytes).map_err(|e| FileDecodeError::Unreadable(e.to_string()))?;

        let outcome = self
            .engine
            .decode(
                StillImage::from_encoded(bytes),
                self.options.formats(),
                self.options.hints(),
            )
            .await;

        match outcome {
            DecodeOutcome::Found(code) => Ok(ScanResult::new(
                code,
                self.options.auto_normalize(),
                Utc::now(),
            )),
            DecodeOutcome::NotFound => Err(FileDecodeError::NoCodeFound.into()),
            DecodeOutcome::EngineError(reason) => Err(FileDecodeError::Engine(reason).into()),
        }
    }

    /// Enumerate cameras; a failed enumeration yields an empty list
    pub async fn list_cameras(&self) -> Vec<CameraDevice> {
        match self.provider.enumerate().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(scanner = %self.id, error = %e, "Camera enumeration failed");
                Vec::new()
            }
        }
    }

    /// True only while frames are being sampled
    pub fn is_scanning(&self) -> bool {
        self.state() == ScanState::Scanning
    }

    pub fn state(&self) -> ScanState {
        self.lock().state
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Shared decode engine
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }
}

impl<P, E> Drop for Scanner<P, E> {
    fn drop(&mut self) {
        let teardown = {
            let mut session = self
                .session
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let teardown = session.invalidate();
            self.generation.send_replace(session.generation);
            teardown
        };
        teardown.release();
    }
}
