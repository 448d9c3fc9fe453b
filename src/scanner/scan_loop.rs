// SPDX-License-Identifier: GPL-3.0-only

//! Sampling loop for one scan session
//!
//! One task per session. Each iteration samples the surface, rasterizes the
//! target region, awaits the decode and only then sleeps, so there is never
//! more than one decode in flight.

use super::state::{OnError, OnResult, ScanState, Session};
use crate::config::ResolvedOptions;
use crate::errors::{AcquisitionError, ScannerError};
use crate::frame_processor::{DecodeEngine, DecodeOutcome, ScanResult};
use crate::media::{PixelRect, StillImage};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// What one sampling step produced
enum Sample {
    /// Encoded frame and its capture time
    Image(StillImage, Instant),
    /// Surface has nothing to show yet
    Empty,
    /// Rasterization failed for this frame
    Failed(ScannerError),
    /// The stream's producer is gone; no new frames will arrive
    Ended,
    /// The session moved on without this loop
    Stale,
}

pub(crate) struct ScanLoop<E> {
    pub scanner: Uuid,
    pub generation: u64,
    pub engine: Arc<E>,
    pub options: ResolvedOptions,
    pub session: Arc<Mutex<Session>>,
    pub generations: watch::Receiver<u64>,
    pub on_result: OnResult,
    pub on_error: Option<OnError>,
}

impl<E: DecodeEngine> ScanLoop<E> {
    pub async fn run(mut self) {
        let mut engine_errors = 0u32;
        debug!(scanner = %self.scanner, generation = self.generation, "Scan loop started");

        loop {
            match self.sample() {
                Sample::Image(image, captured_at) => {
                    let outcome = self
                        .engine
                        .decode(image, self.options.formats(), self.options.hints())
                        .await;

                    if self.is_stale() {
                        debug!(scanner = %self.scanner, "Discarding decode from stopped session");
                        return;
                    }

                    match outcome {
                        DecodeOutcome::Found(code) => {
                            engine_errors = 0;
                            let result = ScanResult::new(
                                code,
                                self.options.auto_normalize(),
                                capture_time(captured_at),
                            );
                            info!(
                                scanner = %self.scanner,
                                format = %result.format(),
                                normalized = result.was_normalized(),
                                "Code found"
                            );

                            if self.options.continuous() {
                                (self.on_result)(result);
                            } else {
                                if !self.finish() {
                                    return;
                                }
                                (self.on_result)(result);
                                return;
                            }
                        }
                        DecodeOutcome::NotFound => {
                            engine_errors = 0;
                            trace!(scanner = %self.scanner, "No code in frame");
                        }
                        DecodeOutcome::EngineError(reason) => {
                            engine_errors += 1;
                            warn!(
                                scanner = %self.scanner,
                                consecutive = engine_errors,
                                reason = %reason,
                                "Decode engine error"
                            );
                            if engine_errors >= self.options.max_engine_errors() {
                                engine_errors = 0;
                                self.report(ScannerError::Engine(reason));
                            }
                        }
                    }
                }
                Sample::Empty => trace!(scanner = %self.scanner, "No frame to sample yet"),
                Sample::Failed(e) => {
                    warn!(scanner = %self.scanner, error = %e, "Frame sampling failed")
                }
                Sample::Ended => {
                    if self.end_session() {
                        warn!(scanner = %self.scanner, "Camera stream ended while scanning");
                        self.report(AcquisitionError::StreamEnded.into());
                    }
                    return;
                }
                Sample::Stale => return,
            }

            let generation = self.generation;
            tokio::select! {
                _ = tokio::time::sleep(self.options.interval()) => {}
                _ = self.generations.wait_for(|g| *g != generation) => {
                    debug!(scanner = %self.scanner, "Scan loop cancelled");
                    return;
                }
            }
        }
    }

    fn is_stale(&self) -> bool {
        *self.generations.borrow() != self.generation
    }

    /// Rasterize the current frame under the session lock
    fn sample(&self) -> Sample {
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if session.generation != self.generation || session.state != ScanState::Scanning {
            return Sample::Stale;
        }

        if session.surface.as_ref().is_some_and(|s| s.source_ended()) {
            return Sample::Ended;
        }

        let Some(frame) = session.surface.as_ref().and_then(|s| s.current_frame()) else {
            return Sample::Empty;
        };

        let src = match self.options.target_region() {
            Some(region) => region.crop_rect(frame.width, frame.height),
            None => PixelRect::full(frame.width, frame.height),
        };
        session.sink.resize(src.width, src.height);
        session.sink.draw(&frame, src);

        match session.sink.encode() {
            Ok(image) => Sample::Image(image, frame.captured_at),
            Err(e) => Sample::Failed(e),
        }
    }

    /// Move the session to `Found`; false if it was stopped meanwhile
    fn finish(&self) -> bool {
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if session.generation != self.generation || session.state != ScanState::Scanning {
            return false;
        }
        session.state = ScanState::Found;
        session.task = None;
        true
    }

    /// Go idle after the stream died; false if the session moved on already
    fn end_session(&self) -> bool {
        let teardown = {
            let mut session = self
                .session
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if session.generation != self.generation || session.state != ScanState::Scanning {
                return false;
            }
            session.state = ScanState::Idle;
            session.take_resources()
        };
        teardown.release();
        self.engine.reset();
        true
    }

    fn report(&self, err: ScannerError) {
        if let Some(on_error) = &self.on_error {
            on_error(err);
        }
    }
}

/// Wall clock time at which a frame was captured
fn capture_time(captured_at: Instant) -> DateTime<Utc> {
    let age = TimeDelta::from_std(captured_at.elapsed()).unwrap_or(TimeDelta::zero());
    Utc::now() - age
}
