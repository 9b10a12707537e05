use crate::camera::{Frame, FrameSource};
use crate::common::{FaceGuardError, Result};
use crate::core::quality::{
    evaluate, guidance, CenteringThresholds, FacePosition, GateFailure, QualityAttributes,
};
use crate::service::protocol::{AnalysisRequest, AnalysisResponse};
use crate::service::FaceAnalyzer;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Latest view of the live capture, replaced wholesale every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureState {
    pub face_detected: bool,
    pub face_count: u32,
    /// Last known position. Kept across cycles that find no face so the
    /// overlay does not jump; `is_centered` is never carried with it.
    pub face_position: Option<FacePosition>,
    pub quality: Option<QualityAttributes>,
    pub is_centered: bool,
    pub ready_to_enroll: bool,
    pub failures: Vec<GateFailure>,
    pub message: String,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self {
            face_detected: false,
            face_count: 0,
            face_position: None,
            quality: None,
            is_centered: false,
            ready_to_enroll: false,
            failures: vec![GateFailure::FaceNotDetected],
            message: "Waiting for camera".to_string(),
        }
    }
}

impl CaptureState {
    /// Build the next state from one analysis result.
    pub fn from_analysis(
        previous: &CaptureState,
        response: &AnalysisResponse,
        thresholds: &CenteringThresholds,
    ) -> Self {
        let face_count = response
            .face_count
            .unwrap_or(if response.face_detected { 1 } else { 0 });

        if !response.face_detected {
            return Self {
                face_position: previous.face_position,
                message: response
                    .message
                    .clone()
                    .unwrap_or_else(|| "No face detected".to_string()),
                ..Self::default()
            };
        }

        if face_count > 1 {
            return Self {
                face_detected: true,
                face_count,
                face_position: previous.face_position,
                message: "Multiple faces detected".to_string(),
                ..Self::default()
            };
        }

        match (response.face_position, response.face_quality) {
            (Some(position), Some(quality)) => {
                let evaluation = evaluate(&position, &quality, thresholds);
                let message = guidance(&evaluation, &quality);
                Self {
                    face_detected: true,
                    face_count,
                    face_position: Some(position),
                    quality: Some(quality),
                    is_centered: evaluation.is_centered,
                    ready_to_enroll: evaluation.ready_to_enroll,
                    failures: evaluation.failures,
                    message,
                }
            }
            // Face found but the service could not measure it
            (position, _) => Self {
                face_detected: true,
                face_count,
                face_position: position.or(previous.face_position),
                failures: vec![GateFailure::NotCentered],
                message: response
                    .message
                    .clone()
                    .unwrap_or_else(|| "Face detected but could not analyze features".to_string()),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Sampling,
    Paused,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub sample_period: Duration,
    pub thresholds: CenteringThresholds,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sample_period: Duration::from_millis(500),
            thresholds: CenteringThresholds::default(),
        }
    }
}

impl From<&crate::common::Config> for CaptureSettings {
    fn from(config: &crate::common::Config) -> Self {
        Self {
            sample_period: config.sample_period(),
            thresholds: config.thresholds(),
        }
    }
}

struct Shared {
    phase: Mutex<CapturePhase>,
    state: Mutex<CaptureState>,
    // Bumped on every start and stop; a worker whose generation is stale
    // must not touch the state.
    generation: AtomicU64,
}

impl Shared {
    fn phase(&self) -> MutexGuard<'_, CapturePhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The periodic trigger. Dropping the sender wakes the worker and ends it.
struct SamplingTimer {
    _cancel: mpsc::Sender<()>,
    _worker: JoinHandle<()>,
}

/// Drives periodic sampling of a video source through the face analyzer.
pub struct CaptureLoop {
    source: Arc<dyn FrameSource>,
    analyzer: Arc<dyn FaceAnalyzer>,
    settings: CaptureSettings,
    shared: Arc<Shared>,
    timer: Option<SamplingTimer>,
}

impl CaptureLoop {
    pub fn new(
        source: Arc<dyn FrameSource>,
        analyzer: Arc<dyn FaceAnalyzer>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            source,
            analyzer,
            settings,
            shared: Arc::new(Shared {
                phase: Mutex::new(CapturePhase::Idle),
                state: Mutex::new(CaptureState::default()),
                generation: AtomicU64::new(0),
            }),
            timer: None,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        *self.shared.phase()
    }

    pub fn state(&self) -> CaptureState {
        self.shared.state().clone()
    }

    /// Begin sampling. Calling it while already sampling replaces the timer.
    pub fn start(&mut self) -> Result<()> {
        if !self.source.is_active() {
            return Err(FaceGuardError::NoVideoSource);
        }

        self.release_timer();

        let generation = {
            let mut phase = self.shared.phase();
            *phase = CapturePhase::Sampling;
            self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let (cancel, cancelled) = mpsc::channel();
        let worker = Worker {
            shared: Arc::clone(&self.shared),
            source: Arc::clone(&self.source),
            analyzer: Arc::clone(&self.analyzer),
            settings: self.settings.clone(),
            generation,
        };
        let handle = thread::Builder::new()
            .name("faceguard-sampling".to_string())
            .spawn(move || worker.run(cancelled))?;

        self.timer = Some(SamplingTimer {
            _cancel: cancel,
            _worker: handle,
        });
        tracing::info!("Capture sampling started (every {}ms)", self.settings.sample_period.as_millis());
        Ok(())
    }

    /// Stop sampling. No further cycle is scheduled once this returns; a
    /// cycle already under way finishes and its result is dropped.
    pub fn stop(&mut self) {
        {
            let mut phase = self.shared.phase();
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            if *phase != CapturePhase::Idle {
                *phase = CapturePhase::Stopped;
            }
        }
        if self.release_timer() {
            tracing::info!("Capture sampling stopped");
        }
    }

    /// Run a user action on a fresh still frame with sampling suspended, so
    /// the action never races a sampling cycle. Sampling resumes afterwards
    /// whether the action succeeded or not.
    pub fn capture_for<T>(
        &mut self,
        action: impl FnOnce(Frame, CaptureState) -> Result<T>,
    ) -> Result<T> {
        let resume = self.phase() == CapturePhase::Sampling;
        self.stop();

        let snapshot = self.state();
        let result = self
            .source
            .capture_still()
            .and_then(|frame| action(frame, snapshot));

        if resume {
            if let Err(e) = self.start() {
                tracing::warn!("Failed to resume sampling: {}", e);
            }
        }
        result
    }

    fn release_timer(&mut self) -> bool {
        // Dropping the sender disconnects the worker's receiver
        self.timer.take().is_some()
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    shared: Arc<Shared>,
    source: Arc<dyn FrameSource>,
    analyzer: Arc<dyn FaceAnalyzer>,
    settings: CaptureSettings,
    generation: u64,
}

enum Cycle {
    Continue,
    Halt,
}

impl Worker {
    fn run(self, cancelled: mpsc::Receiver<()>) {
        loop {
            if let Cycle::Halt = self.sample_once() {
                break;
            }
            match cancelled.recv_timeout(self.settings.sample_period) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("Sampling worker {} exited", self.generation);
    }

    fn is_current(&self) -> bool {
        self.shared.generation.load(Ordering::SeqCst) == self.generation
    }

    fn sample_once(&self) -> Cycle {
        if !self.is_current() {
            return Cycle::Halt;
        }

        let outcome = self
            .source
            .capture_still()
            .and_then(|frame| self.analyzer.analyze(&AnalysisRequest::detect(frame.jpeg)));

        // Holding the phase lock orders this update against stop()
        let mut phase = self.shared.phase();
        if !self.is_current() || *phase != CapturePhase::Sampling {
            tracing::debug!("Discarding analysis result from stopped sampler");
            return Cycle::Halt;
        }

        let mut state = self.shared.state();
        match outcome {
            Ok(response) => {
                let next = CaptureState::from_analysis(&state, &response, &self.settings.thresholds);
                *state = next;
                tracing::debug!(
                    face_detected = state.face_detected,
                    centered = state.is_centered,
                    ready = state.ready_to_enroll,
                    "Sampling cycle complete"
                );
                Cycle::Continue
            }
            Err(e) if e.is_transient() => {
                // Keep the last good reading; only the status line changes
                tracing::warn!("Sampling cycle failed, retrying next cycle: {}", e);
                state.message = format!("{} (retrying)", e);
                Cycle::Continue
            }
            Err(e) => {
                tracing::warn!("Sampling paused: {}", e);
                *phase = CapturePhase::Paused;
                state.message = match e {
                    FaceGuardError::ServiceUnreachable(_) => {
                        "Face analysis service is unavailable. Restart the camera to try again.".to_string()
                    }
                    other => format!("{}. Restart the camera to try again.", other),
                };
                Cycle::Halt
            }
        }
    }
}
