#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use faceguard::camera::Frame;
use faceguard::protocol::{AnalysisRequest, AnalysisResponse, MatchedUser};
use faceguard::storage::{
    EncodingRecord, FaceEncoding, FileStore, Identity, IdentityProfile, IdentityStore, LoginAttempt,
};
use faceguard::{
    CaptureState, FaceAnalyzer, FaceGuardError, FacePosition, FrameSource, QualityAttributes, Result,
};
use image::{DynamicImage, Rgb, RgbImage};

/// What the stub analyzer answers with.
#[derive(Clone)]
pub enum Reply {
    Ok(AnalysisResponse),
    Unreachable,
    Timeout,
}

impl Reply {
    fn into_result(self) -> Result<AnalysisResponse> {
        match self {
            Reply::Ok(response) => Ok(response),
            Reply::Unreachable => Err(FaceGuardError::ServiceUnreachable("connection refused".into())),
            Reply::Timeout => Err(FaceGuardError::ServiceTimeout(Duration::from_millis(5000))),
        }
    }
}

/// Answers scripted replies in order, then the fallback forever.
pub struct StubAnalyzer {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    delay: Duration,
    calls: AtomicUsize,
    registrations: AtomicUsize,
}

impl StubAnalyzer {
    pub fn always(reply: Reply) -> Self {
        Self::scripted(Vec::new(), reply)
    }

    pub fn scripted(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            registrations: AtomicUsize::new(0),
        }
    }

    /// Hold every answer back for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

impl FaceAnalyzer for StubAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.is_registration {
            self.registrations.fetch_add(1, Ordering::SeqCst);
        }
        let next = self.script.lock().unwrap().pop_front();
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        next.unwrap_or_else(|| self.fallback.clone()).into_result()
    }
}

pub struct StubCamera {
    active: AtomicBool,
    frame: Frame,
}

impl StubCamera {
    pub fn active() -> Self {
        Self {
            active: AtomicBool::new(true),
            frame: sample_frame(),
        }
    }

    pub fn inactive() -> Self {
        let camera = Self::active();
        camera.active.store(false, Ordering::SeqCst);
        camera
    }
}

impl FrameSource for StubCamera {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn capture_still(&self) -> Result<Frame> {
        Ok(self.frame.clone())
    }
}

/// Delegates to a real store but refuses every encoding write.
pub struct FailingEncodingStore {
    pub inner: FileStore,
    discards: AtomicUsize,
}

impl FailingEncodingStore {
    pub fn new(inner: FileStore) -> Self {
        Self {
            inner,
            discards: AtomicUsize::new(0),
        }
    }

    pub fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }
}

impl IdentityStore for FailingEncodingStore {
    fn create_identity(&self, name: &str) -> Result<Identity> {
        self.inner.create_identity(name)
    }

    fn save_encoding(&self, _identity_id: u64, _encoding: &[f32], _profile_picture: &[u8]) -> Result<FaceEncoding> {
        Err(FaceGuardError::Storage("disk full".into()))
    }

    fn list_all_encodings(&self) -> Result<Vec<EncodingRecord>> {
        self.inner.list_all_encodings()
    }

    fn log_login_attempt(&self, identity_id: u64, success: bool, confidence: f32) -> Result<LoginAttempt> {
        self.inner.log_login_attempt(identity_id, success, confidence)
    }

    fn discard_identity(&self, identity_id: u64) -> Result<()> {
        self.discards.fetch_add(1, Ordering::SeqCst);
        self.inner.discard_identity(identity_id)
    }

    fn identity_profile(&self, identity_id: u64) -> Result<IdentityProfile> {
        self.inner.identity_profile(identity_id)
    }
}

pub fn sample_frame() -> Frame {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([128, 120, 110])));
    Frame::from_image(&image).unwrap()
}

pub fn good_quality() -> QualityAttributes {
    QualityAttributes {
        eyes_open: true,
        is_smiling: true,
        is_well_lit: true,
        is_ideal_lighting: true,
    }
}

/// A single centered face that passes every gate, carrying an encoding so
/// the same reply also serves registration.
pub fn centered_face() -> AnalysisResponse {
    AnalysisResponse {
        face_detected: true,
        face_count: Some(1),
        face_position: Some(FacePosition { x: 0.0, y: 0.0, scale: 1.0 }),
        face_quality: Some(good_quality()),
        success: Some(true),
        encoding: Some(vec![0.25; 128]),
        ..Default::default()
    }
}

pub fn matched(id: u64, name: &str, confidence: f32, success: bool) -> AnalysisResponse {
    AnalysisResponse {
        face_detected: true,
        face_count: Some(1),
        success: Some(success),
        matched_user: Some(MatchedUser {
            id,
            name: name.to_string(),
            profile_picture: vec![0xff, 0xd8],
            confidence,
        }),
        ..Default::default()
    }
}

pub fn ready_state() -> CaptureState {
    CaptureState {
        face_detected: true,
        face_count: 1,
        face_position: Some(FacePosition { x: 0.0, y: 0.0, scale: 1.0 }),
        quality: Some(good_quality()),
        is_centered: true,
        ready_to_enroll: true,
        failures: Vec::new(),
        message: "Ready to enroll".to_string(),
    }
}

pub fn temp_store() -> (FileStore, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::open(tmp.path()).unwrap();
    (store, tmp)
}

/// Poll `condition` until it holds or two seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
