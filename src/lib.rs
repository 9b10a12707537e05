// Core modules
pub mod core;
pub mod camera;
pub mod storage;
pub mod service;
pub mod common;

// Re-export commonly used types
pub use common::{Config, DevMode, FaceGuardError, Result};
pub use crate::core::{
    CaptureLoop, CapturePhase, CaptureSettings, CaptureState, CenteringThresholds, Enroller,
    FacePosition, GateFailure, QualityAttributes, VerificationOutcome, Verifier,
};
pub use camera::{Frame, FrameSource};
pub use storage::{FileStore, IdentityStore};
pub use service::{FaceAnalyzer, ServiceClient, protocol};
