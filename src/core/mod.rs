pub mod capture;
pub mod enroll;
pub mod quality;
pub mod verify;

pub use capture::{CaptureLoop, CapturePhase, CaptureSettings, CaptureState};
pub use enroll::{check_preconditions, Enroller, EnrollmentOutcome};
pub use quality::{evaluate, CenteringThresholds, FacePosition, GateEvaluation, GateFailure, QualityAttributes};
pub use verify::{VerificationOutcome, Verifier};
