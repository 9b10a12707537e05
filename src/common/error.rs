use crate::core::quality::GateFailure;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceGuardError {
    #[error("Face analysis service unreachable: {0}")]
    ServiceUnreachable(String),

    #[error("Face analysis timed out after {}ms", .0.as_millis())]
    ServiceTimeout(Duration),

    #[error("Malformed response from face analysis service: {0}")]
    MalformedResponse(String),

    #[error("Face analysis failed: {error}")]
    Service { error: String, details: String },

    #[error("Capture quality not met: {}", describe_failures(.0))]
    QualityGateNotMet(Vec<GateFailure>),

    #[error("Name is required")]
    EmptyName,

    #[error("Enrollment rejected: {0}")]
    EnrollmentRejected(String),

    #[error("Invalid image format")]
    InvalidImage,

    #[error("No active video source")]
    NoVideoSource,

    #[error("Identity not found: {0}")]
    IdentityNotFound(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl FaceGuardError {
    /// Failures the capture loop retries on its next cycle instead of pausing.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FaceGuardError::ServiceTimeout(_)
                | FaceGuardError::MalformedResponse(_)
                | FaceGuardError::Service { .. }
        )
    }
}

fn describe_failures(failures: &[GateFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

pub type Result<T> = std::result::Result<T, FaceGuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_failures_are_listed_in_message() {
        let err = FaceGuardError::QualityGateNotMet(vec![
            GateFailure::NotCentered,
            GateFailure::NotSmiling,
        ]);
        assert_eq!(
            err.to_string(),
            "Capture quality not met: Center your face in the frame | Please smile"
        );
    }

    #[test]
    fn unreachable_is_not_transient() {
        assert!(!FaceGuardError::ServiceUnreachable("refused".into()).is_transient());
        assert!(FaceGuardError::ServiceTimeout(Duration::from_secs(5)).is_transient());
    }
}
