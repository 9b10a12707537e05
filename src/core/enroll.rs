use crate::camera::Frame;
use crate::common::{FaceGuardError, Result};
use crate::core::capture::CaptureState;
use crate::core::quality::GateFailure;
use crate::service::protocol::AnalysisRequest;
use crate::service::FaceAnalyzer;
use crate::storage::{Identity, IdentityStore};

#[derive(Debug, Clone)]
pub struct EnrollmentOutcome {
    pub identity: Identity,
    pub encoding_id: u64,
    pub message: String,
}

/// Name and capture-quality checks that must pass before any network call.
pub fn check_preconditions(name: &str, state: &CaptureState) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FaceGuardError::EmptyName);
    }

    if !state.ready_to_enroll {
        let failures = if state.failures.is_empty() {
            vec![GateFailure::FaceNotDetected]
        } else {
            state.failures.clone()
        };
        return Err(FaceGuardError::QualityGateNotMet(failures));
    }

    Ok(())
}

pub struct Enroller<'a> {
    analyzer: &'a dyn FaceAnalyzer,
    store: &'a dyn IdentityStore,
}

impl<'a> Enroller<'a> {
    pub fn new(analyzer: &'a dyn FaceAnalyzer, store: &'a dyn IdentityStore) -> Self {
        Self { analyzer, store }
    }

    /// Enroll `name` from a frame captured while `state` was current.
    ///
    /// Nothing is written unless the service returns an encoding. The
    /// identity is created first and the encoding attached to it; if the
    /// second write fails the identity is discarded again.
    pub fn enroll(&self, name: &str, frame: &Frame, state: &CaptureState) -> Result<EnrollmentOutcome> {
        check_preconditions(name, state)?;
        let name = name.trim();

        let response = self
            .analyzer
            .analyze_action(&AnalysisRequest::registration(frame.jpeg.clone(), name))?;

        if !response.face_detected || response.success == Some(false) {
            let message = response
                .message
                .unwrap_or_else(|| "No face detected in the image".to_string());
            tracing::info!("Enrollment for '{}' rejected by analysis service: {}", name, message);
            return Err(FaceGuardError::EnrollmentRejected(message));
        }

        let encoding = match response.encoding {
            Some(encoding) if !encoding.is_empty() => encoding,
            _ => {
                return Err(FaceGuardError::MalformedResponse(
                    "Registration response carried no encoding".to_string(),
                ))
            }
        };

        let identity = self.store.create_identity(name)?;
        let saved = match self.store.save_encoding(identity.id, &encoding, &frame.jpeg) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Saving encoding for identity {} failed, discarding it: {}", identity.id, e);
                if let Err(cleanup) = self.store.discard_identity(identity.id) {
                    tracing::error!(
                        "Identity {} left without an encoding; cleanup failed: {}",
                        identity.id, cleanup
                    );
                }
                return Err(e);
            }
        };

        tracing::info!("Enrolled '{}' as identity {} (encoding length {})",
                       identity.name, identity.id, saved.encoding.len());
        Ok(EnrollmentOutcome {
            message: format!("User '{}' registered successfully", identity.name),
            encoding_id: saved.id,
            identity,
        })
    }
}
