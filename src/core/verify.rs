use crate::camera::Frame;
use crate::common::Result;
use crate::service::protocol::{AnalysisRequest, MatchedUser};
use crate::service::FaceAnalyzer;
use crate::storage::{IdentityStore, LoginAttempt};

#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    Verified {
        user: MatchedUser,
        attempt: LoginAttempt,
        message: String,
    },
    Rejected {
        message: String,
        /// Set when a candidate identity was named but did not pass.
        attempt: Option<LoginAttempt>,
    },
}

impl VerificationOutcome {
    pub fn message(&self) -> &str {
        match self {
            VerificationOutcome::Verified { message, .. } => message,
            VerificationOutcome::Rejected { message, .. } => message,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }
}

/// Records the outcome of a match decided by the analysis service. It never
/// compares encodings itself.
pub struct Verifier<'a> {
    analyzer: &'a dyn FaceAnalyzer,
    store: &'a dyn IdentityStore,
}

impl<'a> Verifier<'a> {
    pub fn new(analyzer: &'a dyn FaceAnalyzer, store: &'a dyn IdentityStore) -> Self {
        Self { analyzer, store }
    }

    pub fn verify(&self, frame: &Frame) -> Result<VerificationOutcome> {
        let response = self
            .analyzer
            .analyze_action(&AnalysisRequest::detect(frame.jpeg.clone()))?;

        let Some(user) = response.matched_user else {
            // No face, or nobody close enough to be a candidate: nothing to log
            let message = response.message.unwrap_or_else(|| {
                if response.face_detected {
                    "Face not recognized".to_string()
                } else {
                    "No face detected in the image".to_string()
                }
            });
            tracing::info!("Verification rejected without candidate: {}", message);
            return Ok(VerificationOutcome::Rejected { message, attempt: None });
        };

        // A named candidate is a match unless the service says otherwise
        let success = response.success.unwrap_or(true);
        let attempt = self.store.log_login_attempt(user.id, success, user.confidence)?;

        if success {
            tracing::info!("Verified identity {} ('{}') with confidence {:.2}",
                           user.id, user.name, user.confidence);
            Ok(VerificationOutcome::Verified {
                message: format!("Welcome back, {}!", user.name),
                user,
                attempt,
            })
        } else {
            tracing::info!("Candidate identity {} rejected with confidence {:.2}",
                           user.id, user.confidence);
            Ok(VerificationOutcome::Rejected {
                message: response
                    .message
                    .unwrap_or_else(|| "Face not recognized".to_string()),
                attempt: Some(attempt),
            })
        }
    }
}
