use crate::camera::Frame;
use crate::common::{FaceGuardError, Result};
use crate::core::enroll::Enroller;
use crate::core::verify::{VerificationOutcome, Verifier};
use crate::service::protocol::{
    AnalysisReply, EncodingPage, EnrollRequest, EnrollResponse, Request, Response, VerifyRequest,
    VerifyResponse,
};
use crate::service::wire::{self, WireError};
use crate::service::FaceAnalyzer;
use crate::storage::{EncodingRecord, IdentityStore};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Duration;

/// Largest gallery page the gateway hands out in one response.
pub const MAX_GALLERY_PAGE: u32 = 64;

/// Server side of the faceguard socket. Each request is handled on its own;
/// the store is the only state shared between them.
pub struct Gateway {
    analyzer: Arc<dyn FaceAnalyzer>,
    store: Arc<dyn IdentityStore>,
}

impl Gateway {
    pub fn new(analyzer: Arc<dyn FaceAnalyzer>, store: Arc<dyn IdentityStore>) -> Self {
        Self { analyzer, store }
    }

    pub fn serve_connection(&self, mut stream: UnixStream, timeout: Duration) -> Result<()> {
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let response = match wire::receive::<_, Request>(&mut stream) {
            Ok(request) => self.handle(request),
            Err(WireError::Io(e)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Rejecting unreadable request: {}", e);
                Response::Error("Malformed request".to_string())
            }
        };

        match wire::send(&mut stream, &response) {
            // Nothing was written yet, so the client can still get an answer
            Err(WireError::TooLarge(size)) => {
                tracing::warn!("Response of {} bytes exceeds the frame limit", size);
                let reply = Response::Error(format!("Response too large to send ({} bytes)", size));
                wire::send(&mut stream, &reply).map_err(send_failure)
            }
            sent => sent.map_err(send_failure),
        }
    }

    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::Analyze(analysis) => match self.analyzer.analyze(&analysis) {
                Ok(response) => Response::Analysis(AnalysisReply::Ok(response)),
                Err(FaceGuardError::Service { error, details }) => {
                    Response::Analysis(AnalysisReply::Failed { error, details })
                }
                Err(e) => failure("Analysis", e),
            },
            Request::Enroll(enroll) => {
                tracing::info!("Processing enrollment request for: {}", enroll.name);
                match self.handle_enroll(enroll) {
                    Ok(response) => Response::Enroll(response),
                    Err(e) => failure("Enrollment", e),
                }
            }
            Request::Verify(verify) => {
                tracing::info!("Processing verification request");
                match self.handle_verify(verify) {
                    Ok(response) => Response::Verify(response),
                    Err(e) => failure("Verification", e),
                }
            }
            Request::ListEncodings { offset, limit } => match self.store.list_all_encodings() {
                Ok(records) => Response::Encodings(page_of(records, offset, limit)),
                Err(e) => failure("Listing encodings", e),
            },
            Request::Profile { identity_id } => match self.store.identity_profile(identity_id) {
                Ok(profile) => Response::Profile(profile),
                Err(e) => failure("Profile lookup", e),
            },
        }
    }

    fn handle_enroll(&self, request: EnrollRequest) -> Result<EnrollResponse> {
        let frame = decode_frame(&request.image)?;
        let enroller = Enroller::new(self.analyzer.as_ref(), self.store.as_ref());

        // Re-validates the client's gate snapshot before anything else
        match enroller.enroll(&request.name, &frame, &request.capture_state) {
            Ok(outcome) => Ok(EnrollResponse {
                success: true,
                message: outcome.message,
                identity_id: Some(outcome.identity.id),
            }),
            Err(
                e @ (FaceGuardError::EmptyName
                | FaceGuardError::QualityGateNotMet(_)
                | FaceGuardError::EnrollmentRejected(_)),
            ) => Ok(EnrollResponse {
                success: false,
                message: rejection_message(e),
                identity_id: None,
            }),
            Err(e) => Err(e),
        }
    }

    fn handle_verify(&self, request: VerifyRequest) -> Result<VerifyResponse> {
        let frame = decode_frame(&request.image)?;
        let verifier = Verifier::new(self.analyzer.as_ref(), self.store.as_ref());

        Ok(match verifier.verify(&frame)? {
            VerificationOutcome::Verified { user, message, .. } => VerifyResponse {
                success: true,
                message,
                matched_user: Some(user),
            },
            VerificationOutcome::Rejected { message, .. } => VerifyResponse {
                success: false,
                message,
                matched_user: None,
            },
        })
    }
}

fn page_of(records: Vec<EncodingRecord>, offset: u64, limit: u32) -> EncodingPage {
    let total = records.len() as u64;
    let limit = limit.clamp(1, MAX_GALLERY_PAGE) as usize;
    let records = records
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit)
        .collect();
    EncodingPage { records, total }
}

fn send_failure(err: WireError) -> FaceGuardError {
    match err {
        WireError::Io(io) => FaceGuardError::Io(io),
        other => FaceGuardError::Other(anyhow::anyhow!(other.to_string())),
    }
}

fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    Frame::decode(bytes).map_err(|e| {
        tracing::debug!("Frame decode failed: {}", e);
        FaceGuardError::InvalidImage
    })
}

fn rejection_message(err: FaceGuardError) -> String {
    match err {
        FaceGuardError::EnrollmentRejected(message) => message,
        other => other.to_string(),
    }
}

/// Only the display string crosses the socket.
fn failure(context: &str, err: FaceGuardError) -> Response {
    match err {
        FaceGuardError::ServiceUnreachable(reason) => {
            tracing::error!("{} failed, analysis service unreachable: {}", context, reason);
            Response::Unavailable("Face analysis service is unavailable".to_string())
        }
        FaceGuardError::EnrollmentRejected(message) => Response::Error(message),
        e @ FaceGuardError::InvalidImage => Response::Error(e.to_string()),
        other => {
            tracing::error!("{} failed: {}", context, other);
            Response::Error(format!("{} failed: {}", context, other))
        }
    }
}
