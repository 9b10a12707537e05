use crate::camera::Frame;
use crate::common::{FaceGuardError, Result};
use crate::core::capture::CaptureState;
use crate::core::enroll::check_preconditions;
use crate::service::protocol::{
    AnalysisReply, AnalysisRequest, AnalysisResponse, EnrollRequest, EnrollResponse,
    Request, Response, VerifyRequest, VerifyResponse,
};
use crate::service::transport::{EndpointResolver, SocketTransport};
use crate::service::FaceAnalyzer;
use crate::storage::{EncodingRecord, IdentityProfile};
use std::time::Duration;

/// Eight full-size profile pictures stay well inside one frame.
const GALLERY_PAGE_SIZE: u32 = 8;

/// Client side of the faceguard service socket.
///
/// Sampling requests use the short analysis timeout; enroll and verify
/// use the longer request timeout since they include encoding work.
pub struct ServiceClient {
    sampling: SocketTransport,
    actions: SocketTransport,
}

impl ServiceClient {
    pub fn new<R>(resolver: R, analysis_timeout: Duration, request_timeout: Duration) -> Self
    where
        R: EndpointResolver + Clone + 'static,
    {
        Self {
            sampling: SocketTransport::new(resolver.clone(), analysis_timeout),
            actions: SocketTransport::new(resolver, request_timeout).with_connect_attempts(3),
        }
    }

    pub fn enroll(&self, name: &str, frame: &Frame, state: &CaptureState) -> Result<EnrollResponse> {
        // Reject locally before anything goes over the wire
        check_preconditions(name, state)?;

        let request = Request::Enroll(EnrollRequest {
            name: name.trim().to_string(),
            image: frame.jpeg.clone(),
            capture_state: state.clone(),
        });

        match self.actions.exchange(&request)? {
            Response::Enroll(enroll) => Ok(enroll),
            other => Err(unexpected(other)),
        }
    }

    pub fn verify(&self, frame: &Frame) -> Result<VerifyResponse> {
        let request = Request::Verify(VerifyRequest {
            image: frame.jpeg.clone(),
        });

        match self.actions.exchange(&request)? {
            Response::Verify(verify) => Ok(verify),
            other => Err(unexpected(other)),
        }
    }

    /// The whole gallery, fetched a page at a time.
    pub fn list_encodings(&self) -> Result<Vec<EncodingRecord>> {
        let mut records = Vec::new();
        loop {
            let request = Request::ListEncodings {
                offset: records.len() as u64,
                limit: GALLERY_PAGE_SIZE,
            };
            let page = match self.actions.exchange(&request)? {
                Response::Encodings(page) => page,
                other => return Err(unexpected(other)),
            };

            let received = page.records.len();
            records.extend(page.records);
            if received == 0 || records.len() as u64 >= page.total {
                return Ok(records);
            }
        }
    }

    pub fn profile(&self, identity_id: u64) -> Result<IdentityProfile> {
        match self.actions.exchange(&Request::Profile { identity_id })? {
            Response::Profile(profile) => Ok(profile),
            other => Err(unexpected(other)),
        }
    }
}

impl FaceAnalyzer for ServiceClient {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        match self.sampling.exchange(&Request::Analyze(request.clone()))? {
            Response::Analysis(AnalysisReply::Ok(response)) => Ok(response),
            Response::Analysis(AnalysisReply::Failed { error, details }) => {
                Err(FaceGuardError::Service { error, details })
            }
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> FaceGuardError {
    match response {
        Response::Unavailable(msg) => FaceGuardError::ServiceUnreachable(msg),
        Response::Error(msg) => FaceGuardError::Service {
            error: msg,
            details: String::new(),
        },
        _ => FaceGuardError::MalformedResponse("Unexpected response type".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::transport::ConfiguredEndpoint;
    use crate::service::wire;
    use std::os::unix::net::UnixListener;

    fn client_for(path: std::path::PathBuf) -> ServiceClient {
        ServiceClient::new(
            ConfiguredEndpoint(path),
            Duration::from_millis(1000),
            Duration::from_millis(1000),
        )
    }

    #[test]
    fn gate_is_checked_before_connecting() {
        // No socket exists, so reaching the network would be ServiceUnreachable
        let tmp = tempfile::tempdir().unwrap();
        let client = client_for(tmp.path().join("absent.sock"));
        let frame = Frame { jpeg: vec![1, 2, 3], width: 1, height: 1 };

        let err = client.enroll("Alice", &frame, &CaptureState::default()).unwrap_err();
        assert!(matches!(err, FaceGuardError::QualityGateNotMet(_)), "{:?}", err);

        let err = client.enroll("  ", &frame, &CaptureState::default()).unwrap_err();
        assert!(matches!(err, FaceGuardError::EmptyName));
    }

    #[test]
    fn unavailable_backend_maps_to_unreachable() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gateway.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request: Request = wire::receive(&mut stream).unwrap();
            assert!(matches!(request, Request::Analyze(_)));
            wire::send(&mut stream, &Response::Unavailable("analysis.sock: refused".into())).unwrap();
        });

        let err = client_for(path)
            .analyze(&AnalysisRequest::detect(vec![0u8; 4]))
            .unwrap_err();
        assert!(matches!(err, FaceGuardError::ServiceUnreachable(_)), "{:?}", err);
        server.join().unwrap();
    }
}
