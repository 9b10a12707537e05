use crate::common::{FaceGuardError, Result};
use crate::service::protocol::{AnalysisReply, AnalysisRequest, AnalysisResponse};
use crate::service::transport::{EndpointResolver, SocketTransport};
use crate::service::FaceAnalyzer;
use std::time::Duration;

/// Talks directly to the out-of-process face analysis service.
///
/// Sampling calls are bounded by the short analysis timeout. Registration
/// and verification compute encodings and get the request timeout.
pub struct AnalysisClient {
    sampling: SocketTransport,
    actions: SocketTransport,
}

impl AnalysisClient {
    pub fn new<R>(resolver: R, analysis_timeout: Duration, request_timeout: Duration) -> Self
    where
        R: EndpointResolver + Clone + 'static,
    {
        Self {
            sampling: SocketTransport::new(resolver.clone(), analysis_timeout),
            actions: SocketTransport::new(resolver, request_timeout),
        }
    }

    fn exchange(&self, transport: &SocketTransport, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let started = std::time::Instant::now();
        let reply: AnalysisReply = transport.exchange(request)?;
        tracing::debug!("Analysis round trip {:.1}ms (registration: {})",
                        started.elapsed().as_secs_f32() * 1000.0,
                        request.is_registration);

        match reply {
            AnalysisReply::Ok(response) => Ok(response),
            AnalysisReply::Failed { error, details } => {
                Err(FaceGuardError::Service { error, details })
            }
        }
    }
}

impl FaceAnalyzer for AnalysisClient {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        if request.is_registration {
            return self.exchange(&self.actions, request);
        }
        self.exchange(&self.sampling, request)
    }

    fn analyze_action(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        self.exchange(&self.actions, request)
    }
}
