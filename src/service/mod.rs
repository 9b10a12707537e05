pub mod analysis;
pub mod client;
pub mod gateway;
pub mod protocol;
pub mod transport;
pub mod wire;

pub use analysis::AnalysisClient;
pub use client::ServiceClient;
pub use gateway::Gateway;
pub use transport::{ConfiguredEndpoint, EndpointResolver, EnvEndpoint};

use crate::common::Result;
use protocol::{AnalysisRequest, AnalysisResponse};

/// The face analysis capability: detection, quality, encoding and matching
/// all happen behind this call.
pub trait FaceAnalyzer: Send + Sync {
    /// One sampling cycle's worth of analysis.
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse>;

    /// Analysis on behalf of an enroll or verify action. These compute
    /// encodings, so implementations may allow them longer than a cycle.
    fn analyze_action(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        self.analyze(request)
    }
}
