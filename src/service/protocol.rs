use serde::{Serialize, Deserialize};
use crate::core::capture::CaptureState;
use crate::core::quality::{FacePosition, QualityAttributes};
use crate::storage::{EncodingRecord, IdentityProfile};

// Face analysis contract

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub image: Vec<u8>,
    pub is_registration: bool,
    pub name: Option<String>,
}

impl AnalysisRequest {
    /// Presence and quality only, used by the sampling loop and verification.
    pub fn detect(image: Vec<u8>) -> Self {
        Self { image, is_registration: false, name: None }
    }

    /// Asks the service to also compute the face encoding.
    pub fn registration(image: Vec<u8>, name: &str) -> Self {
        Self { image, is_registration: true, name: Some(name.to_string()) }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub face_detected: bool,
    pub face_count: Option<u32>,
    pub face_position: Option<FacePosition>,
    pub face_quality: Option<QualityAttributes>,
    pub message: Option<String>,
    pub success: Option<bool>,
    /// Present only for registration requests.
    pub encoding: Option<Vec<f32>>,
    /// Present only for verification requests that found a candidate.
    pub matched_user: Option<MatchedUser>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchedUser {
    pub id: u64,
    pub name: String,
    pub profile_picture: Vec<u8>,
    pub confidence: f32,
}

/// What the analysis service sends back on its socket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum AnalysisReply {
    Ok(AnalysisResponse),
    Failed { error: String, details: String },
}

// Gateway requests (CLI -> faceguard-service)

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Request {
    Analyze(AnalysisRequest),
    Enroll(EnrollRequest),
    Verify(VerifyRequest),
    /// One page of the gallery, newest first. Profile pictures make the
    /// whole gallery too big for a single frame.
    ListEncodings { offset: u64, limit: u32 },
    Profile { identity_id: u64 },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnrollRequest {
    pub name: String,
    pub image: Vec<u8>,
    /// Capture state at the moment the frame was taken.
    pub capture_state: CaptureState,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VerifyRequest {
    pub image: Vec<u8>,
}

// Gateway responses

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Response {
    Analysis(AnalysisReply),
    Enroll(EnrollResponse),
    Verify(VerifyResponse),
    Encodings(EncodingPage),
    Profile(IdentityProfile),
    /// The analysis service behind the gateway could not be reached.
    Unavailable(String),
    Error(String),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EncodingPage {
    pub records: Vec<EncodingRecord>,
    /// Size of the whole gallery when the page was cut.
    pub total: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EnrollResponse {
    pub success: bool,
    pub message: String,
    pub identity_id: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    pub matched_user: Option<MatchedUser>,
}
