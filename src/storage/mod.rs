pub mod identity_store;

pub use identity_store::FileStore;

use crate::common::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FaceEncoding {
    pub id: u64,
    pub identity_id: u64,
    pub encoding: Vec<f32>,
    pub profile_picture: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoginAttempt {
    pub id: u64,
    pub identity_id: u64,
    pub success: bool,
    pub confidence: f32,
    pub occurred_at: DateTime<Utc>,
}

/// One gallery entry as handed to the matcher.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EncodingRecord {
    pub identity_id: u64,
    pub name: String,
    pub encoding: Vec<f32>,
    pub profile_picture: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    pub identity: Identity,
    pub profile_picture: Option<Vec<u8>>,
    pub total_logins: u64,
    pub successful_logins: u64,
}

/// Durable storage for identities, their encodings and the login audit log.
/// Every method is one atomic unit against the store.
pub trait IdentityStore: Send + Sync {
    fn create_identity(&self, name: &str) -> Result<Identity>;

    /// Fails with `IdentityNotFound` unless the identity is already committed.
    fn save_encoding(&self, identity_id: u64, encoding: &[f32], profile_picture: &[u8]) -> Result<FaceEncoding>;

    /// Newest encodings first.
    fn list_all_encodings(&self) -> Result<Vec<EncodingRecord>>;

    /// Appends to the audit log; a successful attempt also stamps the
    /// identity's last login in the same write.
    fn log_login_attempt(&self, identity_id: u64, success: bool, confidence: f32) -> Result<LoginAttempt>;

    /// Removes an identity and its encodings. Only used to undo a half-finished enrollment.
    fn discard_identity(&self, identity_id: u64) -> Result<()>;

    fn identity_profile(&self, identity_id: u64) -> Result<IdentityProfile>;
}
