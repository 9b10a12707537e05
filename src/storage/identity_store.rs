use crate::common::{Config, FaceGuardError, Result};
use crate::storage::{
    EncodingRecord, FaceEncoding, Identity, IdentityProfile, IdentityStore, LoginAttempt,
};
use chrono::Utc;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const STORAGE_VERSION: u32 = 1;
const STORE_FILE: &str = "faceguard.bincode";

#[derive(Serialize, Deserialize, Clone)]
struct StoreData {
    version: u32,
    next_identity_id: u64,
    next_encoding_id: u64,
    next_attempt_id: u64,
    identities: Vec<Identity>,
    encodings: Vec<FaceEncoding>,
    login_attempts: Vec<LoginAttempt>,
}

impl StoreData {
    fn empty() -> Self {
        Self {
            version: STORAGE_VERSION,
            next_identity_id: 1,
            next_encoding_id: 1,
            next_attempt_id: 1,
            identities: Vec::new(),
            encodings: Vec::new(),
            login_attempts: Vec::new(),
        }
    }

    fn identity_mut(&mut self, identity_id: u64) -> Result<&mut Identity> {
        self.identities
            .iter_mut()
            .find(|i| i.id == identity_id)
            .ok_or(FaceGuardError::IdentityNotFound(identity_id))
    }
}

/// Single-file bincode store. Each operation writes the whole database to a
/// temporary file and renames it over the old one, so a failed write leaves
/// the previous state intact.
pub struct FileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl FileStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(STORE_FILE);

        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            let mut data: StoreData = bincode::deserialize(&bytes)
                .map_err(|e| FaceGuardError::Storage(format!("Failed to deserialize: {}", e)))?;

            // Handle version migration if needed
            if data.version < STORAGE_VERSION {
                data.version = STORAGE_VERSION;
            }
            data
        } else {
            StoreData::empty()
        };

        tracing::debug!("Opened store at {:?} ({} identities)", path, data.identities.len());
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("com", "faceguard", "FaceGuard")
            .ok_or_else(|| FaceGuardError::Storage("Failed to get project dirs".into()))?;
        Self::open(dirs.data_dir())
    }

    pub fn open_configured(config: &Config) -> Result<Self> {
        match &config.storage.data_dir {
            Some(dir) => Self::open(dir),
            None => Self::open_default(),
        }
    }

    pub fn identities(&self) -> Result<Vec<Identity>> {
        Ok(self.lock()?.identities.clone())
    }

    pub fn encodings_for(&self, identity_id: u64) -> Result<Vec<FaceEncoding>> {
        Ok(self
            .lock()?
            .encodings
            .iter()
            .filter(|e| e.identity_id == identity_id)
            .cloned()
            .collect())
    }

    pub fn login_attempts(&self) -> Result<Vec<LoginAttempt>> {
        Ok(self.lock()?.login_attempts.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreData>> {
        self.data
            .lock()
            .map_err(|_| FaceGuardError::Storage("Store lock poisoned".into()))
    }

    /// Apply `change` to a copy, persist it, then publish it in memory.
    fn commit<T>(&self, change: impl FnOnce(&mut StoreData) -> Result<T>) -> Result<T> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let result = change(&mut next)?;

        self.persist(&next)?;
        *guard = next;
        Ok(result)
    }

    fn persist(&self, data: &StoreData) -> Result<()> {
        let encoded = bincode::serialize(data)
            .map_err(|e| FaceGuardError::Storage(format!("Failed to serialize: {}", e)))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl IdentityStore for FileStore {
    fn create_identity(&self, name: &str) -> Result<Identity> {
        self.commit(|data| {
            let identity = Identity {
                id: data.next_identity_id,
                name: name.to_string(),
                created_at: Utc::now(),
                last_login_at: None,
            };
            data.next_identity_id += 1;
            data.identities.push(identity.clone());
            Ok(identity)
        })
    }

    fn save_encoding(&self, identity_id: u64, encoding: &[f32], profile_picture: &[u8]) -> Result<FaceEncoding> {
        self.commit(|data| {
            data.identity_mut(identity_id)?;

            if encoding.is_empty() {
                return Err(FaceGuardError::Storage("Refusing to store an empty encoding".into()));
            }
            if let Some(existing) = data.encodings.first().map(|e| e.encoding.len()) {
                if existing != encoding.len() {
                    return Err(FaceGuardError::Storage(format!(
                        "Encoding length mismatch with existing store (expected {}, found {})",
                        existing,
                        encoding.len()
                    )));
                }
            }

            let record = FaceEncoding {
                id: data.next_encoding_id,
                identity_id,
                encoding: encoding.to_vec(),
                profile_picture: profile_picture.to_vec(),
                created_at: Utc::now(),
            };
            data.next_encoding_id += 1;
            data.encodings.push(record.clone());
            Ok(record)
        })
    }

    fn list_all_encodings(&self) -> Result<Vec<EncodingRecord>> {
        let data = self.lock()?;
        let mut records: Vec<(&FaceEncoding, &Identity)> = data
            .encodings
            .iter()
            .filter_map(|e| {
                data.identities
                    .iter()
                    .find(|i| i.id == e.identity_id)
                    .map(|i| (e, i))
            })
            .collect();
        records.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at).then(b.0.id.cmp(&a.0.id)));

        Ok(records
            .into_iter()
            .map(|(encoding, identity)| EncodingRecord {
                identity_id: identity.id,
                name: identity.name.clone(),
                encoding: encoding.encoding.clone(),
                profile_picture: encoding.profile_picture.clone(),
            })
            .collect())
    }

    fn log_login_attempt(&self, identity_id: u64, success: bool, confidence: f32) -> Result<LoginAttempt> {
        self.commit(|data| {
            let now = Utc::now();
            let identity = data.identity_mut(identity_id)?;
            if success {
                identity.last_login_at = Some(now);
            }

            let attempt = LoginAttempt {
                id: data.next_attempt_id,
                identity_id,
                success,
                confidence,
                occurred_at: now,
            };
            data.next_attempt_id += 1;
            data.login_attempts.push(attempt.clone());
            Ok(attempt)
        })
    }

    fn discard_identity(&self, identity_id: u64) -> Result<()> {
        self.commit(|data| {
            data.identity_mut(identity_id)?;
            data.identities.retain(|i| i.id != identity_id);
            data.encodings.retain(|e| e.identity_id != identity_id);
            Ok(())
        })
    }

    fn identity_profile(&self, identity_id: u64) -> Result<IdentityProfile> {
        let data = self.lock()?;
        let identity = data
            .identities
            .iter()
            .find(|i| i.id == identity_id)
            .cloned()
            .ok_or(FaceGuardError::IdentityNotFound(identity_id))?;

        let profile_picture = data
            .encodings
            .iter()
            .find(|e| e.identity_id == identity_id)
            .map(|e| e.profile_picture.clone());

        let attempts = data.login_attempts.iter().filter(|a| a.identity_id == identity_id);
        let (total_logins, successful_logins) = attempts.fold((0, 0), |(total, ok), a| {
            (total + 1, ok + u64::from(a.success))
        });

        Ok(IdentityProfile {
            identity,
            profile_picture,
            total_logins,
            successful_logins,
        })
    }
}
