use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::common::error::{FaceGuardError, Result};
use crate::common::paths;
use crate::core::quality::CenteringThresholds;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub centering: CenteringConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default = "default_sample_period")]
    pub sample_period_ms: u64,
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_ms: u64,
    #[serde(default = "paths::system_snapshot_file")]
    pub snapshot_path: PathBuf,
}

fn default_sample_period() -> u64 { 500 }
fn default_analysis_timeout() -> u64 { 5000 }

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: default_sample_period(),
            analysis_timeout_ms: default_analysis_timeout(),
            snapshot_path: paths::system_snapshot_file(),
        }
    }
}

// Deployments have run with both 0.1 and 0.3; 0.1 is the strict default.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CenteringConfig {
    #[serde(default = "default_threshold")]
    pub max_offset_x: f32,
    #[serde(default = "default_threshold")]
    pub max_offset_y: f32,
    #[serde(default = "default_threshold")]
    pub max_scale_deviation: f32,
}

fn default_threshold() -> f32 { 0.1 }

impl Default for CenteringConfig {
    fn default() -> Self {
        Self {
            max_offset_x: default_threshold(),
            max_offset_y: default_threshold(),
            max_scale_deviation: default_threshold(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "paths::system_service_socket")]
    pub socket_path: PathBuf,
    #[serde(default = "paths::system_analysis_socket")]
    pub analysis_socket_path: PathBuf,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout() -> u64 { 30000 }

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: paths::system_service_socket(),
            analysis_socket_path: paths::system_analysis_socket(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Falls back to the platform data directory when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let system = paths::system_config_file();
        if system.exists() {
            return Self::load_from_path(&system);
        }
        Self::load_from_path(Path::new("configs/faceguard.toml"))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FaceGuardError::Config(format!(
                "Config file not found: {}. Please create it from the example.", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| FaceGuardError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.sample_period_ms < 50 || self.capture.sample_period_ms > 60_000 {
            return Err(FaceGuardError::Config(format!(
                "Sample period must be between 50 and 60000 ms, got {}",
                self.capture.sample_period_ms
            )));
        }

        for (name, value) in [
            ("Analysis timeout", self.capture.analysis_timeout_ms),
            ("Request timeout", self.service.request_timeout_ms),
        ] {
            if !(100..=120_000).contains(&value) {
                return Err(FaceGuardError::Config(format!(
                    "{} must be between 100 and 120000 ms, got {}", name, value
                )));
            }
        }

        for (name, value) in [
            ("max_offset_x", self.centering.max_offset_x),
            ("max_offset_y", self.centering.max_offset_y),
            ("max_scale_deviation", self.centering.max_scale_deviation),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(FaceGuardError::Config(format!(
                    "Centering threshold {} must be in (0.0, 1.0], got {}", name, value
                )));
            }
        }

        Ok(())
    }

    pub fn thresholds(&self) -> CenteringThresholds {
        CenteringThresholds {
            max_offset_x: self.centering.max_offset_x,
            max_offset_y: self.centering.max_offset_y,
            max_scale_deviation: self.centering.max_scale_deviation,
        }
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.capture.sample_period_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.capture.analysis_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.service.request_timeout_ms)
    }
}
