use std::path::PathBuf;
use std::fs;
use crate::common::config::Config;
use crate::common::error::Result;

#[derive(Debug, Clone)]
pub struct DevMode {
    enabled: bool,
    base_dir: PathBuf,
}

impl DevMode {
    pub fn new(enabled: bool) -> Result<Self> {
        Self::with_base_dir(enabled, PathBuf::from("./dev_data"))
    }

    pub fn with_base_dir(enabled: bool, base_dir: PathBuf) -> Result<Self> {
        // Create dev directories if in dev mode
        if enabled {
            fs::create_dir_all(base_dir.join("store"))?;
            fs::create_dir_all(base_dir.join("captures"))?;

            tracing::info!("Development mode enabled - data will be saved to: {}",
                           base_dir.display());
        }

        Ok(Self { enabled, base_dir })
    }

    /// Load the config, falling back to built-in defaults in dev mode.
    pub fn load_config(&self, explicit: Option<&std::path::Path>) -> Result<Config> {
        let mut config = match explicit {
            Some(path) => Config::load_from_path(path)?,
            None if self.enabled => Config::load().or_else(|e| {
                tracing::debug!("Using default config in dev mode: {}", e);
                Ok::<_, crate::common::error::FaceGuardError>(Config::default())
            })?,
            None => Config::load()?,
        };

        if self.enabled {
            self.apply(&mut config);
        }
        Ok(config)
    }

    /// Redirect sockets, snapshots and the store into local paths.
    pub fn apply(&self, config: &mut Config) {
        if !self.enabled {
            return;
        }
        config.service.socket_path = PathBuf::from("/tmp/faceguard.sock");
        config.service.analysis_socket_path = PathBuf::from("/tmp/faceguard-analysis.sock");
        config.capture.snapshot_path = self.base_dir.join("captures").join("frame.jpg");
        config.storage.data_dir = Some(self.base_dir.join("store"));
    }
}
