use std::path::PathBuf;

pub fn system_config_file() -> PathBuf {
    PathBuf::from("/etc/faceguard/faceguard.toml")
}

pub fn system_service_socket() -> PathBuf {
    PathBuf::from("/run/faceguard/service.sock")
}

pub fn system_analysis_socket() -> PathBuf {
    PathBuf::from("/run/faceguard/analysis.sock")
}

/// Still frame written by the camera grabber.
pub fn system_snapshot_file() -> PathBuf {
    PathBuf::from("/run/faceguard/frame.jpg")
}
