use crate::camera::{Frame, FrameSource};
use crate::common::Result;
use std::fs;
use std::path::PathBuf;

/// Reads the latest still that the camera grabber wrote to disk.
///
/// The grabber replaces the file atomically (write + rename), so every
/// read sees one whole frame.
pub struct SnapshotCamera {
    path: PathBuf,
}

impl SnapshotCamera {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FrameSource for SnapshotCamera {
    fn is_active(&self) -> bool {
        self.path.is_file()
    }

    fn capture_still(&self) -> Result<Frame> {
        let bytes = fs::read(&self.path)?;
        let frame = Frame::decode(&bytes)?;
        tracing::trace!("Captured {}x{} still from {}", frame.width, frame.height, self.path.display());
        Ok(frame)
    }
}
