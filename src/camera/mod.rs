pub mod snapshot;

pub use snapshot::SnapshotCamera;

use crate::common::Result;
use image::{DynamicImage, ImageOutputFormat};
use std::io::Cursor;

const JPEG_QUALITY: u8 = 85;

/// One encoded still frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let mut jpeg = Vec::new();
        image.write_to(&mut Cursor::new(&mut jpeg), ImageOutputFormat::Jpeg(JPEG_QUALITY))?;
        Ok(Self {
            jpeg,
            width: image.width(),
            height: image.height(),
        })
    }

    /// Validate encoded bytes received from elsewhere.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self {
            jpeg: bytes.to_vec(),
            width: image.width(),
            height: image.height(),
        })
    }
}

/// A live video source that can hand out still frames.
pub trait FrameSource: Send + Sync {
    fn is_active(&self) -> bool;
    fn capture_still(&self) -> Result<Frame>;
}
