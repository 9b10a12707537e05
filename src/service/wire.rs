//! Length-prefixed bincode frames shared by every socket in the system:
//! a little-endian `u32` byte count followed by the encoded message.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Frames carry full still images, so the cap is well above a JPEG frame.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("Message too large: {0} bytes")]
    TooLarge(usize),

    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Failed to decode message: {0}")]
    Decode(String),
}

pub fn send<W: Write, T: Serialize>(stream: &mut W, message: &T) -> Result<(), WireError> {
    let data = bincode::serialize(message).map_err(|e| WireError::Encode(e.to_string()))?;
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(WireError::TooLarge(data.len()));
    }
    let len = (data.len() as u32).to_le_bytes();

    stream.write_all(&len)?;
    stream.write_all(&data)?;
    stream.flush()?;
    Ok(())
}

pub fn receive<R: Read, T: DeserializeOwned>(stream: &mut R) -> Result<T, WireError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    // Sanity check before allocating
    if len > MAX_MESSAGE_SIZE {
        return Err(WireError::TooLarge(len));
    }

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;

    bincode::deserialize(&buf).map_err(|e| WireError::Decode(e.to_string()))
}
