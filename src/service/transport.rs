use crate::common::{FaceGuardError, Result};
use crate::service::wire::{self, WireError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

/// Where a client should connect, resolved on every request.
pub trait EndpointResolver: Send + Sync {
    fn resolve(&self) -> Result<PathBuf>;
}

/// Fixed socket path taken from configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredEndpoint(pub PathBuf);

impl EndpointResolver for ConfiguredEndpoint {
    fn resolve(&self) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Socket path from an environment variable, falling back to a configured path.
#[derive(Debug, Clone)]
pub struct EnvEndpoint {
    pub var: &'static str,
    pub fallback: PathBuf,
}

impl EndpointResolver for EnvEndpoint {
    fn resolve(&self) -> Result<PathBuf> {
        match std::env::var_os(self.var) {
            Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
            _ => Ok(self.fallback.clone()),
        }
    }
}

pub struct SocketTransport {
    resolver: Box<dyn EndpointResolver>,
    timeout: Duration,
    connect_attempts: u32,
}

impl SocketTransport {
    pub fn new(resolver: impl EndpointResolver + 'static, timeout: Duration) -> Self {
        Self {
            resolver: Box::new(resolver),
            timeout,
            connect_attempts: 1,
        }
    }

    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts.max(1);
        self
    }

    /// One request, one response, one connection.
    pub fn exchange<Req, Resp>(&self, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let mut stream = self.connect()?;

        wire::send(&mut stream, request).map_err(|e| self.classify(e))?;
        wire::receive(&mut stream).map_err(|e| self.classify(e))
    }

    fn connect(&self) -> Result<UnixStream> {
        let path = self.resolver.resolve()?;

        let mut last_error = None;
        for attempt in 0..self.connect_attempts {
            match UnixStream::connect(&path) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("Failed to connect to {} (attempt {}): {}",
                                    path.display(), attempt + 1, e);
                    last_error = Some(e);
                    if attempt + 1 < self.connect_attempts {
                        std::thread::sleep(Duration::from_millis(100));
                    }
                }
            }
        }

        Err(FaceGuardError::ServiceUnreachable(format!(
            "{}: {}",
            path.display(),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    fn classify(&self, err: WireError) -> FaceGuardError {
        match err {
            WireError::Io(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                FaceGuardError::ServiceTimeout(self.timeout)
            }
            // The peer went away mid-exchange
            WireError::Io(e) => FaceGuardError::ServiceUnreachable(e.to_string()),
            e @ (WireError::TooLarge(_) | WireError::Decode(_)) => {
                FaceGuardError::MalformedResponse(e.to_string())
            }
            WireError::Encode(msg) => FaceGuardError::Other(anyhow::anyhow!(msg)),
        }
    }
}
