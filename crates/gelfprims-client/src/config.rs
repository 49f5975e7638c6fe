use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use gelfprims_chunk::{CHUNK_HEADER_SIZE, DEFAULT_FRAME_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Capacity of the bounded intake channel between callers and the backlog.
pub const DEFAULT_INTAKE_CAPACITY: usize = 500;

/// How long an idle dispatcher waits before re-checking for work and stop
/// requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Compression applied to each serialized message before chunking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Send the JSON as-is.
    None,
    /// gzip (RFC 1952) stream.
    #[default]
    Gzip,
    /// zlib (RFC 1950) stream.
    Zlib,
}

impl Compression {
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Zlib => "zlib",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "zlib" => Ok(Compression::Zlib),
            other => Err(ClientError::Config(format!(
                "unknown compression {other:?} (expected none, gzip or zlib)"
            ))),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Maximum bytes per datagram, chunk header included. Default: 1420.
    pub frame_size: usize,
    /// Compression for outgoing messages. Default: gzip.
    pub compression: Compression,
    /// Intake channel capacity; `queue_msg` blocks when it is full.
    pub intake_capacity: usize,
    /// Idle dispatcher poll interval.
    pub poll_interval: Duration,
    /// Write timeout applied to the socket. `None` blocks indefinitely.
    pub write_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            compression: Compression::default(),
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            write_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Check the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.frame_size <= CHUNK_HEADER_SIZE {
            return Err(ClientError::Config(format!(
                "frame size {} must exceed the {CHUNK_HEADER_SIZE}-byte chunk header",
                self.frame_size
            )));
        }
        if self.intake_capacity == 0 {
            return Err(ClientError::Config(
                "intake capacity must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ClientError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
