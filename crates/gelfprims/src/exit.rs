use std::fmt;
use std::io;

use gelfprims_chunk::ChunkError;
use gelfprims_client::ClientError;
use gelfprims_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidUri { .. } | TransportError::UnsupportedScheme(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn chunk_error(context: &str, err: ChunkError) -> CliError {
    match err {
        ChunkError::Io(source) => io_error(context, source),
        ChunkError::MessageTooLarge { .. } | ChunkError::FrameSizeTooSmall { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ChunkError::ConnectionClosed
        | ChunkError::WriteTimedOut { .. }
        | ChunkError::ShortDatagram { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Config(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ClientError::Uri(err) | ClientError::Transport(err) => transport_error(context, err),
        ClientError::Encoding(err) => chunk_error(context, err),
        ClientError::Serialization(_) | ClientError::InvalidMessage(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ClientError::Io(source) => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
