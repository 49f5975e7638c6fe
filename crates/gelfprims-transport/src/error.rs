/// Errors that can occur while parsing dial URIs or operating a connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The dial URI could not be parsed.
    #[error("invalid uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: &'static str },

    /// The URI scheme is neither `udp` nor `tcp`.
    #[error("unsupported scheme {0:?} (expected \"udp\" or \"tcp\")")]
    UnsupportedScheme(String),

    /// Failed to connect to the remote endpoint.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The local host name could not be determined.
    #[error("failed to resolve local hostname: {0}")]
    Hostname(std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
