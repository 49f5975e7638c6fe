use gelfprims_chunk::ChunkError;
use gelfprims_transport::TransportError;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration or environment.
    #[error("configuration error: {0}")]
    Config(String),

    /// The dial URI is malformed or names an unsupported scheme.
    #[error("invalid dial uri: {0}")]
    Uri(#[source] TransportError),

    /// Connecting, writing or closing the transport failed.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// The message could not be chunked (usually too large).
    #[error("encoding error: {0}")]
    Encoding(#[from] ChunkError),

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The message violates the GELF field rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// No connection is active.
    #[error("client is not connected")]
    NotConnected,

    /// `dial` was called on a connected client.
    #[error("client is already connected")]
    AlreadyConnected,

    /// A background worker could not be stopped cleanly.
    #[error("shutdown failed: {0}")]
    Shutdown(String),

    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidUri { .. } | TransportError::UnsupportedScheme(_) => {
                ClientError::Uri(err)
            }
            TransportError::Hostname(source) => {
                ClientError::Config(format!("failed to resolve local hostname: {source}"))
            }
            other => ClientError::Transport(other),
        }
    }
}

impl ClientError {
    /// Recover a chunk error that travelled through an `io::Error`.
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<ChunkError>()) {
            return ClientError::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<ChunkError>()) {
            Some(Ok(chunk)) => ClientError::Encoding(*chunk),
            Some(Err(other)) => ClientError::Io(std::io::Error::other(other)),
            None => ClientError::Io(std::io::Error::other("chunk writer failed")),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_classified() {
        let uri = ClientError::from(TransportError::UnsupportedScheme("http".into()));
        assert!(matches!(uri, ClientError::Uri(_)));

        let io = ClientError::from(TransportError::Io(std::io::Error::other("boom")));
        assert!(matches!(io, ClientError::Transport(_)));

        let host = ClientError::from(TransportError::Hostname(std::io::Error::other("x")));
        assert!(matches!(host, ClientError::Config(_)));
    }

    #[test]
    fn chunk_error_recovered_from_io() {
        let wrapped = std::io::Error::other(ChunkError::MessageTooLarge { size: 10, max: 5 });
        let err = ClientError::from_io(wrapped);
        assert!(matches!(
            err,
            ClientError::Encoding(ChunkError::MessageTooLarge { size: 10, max: 5 })
        ));

        let plain = ClientError::from_io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(plain, ClientError::Io(_)));
    }
}
