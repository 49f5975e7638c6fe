/// Errors that can occur during chunk encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The configured frame size cannot hold a chunk header plus payload.
    #[error("frame size too small ({size} bytes, min {min})")]
    FrameSizeTooSmall { size: usize, min: usize },

    /// The message needs more chunks than the protocol allows.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The datagram does not start with the chunk magic.
    #[error("invalid chunk magic (expected 0x1e0f)")]
    InvalidMagic,

    /// The datagram is shorter than a chunk header.
    #[error("truncated chunk ({len} bytes)")]
    Truncated { len: usize },

    /// The sequence index or count is out of range or inconsistent.
    #[error("invalid chunk sequence {sequence}/{count}")]
    InvalidSequence { sequence: u8, count: u8 },

    /// An I/O error occurred while writing chunks.
    #[error("chunk I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport accepted zero bytes.
    #[error("connection closed (incomplete chunk)")]
    ConnectionClosed,

    /// The socket write timeout expired before the frame was sent. On a
    /// stream transport the first `sent` bytes are already on the wire.
    #[error("frame write timed out ({sent} of {len} bytes sent)")]
    WriteTimedOut { sent: usize, len: usize },

    /// A datagram transport sent only part of a frame.
    #[error("short datagram ({sent} of {len} bytes sent)")]
    ShortDatagram { sent: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, ChunkError>;
