//! GELF chunked framing.
//!
//! A serialized (and usually compressed) message that does not fit into one
//! transport frame is split into chunks. Every chunk carries:
//! - A 2-byte magic number (`0x1e 0x0f`) marking it as a chunk
//! - An 8-byte random message id shared by all chunks of one message
//! - A 1-byte sequence index and a 1-byte sequence count
//!
//! Messages that fit into a single frame are sent without a chunk header.

pub mod codec;
pub mod error;
pub mod reassembler;
pub mod writer;

pub use codec::{
    chunk_count, encode_chunks, is_chunked, max_message_size, ChunkHeader, MessageId,
    CHUNK_HEADER_SIZE, CHUNK_MAGIC, DEFAULT_FRAME_SIZE, MAX_CHUNKS,
};
pub use error::{ChunkError, Result};
pub use reassembler::Reassembler;
pub use writer::ChunkWriter;
