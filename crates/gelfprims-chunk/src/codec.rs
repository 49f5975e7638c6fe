use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ChunkError, Result};

/// Chunk header: magic (2) + message id (8) + sequence (1) + count (1) = 12 bytes.
pub const CHUNK_HEADER_SIZE: usize = 12;

/// Magic bytes marking a chunked GELF datagram.
pub const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];

/// Maximum number of chunks a single message may be split into.
pub const MAX_CHUNKS: usize = 128;

/// Default frame size in bytes, sized to stay below a typical 1500-byte MTU.
pub const DEFAULT_FRAME_SIZE: usize = 1420;

/// Identifier shared by all chunks of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub [u8; 8]);

impl MessageId {
    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Header prefixed to every chunk of a multi-chunk message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: MessageId,
    /// 0-based position of this chunk.
    pub sequence: u8,
    /// Total number of chunks in the message.
    pub count: u8,
}

impl ChunkHeader {
    /// Append the wire form of this header to `dst`.
    ///
    /// Wire format:
    /// ```text
    /// ┌──────────────┬──────────────┬──────────┬──────────┬──────────────┐
    /// │ Magic (2B)   │ Message id   │ Sequence │ Count    │ Payload      │
    /// │ 0x1e 0x0f    │ (8B)         │ (1B)     │ (1B)     │              │
    /// └──────────────┴──────────────┴──────────┴──────────┴──────────────┘
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(CHUNK_HEADER_SIZE);
        dst.put_slice(&CHUNK_MAGIC);
        dst.put_slice(&self.id.0);
        dst.put_u8(self.sequence);
        dst.put_u8(self.count);
    }

    /// Split a chunked datagram into its header and payload slice.
    pub fn decode(datagram: &[u8]) -> Result<(Self, &[u8])> {
        if datagram.len() < CHUNK_HEADER_SIZE {
            return Err(ChunkError::Truncated {
                len: datagram.len(),
            });
        }
        if datagram[0..2] != CHUNK_MAGIC {
            return Err(ChunkError::InvalidMagic);
        }

        let mut id = [0u8; 8];
        id.copy_from_slice(&datagram[2..10]);
        let header = Self {
            id: MessageId(id),
            sequence: datagram[10],
            count: datagram[11],
        };

        if header.count == 0
            || header.count as usize > MAX_CHUNKS
            || header.sequence >= header.count
        {
            return Err(ChunkError::InvalidSequence {
                sequence: header.sequence,
                count: header.count,
            });
        }

        Ok((header, &datagram[CHUNK_HEADER_SIZE..]))
    }
}

/// Returns true if the datagram starts with the chunk magic.
pub fn is_chunked(datagram: &[u8]) -> bool {
    datagram.len() >= CHUNK_MAGIC.len() && datagram[0..2] == CHUNK_MAGIC
}

/// Number of frames a payload of `len` bytes occupies at `frame_size`.
///
/// Payloads that fit into one frame are sent unchunked and count as one.
pub fn chunk_count(len: usize, frame_size: usize) -> usize {
    if len <= frame_size {
        return 1;
    }
    len.div_ceil(frame_size.saturating_sub(CHUNK_HEADER_SIZE).max(1))
}

/// Largest payload that can be sent at `frame_size`.
pub fn max_message_size(frame_size: usize) -> usize {
    let chunked = MAX_CHUNKS * frame_size.saturating_sub(CHUNK_HEADER_SIZE);
    chunked.max(frame_size)
}

pub(crate) fn check_frame_size(frame_size: usize) -> Result<()> {
    if frame_size <= CHUNK_HEADER_SIZE {
        return Err(ChunkError::FrameSizeTooSmall {
            size: frame_size,
            min: CHUNK_HEADER_SIZE + 1,
        });
    }
    Ok(())
}

/// Encode a payload into the frames that go on the wire.
///
/// A payload of at most `frame_size` bytes yields one unchunked frame.
/// Larger payloads yield `chunk_count` frames, each at most `frame_size`
/// bytes, tagged with `id`.
pub fn encode_chunks(id: MessageId, payload: &[u8], frame_size: usize) -> Result<Vec<Bytes>> {
    check_frame_size(frame_size)?;

    if payload.len() <= frame_size {
        return Ok(vec![Bytes::copy_from_slice(payload)]);
    }

    let count = chunk_count(payload.len(), frame_size);
    if count > MAX_CHUNKS {
        return Err(ChunkError::MessageTooLarge {
            size: payload.len(),
            max: max_message_size(frame_size),
        });
    }

    let per_chunk = frame_size - CHUNK_HEADER_SIZE;
    let mut frames = Vec::with_capacity(count);
    for (sequence, slice) in payload.chunks(per_chunk).enumerate() {
        let mut frame = BytesMut::with_capacity(CHUNK_HEADER_SIZE + slice.len());
        ChunkHeader {
            id,
            sequence: sequence as u8,
            count: count as u8,
        }
        .encode(&mut frame);
        frame.put_slice(slice);
        frames.push(frame.freeze());
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: MessageId = MessageId([1, 2, 3, 4, 5, 6, 7, 8]);

    #[test]
    fn header_encode_decode() {
        let mut buf = BytesMut::new();
        let header = ChunkHeader {
            id: ID,
            sequence: 3,
            count: 9,
        };
        header.encode(&mut buf);
        buf.put_slice(b"tail");

        assert_eq!(buf.len(), CHUNK_HEADER_SIZE + 4);
        assert_eq!(&buf[..2], &CHUNK_MAGIC);

        let (decoded, payload) = ChunkHeader::decode(&buf).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(payload, b"tail");
    }

    #[test]
    fn decode_rejects_bad_headers() {
        assert!(matches!(
            ChunkHeader::decode(&[0x1e, 0x0f, 0]),
            Err(ChunkError::Truncated { len: 3 })
        ));

        let mut bad_magic = vec![0u8; CHUNK_HEADER_SIZE];
        bad_magic[11] = 1;
        assert!(matches!(
            ChunkHeader::decode(&bad_magic),
            Err(ChunkError::InvalidMagic)
        ));

        let mut buf = BytesMut::new();
        ChunkHeader {
            id: ID,
            sequence: 2,
            count: 2,
        }
        .encode(&mut buf);
        assert!(matches!(
            ChunkHeader::decode(&buf),
            Err(ChunkError::InvalidSequence {
                sequence: 2,
                count: 2
            })
        ));
    }

    #[test]
    fn small_payload_is_single_unchunked_frame() {
        let frames = encode_chunks(ID, b"{\"short_message\":\"hi\"}", 64).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(!is_chunked(&frames[0]));
        assert_eq!(frames[0].as_ref(), b"{\"short_message\":\"hi\"}");
    }

    #[test]
    fn payload_equal_to_frame_size_is_not_chunked() {
        let payload = vec![b'x'; 100];
        let frames = encode_chunks(ID, &payload, 100).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 100);
    }

    #[test]
    fn large_payload_is_split_with_shared_id() {
        let payload: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
        let frame_size = 62; // 50 payload bytes per chunk
        let frames = encode_chunks(ID, &payload, frame_size).unwrap();

        assert_eq!(frames.len(), 5);
        assert_eq!(chunk_count(payload.len(), frame_size), 5);

        let mut rebuilt = Vec::new();
        for (i, frame) in frames.iter().enumerate() {
            assert!(frame.len() <= frame_size);
            let (header, body) = ChunkHeader::decode(frame).unwrap();
            assert_eq!(header.id, ID);
            assert_eq!(header.sequence as usize, i);
            assert_eq!(header.count, 5);
            rebuilt.extend_from_slice(body);
        }
        assert_eq!(rebuilt, payload);
    }

    #[test]
    fn oversize_payload_rejected() {
        let frame_size = 20; // 8 payload bytes per chunk
        let max = max_message_size(frame_size);
        assert_eq!(max, MAX_CHUNKS * 8);

        assert_eq!(
            encode_chunks(ID, &vec![0u8; max], frame_size).unwrap().len(),
            MAX_CHUNKS
        );
        let err = encode_chunks(ID, &vec![0u8; max + 1], frame_size).unwrap_err();
        assert!(matches!(err, ChunkError::MessageTooLarge { size, .. } if size == max + 1));
    }

    #[test]
    fn frame_size_must_exceed_header() {
        assert!(matches!(
            encode_chunks(ID, b"x", CHUNK_HEADER_SIZE),
            Err(ChunkError::FrameSizeTooSmall { min: 13, .. })
        ));
        assert!(encode_chunks(ID, b"x", CHUNK_HEADER_SIZE + 1).is_ok());
    }

    #[test]
    fn message_id_display_is_hex() {
        assert_eq!(ID.to_string(), "0102030405060708");
        assert_ne!(MessageId::random(), MessageId::random());
    }
}
