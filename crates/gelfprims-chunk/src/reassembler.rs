use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use crate::codec::{is_chunked, ChunkHeader, MessageId};
use crate::error::{ChunkError, Result};

/// Rebuilds messages from received datagrams.
///
/// Chunks may arrive in any order and interleaved with chunks of other
/// messages. Unchunked datagrams are returned as-is. This is a decoding aid
/// for tests and tooling; it keeps incomplete messages until they complete
/// or [`clear`](Reassembler::clear) is called.
#[derive(Debug, Default)]
pub struct Reassembler {
    pending: HashMap<MessageId, Partial>,
}

#[derive(Debug)]
struct Partial {
    parts: Vec<Option<Bytes>>,
    received: usize,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one datagram. Returns the full payload once a message is complete.
    pub fn push(&mut self, datagram: &[u8]) -> Result<Option<Bytes>> {
        if !is_chunked(datagram) {
            return Ok(Some(Bytes::copy_from_slice(datagram)));
        }

        let (header, payload) = ChunkHeader::decode(datagram)?;
        let partial = self.pending.entry(header.id).or_insert_with(|| Partial {
            parts: vec![None; header.count as usize],
            received: 0,
        });

        if partial.parts.len() != header.count as usize {
            return Err(ChunkError::InvalidSequence {
                sequence: header.sequence,
                count: header.count,
            });
        }

        let slot = &mut partial.parts[header.sequence as usize];
        if slot.is_none() {
            partial.received += 1;
        }
        *slot = Some(Bytes::copy_from_slice(payload));

        if partial.received < partial.parts.len() {
            return Ok(None);
        }

        let Some(partial) = self.pending.remove(&header.id) else {
            return Ok(None);
        };
        let mut message = BytesMut::new();
        for part in partial.parts.into_iter().flatten() {
            message.extend_from_slice(&part);
        }
        Ok(Some(message.freeze()))
    }

    /// Number of messages with chunks still outstanding.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop all incomplete messages.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_chunks, MessageId};

    #[test]
    fn passes_unchunked_datagram_through() {
        let mut reassembler = Reassembler::new();
        let out = reassembler.push(b"{\"a\":1}").unwrap().unwrap();
        assert_eq!(out.as_ref(), b"{\"a\":1}");
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn reassembles_out_of_order_and_interleaved() {
        let a: Vec<u8> = (0..200u32).map(|i| i as u8).collect();
        let b = vec![0xEE; 130];
        let frames_a = encode_chunks(MessageId([1; 8]), &a, 40).unwrap();
        let frames_b = encode_chunks(MessageId([2; 8]), &b, 40).unwrap();

        let mut reassembler = Reassembler::new();
        let mut done = Vec::new();
        for frame in frames_a.iter().rev().chain(frames_b.iter()) {
            if let Some(message) = reassembler.push(frame).unwrap() {
                done.push(message);
            }
        }

        assert_eq!(done.len(), 2);
        assert_eq!(done[0].as_ref(), a.as_slice());
        assert_eq!(done[1].as_ref(), b.as_slice());
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn duplicate_chunk_does_not_complete_early() {
        let payload = vec![5u8; 100];
        let frames = encode_chunks(MessageId([3; 8]), &payload, 40).unwrap();
        assert_eq!(frames.len(), 4);

        let mut reassembler = Reassembler::new();
        assert!(reassembler.push(&frames[0]).unwrap().is_none());
        assert!(reassembler.push(&frames[0]).unwrap().is_none());
        assert!(reassembler.push(&frames[1]).unwrap().is_none());
        assert!(reassembler.push(&frames[2]).unwrap().is_none());
        assert_eq!(reassembler.pending(), 1);

        let out = reassembler.push(&frames[3]).unwrap().unwrap();
        assert_eq!(out.as_ref(), payload.as_slice());
    }

    #[test]
    fn inconsistent_count_rejected() {
        let id = MessageId([4; 8]);
        let first = encode_chunks(id, &[1u8; 100], 40).unwrap();
        let second = encode_chunks(id, &[1u8; 200], 40).unwrap();

        let mut reassembler = Reassembler::new();
        reassembler.push(&first[0]).unwrap();
        let err = reassembler.push(&second[0]).unwrap_err();
        assert!(matches!(err, ChunkError::InvalidSequence { .. }));

        reassembler.clear();
        assert_eq!(reassembler.pending(), 0);
    }
}
