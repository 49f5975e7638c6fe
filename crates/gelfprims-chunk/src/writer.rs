use std::io::{self, ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use gelfprims_transport::{GelfConn, Scheme};
use tracing::trace;

use crate::codec::{
    check_frame_size, chunk_count, max_message_size, ChunkHeader, MessageId, CHUNK_HEADER_SIZE,
};
use crate::error::{ChunkError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Buffers one logical message and emits it as bounded-size frames.
///
/// Bytes written through `io::Write` accumulate until [`flush_message`]
/// is called, which sends the message as one unchunked frame or as a chunk
/// sequence with a fresh [`MessageId`]. `io::Write::flush` only flushes the
/// underlying transport and does not end the message.
///
/// [`flush_message`]: ChunkWriter::flush_message
pub struct ChunkWriter<T> {
    inner: T,
    buf: BytesMut,
    frame: BytesMut,
    frame_size: usize,
    /// Total bytes attempted for the current message once it exceeded the
    /// size limit.
    overflow: Option<usize>,
    /// Each `write` on the transport is one datagram.
    datagram: bool,
}

impl<T: Write> ChunkWriter<T> {
    /// Create a chunk writer emitting frames of at most `frame_size` bytes.
    pub fn new(inner: T, frame_size: usize) -> Result<Self> {
        check_frame_size(frame_size)?;
        Ok(Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            frame: BytesMut::with_capacity(frame_size),
            frame_size,
            overflow: None,
            datagram: false,
        })
    }

    /// Finish the current message: send its frames and reset for the next one.
    ///
    /// Returns the number of frames sent (0 when nothing was buffered).
    /// A message that exceeded the size limit is discarded and reported as
    /// [`ChunkError::MessageTooLarge`]; the writer is ready for the next
    /// message either way.
    pub fn flush_message(&mut self) -> Result<usize> {
        if let Some(size) = self.overflow.take() {
            self.buf.clear();
            return Err(ChunkError::MessageTooLarge {
                size,
                max: self.max_message_size(),
            });
        }

        if self.buf.is_empty() {
            return Ok(0);
        }

        let payload = self.buf.split().freeze();
        let sent = if payload.len() <= self.frame_size {
            send_frame(&mut self.inner, &payload, self.datagram)?;
            1
        } else {
            let id = MessageId::random();
            let count = chunk_count(payload.len(), self.frame_size);
            for (sequence, slice) in payload
                .chunks(self.frame_size - CHUNK_HEADER_SIZE)
                .enumerate()
            {
                self.frame.clear();
                ChunkHeader {
                    id,
                    sequence: sequence as u8,
                    count: count as u8,
                }
                .encode(&mut self.frame);
                self.frame.put_slice(slice);
                send_frame(&mut self.inner, &self.frame, self.datagram)?;
            }
            trace!(%id, count, size = payload.len(), "sent chunked message");
            count
        };

        self.inner.flush()?;
        Ok(sent)
    }

    /// Discard any buffered bytes of the current message.
    pub fn discard_message(&mut self) {
        self.buf.clear();
        self.overflow = None;
    }

    /// Bytes buffered for the current message.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Configured maximum frame size.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Largest message payload this writer accepts.
    pub fn max_message_size(&self) -> usize {
        max_message_size(self.frame_size)
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl ChunkWriter<GelfConn> {
    /// Create a chunk writer over a dialed connection.
    ///
    /// On UDP a frame must leave in a single `send`; a short send fails with
    /// [`ChunkError::ShortDatagram`] instead of emitting the remainder as a
    /// second datagram. Any write timeout set on `conn` ends a blocked send
    /// with [`ChunkError::WriteTimedOut`].
    pub fn for_conn(conn: GelfConn, frame_size: usize) -> Result<Self> {
        let datagram = conn.scheme() == Scheme::Udp;
        let mut writer = Self::new(conn, frame_size)?;
        writer.datagram = datagram;
        Ok(writer)
    }
}

impl<T: Write> Write for ChunkWriter<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let max = self.max_message_size();

        if let Some(size) = self.overflow.as_mut() {
            *size = size.saturating_add(data.len());
            return Err(io::Error::other(ChunkError::MessageTooLarge { size: *size, max }));
        }

        let size = self.buf.len() + data.len();
        if size > max {
            self.buf.clear();
            self.overflow = Some(size);
            return Err(io::Error::other(ChunkError::MessageTooLarge { size, max }));
        }

        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn send_frame<T: Write>(inner: &mut T, frame: &[u8], datagram: bool) -> Result<()> {
    let len = frame.len();
    let mut sent = 0usize;
    while sent < len {
        match inner.write(&frame[sent..]) {
            Ok(0) => return Err(ChunkError::ConnectionClosed),
            Ok(n) if datagram && n < len => return Err(ChunkError::ShortDatagram { sent: n, len }),
            Ok(n) => sent += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(frame_error(err, sent, len)),
        }
    }
    Ok(())
}

/// Blocking sockets report an expired `SO_SNDTIMEO` as `WouldBlock` on unix
/// and `TimedOut` on windows.
fn frame_error(err: io::Error, sent: usize, len: usize) -> ChunkError {
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => ChunkError::WriteTimedOut { sent, len },
        _ => ChunkError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::codec::{is_chunked, MAX_CHUNKS};

    /// Records every `write` call as one datagram.
    #[derive(Default)]
    struct DatagramSink {
        datagrams: Vec<Vec<u8>>,
        flushed: Arc<AtomicBool>,
    }

    impl Write for DatagramSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.datagrams.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn writes_accumulate_until_flush_message() {
        let mut writer = ChunkWriter::new(DatagramSink::default(), 64).unwrap();

        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        assert_eq!(writer.buffered(), 11);
        assert!(writer.get_ref().datagrams.is_empty());

        assert_eq!(writer.flush_message().unwrap(), 1);
        assert_eq!(writer.buffered(), 0);
        assert_eq!(writer.get_ref().datagrams, vec![b"hello world".to_vec()]);
    }

    #[test]
    fn io_flush_does_not_end_message() {
        let sink = DatagramSink::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = ChunkWriter::new(sink, 64).unwrap();

        writer.write_all(b"partial").unwrap();
        writer.flush().unwrap();

        assert!(flag.load(Ordering::SeqCst));
        assert!(writer.get_ref().datagrams.is_empty());
        assert_eq!(writer.buffered(), 7);
    }

    #[test]
    fn large_message_is_chunked_with_fresh_ids() {
        let frame_size = 32; // 20 payload bytes per chunk
        let mut writer = ChunkWriter::new(DatagramSink::default(), frame_size).unwrap();

        writer.write_all(&[7u8; 50]).unwrap();
        assert_eq!(writer.flush_message().unwrap(), 3);
        writer.write_all(&[9u8; 50]).unwrap();
        assert_eq!(writer.flush_message().unwrap(), 3);

        let datagrams = &writer.get_ref().datagrams;
        assert_eq!(datagrams.len(), 6);
        assert!(datagrams.iter().all(|d| d.len() <= frame_size && is_chunked(d)));

        let (first, _) = ChunkHeader::decode(&datagrams[0]).unwrap();
        let (second, _) = ChunkHeader::decode(&datagrams[3]).unwrap();
        assert_eq!(first.count, 3);
        assert_ne!(first.id, second.id);

        for (i, datagram) in datagrams[..3].iter().enumerate() {
            let (header, payload) = ChunkHeader::decode(datagram).unwrap();
            assert_eq!(header.id, first.id);
            assert_eq!(header.sequence as usize, i);
            assert!(payload.iter().all(|&b| b == 7));
        }
    }

    #[test]
    fn oversize_message_fails_and_writer_recovers() {
        let frame_size = 20; // 8 payload bytes per chunk
        let mut writer = ChunkWriter::new(DatagramSink::default(), frame_size).unwrap();
        let max = writer.max_message_size();
        assert_eq!(max, MAX_CHUNKS * 8);

        writer.write_all(&vec![0u8; max]).unwrap();
        let err = writer.write(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(writer.write(b"more").is_err());

        let err = writer.flush_message().unwrap_err();
        assert!(matches!(err, ChunkError::MessageTooLarge { size, .. } if size == max + 5));
        assert!(writer.get_ref().datagrams.is_empty());

        writer.write_all(b"next").unwrap();
        assert_eq!(writer.flush_message().unwrap(), 1);
        assert_eq!(writer.get_ref().datagrams, vec![b"next".to_vec()]);
    }

    #[test]
    fn empty_flush_is_noop() {
        let mut writer = ChunkWriter::new(DatagramSink::default(), 64).unwrap();
        assert_eq!(writer.flush_message().unwrap(), 0);
        assert!(writer.get_ref().datagrams.is_empty());
    }

    #[test]
    fn discard_message_drops_buffer() {
        let mut writer = ChunkWriter::new(DatagramSink::default(), 64).unwrap();
        writer.write_all(b"abandoned").unwrap();
        writer.discard_message();
        assert_eq!(writer.flush_message().unwrap(), 0);
    }

    #[test]
    fn rejects_tiny_frame_size() {
        let err = ChunkWriter::new(DatagramSink::default(), 12).err().unwrap();
        assert!(matches!(err, ChunkError::FrameSizeTooSmall { size: 12, .. }));
        let err = ChunkWriter::new(DatagramSink::default(), 0).err().unwrap();
        assert!(matches!(err, ChunkError::FrameSizeTooSmall { size: 0, .. }));
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        struct ZeroWriter;

        impl Write for ZeroWriter {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Ok(0)
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut writer = ChunkWriter::new(ZeroWriter, 64).unwrap();
        writer.write_all(b"x").unwrap();
        assert!(matches!(
            writer.flush_message(),
            Err(ChunkError::ConnectionClosed)
        ));
    }

    #[test]
    fn expired_write_timeout_fails_instead_of_retrying() {
        struct Stalled {
            attempts: usize,
        }

        impl Write for Stalled {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                self.attempts += 1;
                Err(io::Error::from(ErrorKind::WouldBlock))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut writer = ChunkWriter::new(Stalled { attempts: 0 }, 64).unwrap();
        writer.write_all(b"stuck").unwrap();
        assert!(matches!(
            writer.flush_message(),
            Err(ChunkError::WriteTimedOut { sent: 0, len: 5 })
        ));
        assert_eq!(writer.get_ref().attempts, 1);

        // The writer is usable for the next message.
        assert_eq!(writer.buffered(), 0);
    }

    #[test]
    fn short_send_on_datagram_transport_is_an_error() {
        /// Accepts half of every write.
        #[derive(Default)]
        struct HalfSend(Vec<Vec<u8>>);

        impl Write for HalfSend {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let n = buf.len().div_ceil(2);
                self.0.push(buf[..n].to_vec());
                Ok(n)
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut writer = ChunkWriter::new(HalfSend::default(), 64).unwrap();
        writer.datagram = true;
        writer.write_all(b"truncated").unwrap();
        assert!(matches!(
            writer.flush_message(),
            Err(ChunkError::ShortDatagram { sent: 5, len: 9 })
        ));
        assert_eq!(writer.get_ref().0.len(), 1);

        // Stream transports keep writing the rest of the frame.
        let mut writer = ChunkWriter::new(HalfSend::default(), 64).unwrap();
        writer.write_all(b"streamed").unwrap();
        assert_eq!(writer.flush_message().unwrap(), 1);
        assert_eq!(writer.get_ref().0.concat(), b"streamed");
    }

    #[test]
    fn handles_interrupted_frame_write() {
        struct InterruptOnce {
            interrupted: bool,
            data: Vec<u8>,
        }

        impl Write for InterruptOnce {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::Error::from(ErrorKind::Interrupted));
                }
                self.data.extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sink = InterruptOnce {
            interrupted: false,
            data: Vec::new(),
        };
        let mut writer = ChunkWriter::new(sink, 64).unwrap();
        writer.write_all(b"retry").unwrap();
        writer.flush_message().unwrap();
        assert_eq!(writer.into_inner().data, b"retry");
    }
}
