use std::io::{self, Write};

use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Crc;
use tracing::trace;

use crate::config::Compression;
use crate::error::{ClientError, Result};
use crate::pool::Pool;
use crate::sink::MessageSink;

/// Fixed gzip member header: magic, deflate method, no flags, zero mtime,
/// no extra flags, unknown OS.
const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0x00, 0xff];

/// Reusable gzip stream compressor bound to a sink.
///
/// Each [`compress`](GzipCompressor::compress) call writes one complete gzip
/// member (header, deflate body, CRC32/size trailer) and leaves the
/// compressor ready for the next message.
pub struct GzipCompressor<W: Write> {
    deflate: DeflateEncoder<W>,
}

impl<W: Write> GzipCompressor<W> {
    pub fn new(sink: W) -> Self {
        Self {
            deflate: DeflateEncoder::new(sink, flate2::Compression::default()),
        }
    }

    /// Write `data` to the sink as one gzip member.
    pub fn compress(&mut self, data: &[u8]) -> io::Result<()> {
        self.deflate.get_mut().write_all(&GZIP_HEADER)?;
        self.deflate.write_all(data)?;
        self.deflate.try_finish()?;

        let mut crc = Crc::new();
        crc.update(data);
        let sink = self.deflate.get_mut();
        sink.write_all(&crc.sum().to_le_bytes())?;
        sink.write_all(&crc.amount().to_le_bytes())?;
        Ok(())
    }

    /// Reset the deflate state and bind the compressor to `sink`, returning
    /// the previous sink.
    pub fn reset(&mut self, sink: W) -> io::Result<W> {
        self.deflate.reset(sink)
    }
}

/// Reusable zlib stream compressor bound to a sink.
pub struct ZlibCompressor<W: Write> {
    zlib: ZlibEncoder<W>,
}

impl<W: Write> ZlibCompressor<W> {
    pub fn new(sink: W) -> Self {
        Self {
            zlib: ZlibEncoder::new(sink, flate2::Compression::default()),
        }
    }

    /// Write `data` to the sink as one zlib stream.
    pub fn compress(&mut self, data: &[u8]) -> io::Result<()> {
        self.zlib.write_all(data)?;
        self.zlib.try_finish()
    }

    pub fn reset(&mut self, sink: W) -> io::Result<W> {
        self.zlib.reset(sink)
    }
}

/// The two compressor pools of a connection, both bound to the same sink.
pub struct CompressorPools<S: MessageSink> {
    sink: S,
    gzip: Pool<GzipCompressor<S>>,
    zlib: Pool<ZlibCompressor<S>>,
}

impl<S: MessageSink> CompressorPools<S> {
    pub fn new(sink: S) -> Self {
        let gzip_sink = sink.clone();
        let zlib_sink = sink.clone();
        Self {
            sink,
            gzip: Pool::new(move || GzipCompressor::new(gzip_sink.clone())),
            zlib: Pool::new(move || ZlibCompressor::new(zlib_sink.clone())),
        }
    }

    /// Write one serialized message through the selected compression and
    /// finish it as one logical message on the sink.
    ///
    /// The message boundary is always settled: on success the frames are
    /// sent, on failure the partial message is discarded. Returns the number
    /// of frames sent.
    pub fn write_msg(&self, data: &[u8], compression: Compression) -> Result<usize> {
        let mut sink = self.sink.clone();

        let written = match compression {
            Compression::None => sink.write_all(data),
            Compression::Gzip => {
                let mut gz = self.gzip.checkout();
                gz.compress(data)
                    .and_then(|()| gz.reset(self.sink.clone()))
                    .map(|_| self.gzip.checkin(gz))
            }
            Compression::Zlib => {
                let mut zz = self.zlib.checkout();
                zz.compress(data)
                    .and_then(|()| zz.reset(self.sink.clone()))
                    .map(|_| self.zlib.checkin(zz))
            }
        };
        // A failed compressor has been dropped by now; its drop-time flush
        // lands in the partial message discarded here.

        match written {
            Ok(()) => {
                let frames = sink.end_message()?;
                trace!(%compression, size = data.len(), frames, "message written");
                Ok(frames)
            }
            Err(err) => {
                sink.discard_message();
                Err(ClientError::from_io(err))
            }
        }
    }

    /// Number of idle (gzip, zlib) compressors.
    pub fn idle(&self) -> (usize, usize) {
        (self.gzip.idle(), self.zlib.idle())
    }

    /// Drop all idle compressors.
    pub fn clear(&self) {
        self.gzip.clear();
        self.zlib.clear();
    }
}
