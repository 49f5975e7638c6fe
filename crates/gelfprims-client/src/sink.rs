use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use gelfprims_chunk::ChunkWriter;

/// A `Write` target that knows where one logical message ends.
///
/// Pooled compressors hold a clone of the sink and stream into it; the
/// dispatcher calls [`end_message`](MessageSink::end_message) once per
/// message after the compressor has finished.
pub trait MessageSink: Write + Clone + Send + Sync + 'static {
    /// Transmit everything written since the last boundary as one message.
    /// Returns the number of frames sent.
    fn end_message(&mut self) -> gelfprims_chunk::Result<usize>;

    /// Drop everything written since the last boundary.
    fn discard_message(&mut self);
}

/// Cloneable handle to a [`ChunkWriter`] shared by the dispatcher and the
/// compressor pools.
pub struct SharedChunkWriter<T> {
    inner: Arc<Mutex<ChunkWriter<T>>>,
}

impl<T> Clone for SharedChunkWriter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Write> SharedChunkWriter<T> {
    pub fn new(writer: ChunkWriter<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, ChunkWriter<T>>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("chunk writer lock poisoned"))
    }

    /// Recover the writer once every other handle has been dropped.
    ///
    /// Returns the handle unchanged if clones are still alive.
    pub fn try_into_inner(self) -> std::result::Result<ChunkWriter<T>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex
                .into_inner()
                .unwrap_or_else(std::sync::PoisonError::into_inner)),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl<T: Write> Write for SharedChunkWriter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

impl<T: Write + Send + 'static> MessageSink for SharedChunkWriter<T> {
    fn end_message(&mut self) -> gelfprims_chunk::Result<usize> {
        self.lock()?.flush_message()
    }

    fn discard_message(&mut self) {
        if let Ok(mut writer) = self.lock() {
            writer.discard_message();
        }
    }
}
