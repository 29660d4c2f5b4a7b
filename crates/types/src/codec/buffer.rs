// Path: crates/types/src/codec/buffer.rs
//! Scoped byte-buffer primitives used by the wire codec.

use bytes::{Bytes, BytesMut};

use crate::error::ChainError;
use crate::Result;

/// An append-only accumulator of byte chunks.
///
/// Chunks are kept as-is until [`ByteWriter::drain`], which concatenates them
/// and disposes the writer in one step.
#[derive(Debug, Default)]
pub struct ByteWriter {
    chunks: Vec<Bytes>,
    length: usize,
    disposed: bool,
}

impl ByteWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<()> {
        if self.disposed {
            return Err(ChainError::ResourceDisposed("ByteWriter"));
        }
        Ok(())
    }

    /// Returns the accumulated byte length.
    pub fn byte_length(&self) -> Result<usize> {
        self.guard()?;
        Ok(self.length)
    }

    /// Appends a chunk.
    pub fn write(&mut self, chunk: impl Into<Bytes>) -> Result<()> {
        self.guard()?;
        let chunk = chunk.into();
        self.length += chunk.len();
        self.chunks.push(chunk);
        Ok(())
    }

    /// Returns the concatenation of every chunk written so far and disposes
    /// the writer.
    pub fn drain(&mut self) -> Result<Bytes> {
        self.guard()?;
        let mut out = BytesMut::with_capacity(self.length);
        for chunk in self.chunks.drain(..) {
            out.extend_from_slice(&chunk);
        }
        self.dispose();
        Ok(out.freeze())
    }

    /// Marks the writer disposed and releases its chunks. Idempotent.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.chunks.clear();
        self.length = 0;
    }

    /// Whether this writer has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// A cursor-based reader over an owned byte sequence.
#[derive(Debug)]
pub struct ByteReader {
    buf: Bytes,
    pos: usize,
    disposed: bool,
}

impl ByteReader {
    /// Wraps a byte sequence.
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self {
            buf: buf.into(),
            pos: 0,
            disposed: false,
        }
    }

    fn guard(&self) -> Result<()> {
        if self.disposed {
            return Err(ChainError::ResourceDisposed("ByteReader"));
        }
        Ok(())
    }

    /// Returns the total length of the underlying sequence.
    pub fn byte_length(&self) -> Result<usize> {
        self.guard()?;
        Ok(self.buf.len())
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> Result<usize> {
        self.guard()?;
        Ok(self.buf.len() - self.pos)
    }

    /// Reads the next `n` bytes and advances the cursor.
    ///
    /// With `None`, the whole remainder is returned. A request past the end
    /// fails with `ERR_END_OF_STREAM` and does not advance the cursor.
    pub fn read(&mut self, n: Option<usize>) -> Result<Bytes> {
        self.guard()?;
        let remaining = self.buf.len() - self.pos;
        let take = n.unwrap_or(remaining);
        if take > remaining {
            return Err(ChainError::EndOfStream);
        }
        let out = self.buf.slice(self.pos..self.pos + take);
        self.pos += take;
        Ok(out)
    }

    /// Reads exactly one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = self.read(Some(1))?;
        Ok(b[0])
    }

    /// Marks the reader disposed and releases the buffer. Idempotent.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.buf = Bytes::new();
        self.pos = 0;
    }

    /// Whether this reader has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
