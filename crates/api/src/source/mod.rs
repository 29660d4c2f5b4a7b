// Path: crates/api/src/source/mod.rs
//! Polymorphic readable byte sources.
//!
//! The signer and the buffer-consumption helper accept anything that can
//! yield chunks: an in-memory buffer, a cursor reader, or a push-style
//! producer bridged through a channel. This module unifies them behind one
//! async trait.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use hychain_types::codec::{ByteReader, ByteWriter};
use hychain_types::error::ChainError;
use hychain_types::Result;

use crate::token::{ensure_active, CancellationToken};

/// A pull-based byte stream: yields chunks until exhausted.
#[async_trait]
pub trait ByteSource: Send {
    /// Returns the next chunk, or `None` once the source is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// A single in-memory buffer exposed as a source.
#[derive(Debug)]
pub struct BufferSource(Option<Bytes>);

impl BufferSource {
    /// Wraps a byte buffer.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(Some(bytes.into()))
    }
}

impl From<Bytes> for BufferSource {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for BufferSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for BufferSource {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl From<&str> for BufferSource {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes().to_vec())
    }
}

#[async_trait]
impl ByteSource for BufferSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.0.take())
    }
}

#[async_trait]
impl ByteSource for ByteReader {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.remaining()? == 0 {
            return Ok(None);
        }
        self.read(None).map(Some)
    }
}

/// An event emitted by a push-style producer.
#[derive(Debug)]
pub enum SourceEvent {
    /// A chunk of data.
    Data(Bytes),
    /// Orderly end of the stream.
    End,
    /// The producer failed; the error propagates to the consumer.
    Error(ChainError),
}

/// Bridges a push-style producer (data/end/error events) into a pull-based
/// [`ByteSource`] through a bounded channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<SourceEvent>,
    finished: bool,
}

impl ChannelSource {
    /// Creates the producer handle and the source, with the given channel
    /// capacity for backpressure.
    pub fn channel(capacity: usize) -> (mpsc::Sender<SourceEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            tx,
            Self {
                rx,
                finished: false,
            },
        )
    }
}

#[async_trait]
impl ByteSource for ChannelSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(SourceEvent::Data(chunk)) => Ok(Some(chunk)),
            Some(SourceEvent::End) => {
                self.finished = true;
                Ok(None)
            }
            Some(SourceEvent::Error(e)) => {
                self.finished = true;
                Err(e)
            }
            None => {
                self.finished = true;
                Err(ChainError::StreamClosed(
                    "source channel dropped before end of stream".to_string(),
                ))
            }
        }
    }
}

/// Drains a source into one contiguous buffer.
///
/// The token is checked once the drain completes, which is the first point
/// after the suspension where a side-effect-free bail-out is still possible.
pub async fn consume_buffer<S>(source: &mut S, token: &CancellationToken) -> Result<Bytes>
where
    S: ByteSource + ?Sized,
{
    let mut writer = ByteWriter::new();
    while let Some(chunk) = source.next_chunk().await? {
        writer.write(chunk)?;
    }
    ensure_active(token)?;
    writer.drain()
}
