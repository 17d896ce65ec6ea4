//! Byte-stream framing for stages connected by OS pipes.
//!
//! Each value travels as a 4-byte little-endian frame.

use bytes::{Buf, BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};

use super::channel::{ChannelError, Inbound, Outbound};

const FRAME_LEN: usize = 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
  type Item = u32;
  type Error = ChannelError;

  fn decode(&mut self, src: &mut BytesMut) -> Result<Option<u32>, ChannelError> {
    if src.len() < FRAME_LEN {
      src.reserve(FRAME_LEN - src.len());
      return Ok(None);
    }
    Ok(Some(src.get_u32_le()))
  }

  fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<u32>, ChannelError> {
    match self.decode(src)? {
      Some(value) => Ok(Some(value)),
      None if src.is_empty() => Ok(None),
      None => Err(ChannelError::TruncatedFrame { got: src.len() }),
    }
  }
}

impl Encoder<u32> for FrameCodec {
  type Error = ChannelError;

  fn encode(&mut self, value: u32, dst: &mut BytesMut) -> Result<(), ChannelError> {
    dst.reserve(FRAME_LEN);
    dst.put_u32_le(value);
    Ok(())
  }
}

/// Reads framed values from any byte source (a pipe, stdin).
#[derive(Debug)]
pub struct FramedInbound<R> {
  frames: FramedRead<R, FrameCodec>,
}

impl<R: AsyncRead> FramedInbound<R> {
  pub fn new(reader: R) -> Self {
    Self {
      frames: FramedRead::new(reader, FrameCodec),
    }
  }
}

#[async_trait::async_trait]
impl<R> Inbound for FramedInbound<R>
where
  R: AsyncRead + Unpin + Send,
{
  async fn recv(&mut self) -> Result<Option<u32>, ChannelError> {
    self.frames.next().await.transpose()
  }
}

/// Writes framed values to any byte sink. Every value is flushed as it is sent.
#[derive(Debug)]
pub struct FramedOutbound<W> {
  frames: FramedWrite<W, FrameCodec>,
}

impl<W: AsyncWrite> FramedOutbound<W> {
  pub fn new(writer: W) -> Self {
    Self {
      frames: FramedWrite::new(writer, FrameCodec),
    }
  }
}

#[async_trait::async_trait]
impl<W> Outbound for FramedOutbound<W>
where
  W: AsyncWrite + Unpin + Send,
{
  async fn send(&mut self, value: u32) -> Result<(), ChannelError> {
    self.frames.send(value).await
  }

  async fn close(mut self) -> Result<(), ChannelError> {
    // Flush and shut down; the writer itself is dropped on return.
    self.frames.close().await
  }
}
