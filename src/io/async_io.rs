//! Asynchronous frame reader and writer
//!
//! Tokio counterparts of [`FrameReader`](super::FrameReader) and
//! [`FrameWriter`](super::FrameWriter). Frames are decoded with the same
//! codecs, so both sides produce byte-identical streams.

use crate::config::ReconConfig;
use crate::error::{MrdError, Result};
use crate::protocol::acquisition::{Acquisition, AcquisitionHeader};
use crate::protocol::frame::{
    check_frame_length, check_header_length, encode_close_frame, encode_header_frame, expect_id,
    MessageId, ReadOutcome, HEADER_LENGTH_SIZE, MESSAGE_ID_SIZE,
};
use crate::protocol::header::MrdHeader;
use crate::protocol::image::Image;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// Asynchronous MRD frame reader
///
/// # Examples
///
/// ```no_run
/// use mrd_stream_recon::io::AsyncFrameReader;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut reader = AsyncFrameReader::new(tokio::io::stdin());
///     let header = reader.read_header().await?;
///     Ok(())
/// }
/// ```
pub struct AsyncFrameReader<R> {
    inner: R,
    max_header_bytes: usize,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> AsyncFrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, &ReconConfig::default())
    }

    pub fn with_config(inner: R, config: &ReconConfig) -> Self {
        AsyncFrameReader {
            inner,
            max_header_bytes: config.max_header_bytes,
            max_frame_bytes: config.max_frame_bytes,
        }
    }

    async fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.inner.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    async fn read_exact_or_truncated(&mut self, buf: &mut [u8]) -> Result<()> {
        let filled = self.fill(buf).await?;
        if filled < buf.len() {
            return Err(MrdError::TruncatedStream {
                expected: buf.len(),
                actual: filled,
            });
        }
        Ok(())
    }

    /// Read the next message id, or `None` at a clean end of input
    pub async fn next_message_id(&mut self) -> Result<Option<u16>> {
        let mut buf = [0u8; MESSAGE_ID_SIZE];
        match self.fill(&mut buf).await? {
            0 => Ok(None),
            MESSAGE_ID_SIZE => Ok(Some(u16::from_le_bytes(buf))),
            actual => Err(MrdError::TruncatedStream {
                expected: MESSAGE_ID_SIZE,
                actual,
            }),
        }
    }

    pub async fn expect(&mut self, expected: MessageId) -> Result<ReadOutcome<()>> {
        match self.next_message_id().await? {
            Some(id) => expect_id(id, expected),
            None => Ok(ReadOutcome::EndOfStream),
        }
    }

    /// Read a Header frame
    pub async fn read_header(&mut self) -> Result<ReadOutcome<MrdHeader>> {
        if let Some(outcome) = self.expect(MessageId::Header).await?.terminal() {
            return Ok(outcome);
        }

        let mut len_buf = [0u8; HEADER_LENGTH_SIZE];
        self.read_exact_or_truncated(&mut len_buf).await?;
        let length = check_header_length(u32::from_le_bytes(len_buf), self.max_header_bytes)?;

        let mut xml = vec![0u8; length];
        self.read_exact_or_truncated(&mut xml).await?;
        debug!(size = length, "Received header frame (async)");

        MrdHeader::parse(xml).map(ReadOutcome::Message)
    }

    /// Read an Acquisition frame
    pub async fn read_acquisition(&mut self) -> Result<ReadOutcome<Acquisition>> {
        if let Some(outcome) = self.expect(MessageId::Acquisition).await?.terminal() {
            return Ok(outcome);
        }

        let mut head_buf = [0u8; AcquisitionHeader::SIZE];
        self.read_exact_or_truncated(&mut head_buf).await?;
        let head = AcquisitionHeader::decode(&head_buf)?;

        let payload_len = check_frame_length(head.payload_len(), self.max_frame_bytes)?;
        let mut payload = vec![0u8; payload_len];
        self.read_exact_or_truncated(&mut payload).await?;
        trace!(
            scan_counter = head.scan_counter,
            samples = head.number_of_samples,
            channels = head.active_channels,
            "Received acquisition frame (async)"
        );

        Acquisition::decode_payload(head, &payload).map(ReadOutcome::Message)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Asynchronous MRD frame writer
pub struct AsyncFrameWriter<W> {
    inner: W,
    frames: usize,
}

impl<W: AsyncWrite + Unpin> AsyncFrameWriter<W> {
    pub fn new(inner: W) -> Self {
        AsyncFrameWriter { inner, frames: 0 }
    }

    /// Write a Header frame carrying `xml` unchanged
    pub async fn write_header(&mut self, xml: &[u8]) -> Result<()> {
        let frame = encode_header_frame(xml)?;
        self.inner.write_all(&frame).await?;
        self.frames += 1;
        debug!(size = xml.len(), "Header frame written (async)");
        Ok(())
    }

    /// Write an Image frame
    pub async fn write_image(&mut self, image: &Image) -> Result<()> {
        let payload = image.encode()?;
        self.inner.write_all(&MessageId::Image.to_bytes()).await?;
        self.inner.write_all(&payload).await?;
        self.frames += 1;
        debug!(
            image_index = image.head.image_index,
            slice = image.head.slice,
            contrast = image.head.contrast,
            size = payload.len(),
            "Image frame written (async)"
        );
        Ok(())
    }

    /// Write a Close frame and flush
    pub async fn write_close(&mut self) -> Result<()> {
        self.inner.write_all(&encode_close_frame()).await?;
        self.frames += 1;
        self.inner.flush().await?;
        debug!(frames = self.frames, "Close frame written (async)");
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await?;
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
