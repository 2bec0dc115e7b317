//! Blocking frame reader
//!
//! Reads MRD frames sequentially from any `std::io::Read` source
//! (stdin, a file, a socket).

use std::io::{ErrorKind, Read};

use crate::config::ReconConfig;
use crate::error::{MrdError, Result};
use crate::protocol::acquisition::{Acquisition, AcquisitionHeader};
use crate::protocol::frame::{
    check_frame_length, check_header_length, expect_id, MessageId, ReadOutcome,
    HEADER_LENGTH_SIZE, MESSAGE_ID_SIZE,
};
use crate::protocol::header::MrdHeader;
use crate::protocol::image::{Image, ImageHeader};
use tracing::{debug, trace};

/// Blocking MRD frame reader
///
/// # Examples
///
/// ```no_run
/// use mrd_stream_recon::io::FrameReader;
/// use mrd_stream_recon::protocol::ReadOutcome;
///
/// let mut reader = FrameReader::new(std::io::stdin().lock());
/// if let ReadOutcome::Message(header) = reader.read_header()? {
///     println!("{} header bytes", header.raw().len());
/// }
/// # Ok::<(), mrd_stream_recon::MrdError>(())
/// ```
pub struct FrameReader<R> {
    inner: R,
    max_header_bytes: usize,
    max_frame_bytes: usize,
}

impl<R: Read> FrameReader<R> {
    /// Create a reader with default frame size limits
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, &ReconConfig::default())
    }

    /// Create a reader using the limits of `config`
    pub fn with_config(inner: R, config: &ReconConfig) -> Self {
        FrameReader {
            inner,
            max_header_bytes: config.max_header_bytes,
            max_frame_bytes: config.max_frame_bytes,
        }
    }

    /// Read until `buf` is full or the input ends; returns bytes read
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn read_exact_or_truncated(&mut self, buf: &mut [u8]) -> Result<()> {
        let filled = self.fill(buf)?;
        if filled < buf.len() {
            return Err(MrdError::TruncatedStream {
                expected: buf.len(),
                actual: filled,
            });
        }
        Ok(())
    }

    /// Read the next message id, or `None` if the input ended cleanly
    /// before the first byte of a frame
    pub fn next_message_id(&mut self) -> Result<Option<u16>> {
        let mut buf = [0u8; MESSAGE_ID_SIZE];
        match self.fill(&mut buf)? {
            0 => Ok(None),
            MESSAGE_ID_SIZE => Ok(Some(u16::from_le_bytes(buf))),
            actual => Err(MrdError::TruncatedStream {
                expected: MESSAGE_ID_SIZE,
                actual,
            }),
        }
    }

    /// Read exactly one message id
    ///
    /// # Errors
    ///
    /// - [`MrdError::TruncatedStream`] - fewer than 2 bytes available
    pub fn read_message_id(&mut self) -> Result<u16> {
        self.next_message_id()?.ok_or(MrdError::TruncatedStream {
            expected: MESSAGE_ID_SIZE,
            actual: 0,
        })
    }

    /// Read a message id and check it against `expected`
    pub fn expect(&mut self, expected: MessageId) -> Result<ReadOutcome<()>> {
        match self.next_message_id()? {
            Some(id) => expect_id(id, expected),
            None => Ok(ReadOutcome::EndOfStream),
        }
    }

    /// Read a Header frame: u32 length followed by the XML document
    pub fn read_header(&mut self) -> Result<ReadOutcome<MrdHeader>> {
        if let Some(outcome) = self.expect(MessageId::Header)?.terminal() {
            return Ok(outcome);
        }

        let mut len_buf = [0u8; HEADER_LENGTH_SIZE];
        self.read_exact_or_truncated(&mut len_buf)?;
        let length = check_header_length(u32::from_le_bytes(len_buf), self.max_header_bytes)?;

        let mut xml = vec![0u8; length];
        self.read_exact_or_truncated(&mut xml)?;
        debug!(size = length, "Received header frame");

        MrdHeader::parse(xml).map(ReadOutcome::Message)
    }

    /// Read an Acquisition frame
    pub fn read_acquisition(&mut self) -> Result<ReadOutcome<Acquisition>> {
        if let Some(outcome) = self.expect(MessageId::Acquisition)?.terminal() {
            return Ok(outcome);
        }

        let mut head_buf = [0u8; AcquisitionHeader::SIZE];
        self.read_exact_or_truncated(&mut head_buf)?;
        let head = AcquisitionHeader::decode(&head_buf)?;

        let payload_len = check_frame_length(head.payload_len(), self.max_frame_bytes)?;
        let mut payload = vec![0u8; payload_len];
        self.read_exact_or_truncated(&mut payload)?;
        trace!(
            scan_counter = head.scan_counter,
            samples = head.number_of_samples,
            channels = head.active_channels,
            "Received acquisition frame"
        );

        Acquisition::decode_payload(head, &payload).map(ReadOutcome::Message)
    }

    /// Read an Image frame
    pub fn read_image(&mut self) -> Result<ReadOutcome<Image>> {
        if let Some(outcome) = self.expect(MessageId::Image)?.terminal() {
            return Ok(outcome);
        }

        let mut head_buf = [0u8; ImageHeader::SIZE];
        self.read_exact_or_truncated(&mut head_buf)?;
        let head = ImageHeader::decode(&head_buf)?;

        let mut attr_len_buf = [0u8; 8];
        self.read_exact_or_truncated(&mut attr_len_buf)?;
        let attr_len = check_frame_length(
            u64::from_le_bytes(attr_len_buf) as usize,
            self.max_frame_bytes,
        )?;
        let mut attributes = vec![0u8; attr_len];
        self.read_exact_or_truncated(&mut attributes)?;

        let data_len = check_frame_length(head.data_len(), self.max_frame_bytes)?;
        let mut data = vec![0u8; data_len];
        self.read_exact_or_truncated(&mut data)?;
        trace!(
            image_index = head.image_index,
            matrix = ?head.matrix_size,
            "Received image frame"
        );

        Ok(ReadOutcome::Message(Image {
            head,
            attributes: String::from_utf8_lossy(&attributes).into_owned(),
            data,
        }))
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}
