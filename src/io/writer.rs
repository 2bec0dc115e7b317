//! Blocking frame writer

use std::io::Write;

use crate::error::Result;
use crate::protocol::acquisition::Acquisition;
use crate::protocol::frame::{encode_close_frame, encode_header_frame, MessageId};
use crate::protocol::image::Image;
use tracing::{debug, trace};

/// Blocking MRD frame writer
///
/// Frames are written as soon as they are produced; call [`flush`] to
/// push buffered output through a `BufWriter`.
///
/// [`flush`]: FrameWriter::flush
pub struct FrameWriter<W> {
    inner: W,
    frames: usize,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        FrameWriter { inner, frames: 0 }
    }

    /// Write a Header frame carrying `xml` unchanged
    pub fn write_header(&mut self, xml: &[u8]) -> Result<()> {
        let frame = encode_header_frame(xml)?;
        self.inner.write_all(&frame)?;
        self.frames += 1;
        debug!(size = xml.len(), "Header frame written");
        Ok(())
    }

    /// Write an Acquisition frame
    pub fn write_acquisition(&mut self, acq: &Acquisition) -> Result<()> {
        let payload = acq.encode()?;
        self.inner.write_all(&MessageId::Acquisition.to_bytes())?;
        self.inner.write_all(&payload)?;
        self.frames += 1;
        trace!(
            scan_counter = acq.head.scan_counter,
            size = payload.len(),
            "Acquisition frame written"
        );
        Ok(())
    }

    /// Write an Image frame
    pub fn write_image(&mut self, image: &Image) -> Result<()> {
        let payload = image.encode()?;
        self.inner.write_all(&MessageId::Image.to_bytes())?;
        self.inner.write_all(&payload)?;
        self.frames += 1;
        debug!(
            image_index = image.head.image_index,
            slice = image.head.slice,
            contrast = image.head.contrast,
            size = payload.len(),
            "Image frame written"
        );
        Ok(())
    }

    /// Write a Close frame and flush
    pub fn write_close(&mut self) -> Result<()> {
        self.inner.write_all(&encode_close_frame())?;
        self.frames += 1;
        self.inner.flush()?;
        debug!(frames = self.frames, "Close frame written");
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Number of frames written so far
    pub fn frames_written(&self) -> usize {
        self.frames
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
