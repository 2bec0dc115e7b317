//! Asynchronous stream reconstructor
//!
//! Frames are read and written on the async runtime while the Fourier
//! transforms run on Tokio's blocking pool. With double buffering enabled
//! the next repetition keeps filling while the previous one is being
//! reconstructed; its images are still written before any later frame.

use crate::config::ReconConfig;
use crate::error::{MrdError, Result};
use crate::io::{AsyncFrameReader, AsyncFrameWriter};
use crate::pipeline::images::RepetitionImages;
use crate::pipeline::{ReconState, ReconSummary};
use crate::protocol::frame::ReadOutcome;
use crate::protocol::image::Image;
use crate::recon::accumulator::{FlushedRepetition, KSpaceAccumulator};
use crate::recon::metadata::EncodingMetadata;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, info};

type ImageBatch = JoinHandle<Result<Vec<Image>>>;

/// Asynchronous reconstruction of one MRD stream
///
/// Produces exactly the same output bytes as
/// [`StreamReconstructor`](super::StreamReconstructor).
///
/// # Examples
///
/// ```no_run
/// use mrd_stream_recon::pipeline::AsyncStreamReconstructor;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let summary = AsyncStreamReconstructor::new()
///         .run(tokio::io::stdin(), tokio::io::stdout())
///         .await?;
///     eprintln!("{}", summary);
///     Ok(())
/// }
/// ```
#[derive(Debug, Default)]
pub struct AsyncStreamReconstructor {
    config: ReconConfig,
    state: ReconState,
}

impl AsyncStreamReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReconConfig) -> Self {
        AsyncStreamReconstructor {
            config,
            state: ReconState::AwaitingHeader,
        }
    }

    pub fn state(&self) -> ReconState {
        self.state
    }

    fn enter(&mut self, state: ReconState) {
        debug!(from = %self.state, to = %state, "State transition (async)");
        self.state = state;
    }

    /// Reconstruct the whole stream
    pub async fn run<R, W>(&mut self, input: R, output: W) -> Result<ReconSummary>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.state = ReconState::AwaitingHeader;
        let mut reader = AsyncFrameReader::with_config(input, &self.config);
        let mut writer = AsyncFrameWriter::new(output);
        let mut summary = ReconSummary::default();

        let header = match reader.read_header().await? {
            ReadOutcome::Message(header) => header,
            outcome => {
                info!(outcome = ?outcome, "Stream ended before header (async)");
                self.enter(ReconState::Closed);
                writer.write_close().await?;
                return Ok(summary);
            }
        };

        let metadata = EncodingMetadata::resolve(header.header())?;
        writer.write_header(header.raw()).await?;
        self.enter(ReconState::Streaming);

        let mut accumulator = KSpaceAccumulator::new(metadata, self.config.max_volume_bytes);
        let mut pending: Option<ImageBatch> = None;
        // index of the first image of the next scheduled batch
        let mut next_index = 1;

        loop {
            match reader.read_acquisition().await? {
                ReadOutcome::Message(acq) => {
                    summary.acquisitions += 1;
                    if let Some(repetition) = accumulator.ingest(&acq)? {
                        if let Some(batch) = pending.take() {
                            write_batch(&mut writer, batch, &mut summary).await?;
                        }
                        let batch = spawn_batch(repetition, metadata, &mut next_index);
                        if self.config.double_buffering {
                            pending = Some(batch);
                        } else {
                            write_batch(&mut writer, batch, &mut summary).await?;
                        }
                    }
                }
                outcome => {
                    debug!(outcome = ?outcome, "Acquisition stream ended (async)");
                    break;
                }
            }
        }

        self.enter(ReconState::FlushFinal);
        if let Some(batch) = pending.take() {
            write_batch(&mut writer, batch, &mut summary).await?;
        }
        if let Some(repetition) = accumulator.drain() {
            let batch = spawn_batch(repetition, metadata, &mut next_index);
            write_batch(&mut writer, batch, &mut summary).await?;
        }

        writer.write_close().await?;
        self.enter(ReconState::Closed);
        info!(
            acquisitions = summary.acquisitions,
            repetitions = summary.repetitions,
            images = summary.images,
            "Reconstruction finished (async)"
        );
        Ok(summary)
    }
}

fn spawn_batch(
    repetition: FlushedRepetition,
    metadata: EncodingMetadata,
    next_index: &mut usize,
) -> ImageBatch {
    info!(
        repetition = repetition.repetition,
        acquisitions = repetition.acquisitions,
        "Reconstructing repetition (async)"
    );
    let first_index = *next_index;
    *next_index += metadata.images_per_repetition();
    tokio::task::spawn_blocking(move || {
        RepetitionImages::new(repetition, &metadata, first_index).collect::<Result<Vec<_>>>()
    })
}

async fn write_batch<W: AsyncWrite + Unpin>(
    writer: &mut AsyncFrameWriter<W>,
    batch: ImageBatch,
    summary: &mut ReconSummary,
) -> Result<()> {
    let images = batch
        .await
        .map_err(|e| MrdError::TaskFailed(e.to_string()))??;
    for image in &images {
        writer.write_image(image).await?;
        summary.images += 1;
    }
    summary.repetitions += 1;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::encode_close_frame;

    #[tokio::test]
    async fn test_empty_input_writes_close_only() {
        let mut recon = AsyncStreamReconstructor::new();
        let mut output = Vec::new();
        let summary = recon.run(tokio::io::empty(), &mut output).await.unwrap();

        assert_eq!(summary, ReconSummary::default());
        assert_eq!(output, encode_close_frame());
        assert_eq!(recon.state(), ReconState::Closed);
    }

    #[tokio::test]
    async fn test_protocol_mismatch_before_header() {
        let bytes = crate::protocol::frame::MessageId::Acquisition.to_bytes();
        let mut output = Vec::new();
        let result = AsyncStreamReconstructor::new()
            .run(&bytes[..], &mut output)
            .await;
        assert!(matches!(
            result,
            Err(MrdError::ProtocolMismatch {
                got: 1008,
                expected: 3
            })
        ));
    }
}
