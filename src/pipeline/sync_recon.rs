//! Blocking stream reconstructor

use std::io::{Read, Write};

use crate::config::ReconConfig;
use crate::error::Result;
use crate::io::{FrameReader, FrameWriter};
use crate::pipeline::images::RepetitionImages;
use crate::pipeline::{ReconState, ReconSummary};
use crate::protocol::frame::ReadOutcome;
use crate::recon::accumulator::{FlushedRepetition, KSpaceAccumulator};
use crate::recon::metadata::EncodingMetadata;
use tracing::{debug, info};

/// Single-threaded reconstruction of one MRD stream
///
/// Reads a header and acquisitions from `input`, writes the header,
/// images and a final Close frame to `output`. Each repetition is
/// reconstructed and written before the next acquisition is read.
///
/// # Examples
///
/// ```no_run
/// use std::io::{BufReader, BufWriter};
/// use mrd_stream_recon::pipeline::StreamReconstructor;
///
/// let input = BufReader::new(std::io::stdin().lock());
/// let output = BufWriter::new(std::io::stdout().lock());
/// let summary = StreamReconstructor::new().run(input, output)?;
/// eprintln!("{}", summary);
/// # Ok::<(), mrd_stream_recon::MrdError>(())
/// ```
#[derive(Debug, Default)]
pub struct StreamReconstructor {
    config: ReconConfig,
    state: ReconState,
}

impl StreamReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReconConfig) -> Self {
        StreamReconstructor {
            config,
            state: ReconState::AwaitingHeader,
        }
    }

    /// State reached by the last run; after an error this is the state the
    /// run failed in
    pub fn state(&self) -> ReconState {
        self.state
    }

    fn enter(&mut self, state: ReconState) {
        debug!(from = %self.state, to = %state, "State transition");
        self.state = state;
    }

    /// Reconstruct the whole stream
    ///
    /// # Errors
    ///
    /// Any [`MrdError`](crate::MrdError) aborts the run. Frames already
    /// written stay written; no Close frame follows them.
    pub fn run<R: Read, W: Write>(&mut self, input: R, output: W) -> Result<ReconSummary> {
        self.state = ReconState::AwaitingHeader;
        let mut reader = FrameReader::with_config(input, &self.config);
        let mut writer = FrameWriter::new(output);
        let mut summary = ReconSummary::default();

        let header = match reader.read_header()? {
            ReadOutcome::Message(header) => header,
            outcome => {
                info!(outcome = ?outcome, "Stream ended before header");
                self.enter(ReconState::Closed);
                writer.write_close()?;
                return Ok(summary);
            }
        };

        let metadata = EncodingMetadata::resolve(header.header())?;
        writer.write_header(header.raw())?;
        self.enter(ReconState::Streaming);

        let mut accumulator = KSpaceAccumulator::new(metadata, self.config.max_volume_bytes);
        loop {
            match reader.read_acquisition()? {
                ReadOutcome::Message(acq) => {
                    summary.acquisitions += 1;
                    if let Some(repetition) = accumulator.ingest(&acq)? {
                        write_repetition(&mut writer, repetition, &metadata, &mut summary)?;
                    }
                }
                outcome => {
                    debug!(outcome = ?outcome, "Acquisition stream ended");
                    break;
                }
            }
        }

        self.enter(ReconState::FlushFinal);
        if let Some(repetition) = accumulator.drain() {
            write_repetition(&mut writer, repetition, &metadata, &mut summary)?;
        }

        writer.write_close()?;
        self.enter(ReconState::Closed);
        info!(
            acquisitions = summary.acquisitions,
            repetitions = summary.repetitions,
            images = summary.images,
            "Reconstruction finished"
        );
        Ok(summary)
    }
}

fn write_repetition<W: Write>(
    writer: &mut FrameWriter<W>,
    repetition: FlushedRepetition,
    metadata: &EncodingMetadata,
    summary: &mut ReconSummary,
) -> Result<()> {
    info!(
        repetition = repetition.repetition,
        acquisitions = repetition.acquisitions,
        "Reconstructing repetition"
    );
    for image in RepetitionImages::new(repetition, metadata, summary.images + 1) {
        writer.write_image(&image?)?;
        summary.images += 1;
    }
    summary.repetitions += 1;
    writer.flush()
}
