//! Streaming MRD k-space to image reconstruction
//!
//! This library turns a stream of raw multi-coil MR acquisitions, framed in
//! the ISMRMRD streaming protocol, into coil-combined magnitude images sent
//! back over the same protocol.
//!
//! # Features
//!
//! - **Framed protocol codec** - Header, Acquisition, Image and Close frames
//! - **Per-repetition accumulation** - one live k-space volume, flushed when the
//!   repetition counter changes
//! - **Unitary inverse FFT** - centered 2-D or 3-D transform with `rustfft`
//! - **Root-sum-of-squares coil combination** and center cropping to the recon
//!   matrix
//! - **Synchronous and asynchronous drivers** - `std::io` or Tokio streams
//!
//! # Quick Start
//!
//! ## Reconstructing stdin to stdout
//!
//! ```no_run
//! use std::io::{BufReader, BufWriter};
//! use mrd_stream_recon::StreamReconstructor;
//!
//! let input = BufReader::new(std::io::stdin().lock());
//! let output = BufWriter::new(std::io::stdout().lock());
//! let summary = StreamReconstructor::new().run(input, output)?;
//! eprintln!("Done: {}", summary);
//! # Ok::<(), mrd_stream_recon::MrdError>(())
//! ```
//!
//! ## Async pipelines
//!
//! ```no_run
//! use mrd_stream_recon::{AsyncStreamReconstructor, ReconConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReconConfig::default().with_double_buffering(true);
//!     let mut recon = AsyncStreamReconstructor::with_config(config);
//!     recon.run(tokio::io::stdin(), tokio::io::stdout()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Producing an input stream
//!
//! ```no_run
//! use mrd_stream_recon::io::FrameWriter;
//! use mrd_stream_recon::protocol::{Acquisition, AcquisitionHeader};
//! use ndarray::Array2;
//! use num_complex::Complex32;
//!
//! let mut writer = FrameWriter::new(std::io::stdout().lock());
//! writer.write_header(std::fs::read("header.xml")?.as_slice())?;
//!
//! for ky in 0..64u16 {
//!     let mut head = AcquisitionHeader::default();
//!     head.idx.kspace_encode_step_1 = ky;
//!     let samples = Array2::<Complex32>::zeros((8, 128));
//!     writer.write_acquisition(&Acquisition::new(head, samples)?)?;
//! }
//! writer.write_close()?;
//! # Ok::<(), mrd_stream_recon::MrdError>(())
//! ```
//!
//! # Architecture
//!
//! ## Module Structure
//!
//! - **`protocol`** - Wire formats
//!   - `frame` - message ids, `ReadOutcome`, frame length checks
//!   - `header` - XML header subset (serde + quick-xml)
//!   - `acquisition` - 340-byte acquisition header and sample payload
//!   - `image` - 198-byte image header and pixel payload
//!
//! - **`io`** - Frame readers and writers
//!   - `FrameReader` / `FrameWriter` - blocking
//!   - `AsyncFrameReader` / `AsyncFrameWriter` - Tokio
//!
//! - **`recon`** - Reconstruction
//!   - `metadata` - `EncodingMetadata` resolved from the header
//!   - `accumulator` - `KSpaceAccumulator` and `KSpaceVolume`
//!   - `fourier` - centered inverse FFT and RSS coil combination
//!   - `crop` - field-of-view cropping
//!
//! - **`pipeline`** - `StreamReconstructor` / `AsyncStreamReconstructor`
//!
//! - **`config`** - `ReconConfig`
//!
//! - **`error`** - Error handling
//!   - `MrdError` - Unified error type for all operations
//!   - `Result<T>` - Type alias for `Result<T, MrdError>`
//!
//! # Error Handling
//!
//! All operations return `Result<T, MrdError>`. Every error is fatal to the
//! run. A Close frame or the end of input is not an error; readers report it
//! as [`ReadOutcome::Closed`](protocol::ReadOutcome::Closed) or
//! [`ReadOutcome::EndOfStream`](protocol::ReadOutcome::EndOfStream).
//!
//! ```no_run
//! use mrd_stream_recon::{MrdError, StreamReconstructor};
//!
//! match StreamReconstructor::new().run(std::io::stdin(), std::io::stdout()) {
//!     Ok(summary) => eprintln!("{}", summary),
//!     Err(MrdError::ProtocolMismatch { got, expected }) => {
//!         eprintln!("Unexpected frame {} (wanted {})", got, expected)
//!     }
//!     Err(e) => eprintln!("Reconstruction failed: {}", e),
//! }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod protocol;
pub mod recon;

// Re-export commonly used types
pub use config::ReconConfig;
pub use error::{MrdError, Result};
pub use pipeline::{AsyncStreamReconstructor, ReconState, ReconSummary, StreamReconstructor};
