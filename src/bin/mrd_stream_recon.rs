//! Reconstruct an MRD stream from stdin to stdout
//!
//! ```bash
//! # Default: info level logs on stderr
//! mrd-stream-recon < raw.mrd > images.mrd
//!
//! # Per-acquisition tracing for the accumulator only
//! RUST_LOG=mrd_stream_recon::recon=trace mrd-stream-recon < raw.mrd > images.mrd
//! ```

use std::io::{self, BufReader, BufWriter};
use std::process::ExitCode;

use mrd_stream_recon::StreamReconstructor;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // stdout carries the image stream, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .init();

    let input = BufReader::new(io::stdin().lock());
    let output = BufWriter::new(io::stdout().lock());

    match StreamReconstructor::new().run(input, output) {
        Ok(summary) => {
            info!(%summary, "Stream complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Reconstruction failed");
            eprintln!("mrd-stream-recon: {}", e);
            ExitCode::FAILURE
        }
    }
}
