//! Stream reconstruction drivers
//!
//! A run moves through four states:
//!
//! ```text
//! AwaitingHeader --header--> Streaming --Close / end of input--> FlushFinal --> Closed
//! ```
//!
//! The header is echoed to the output unchanged, every completed repetition
//! is reconstructed into images as soon as the next one starts, and the
//! output always ends with a Close frame.

pub mod async_recon;
pub mod images;
pub mod sync_recon;

pub use async_recon::AsyncStreamReconstructor;
pub use images::RepetitionImages;
pub use sync_recon::StreamReconstructor;

use std::fmt;

/// Phase of a reconstruction run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconState {
    /// Waiting for the XML header frame
    #[default]
    AwaitingHeader,
    /// Accumulating acquisitions and emitting completed repetitions
    Streaming,
    /// Input ended; reconstructing the repetition still in progress
    FlushFinal,
    /// Close frame written
    Closed,
}

impl fmt::Display for ReconState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconState::AwaitingHeader => "awaiting-header",
            ReconState::Streaming => "streaming",
            ReconState::FlushFinal => "flush-final",
            ReconState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconSummary {
    /// Acquisition frames consumed
    pub acquisitions: usize,
    /// Repetitions reconstructed
    pub repetitions: usize,
    /// Image frames written
    pub images: usize,
}

impl fmt::Display for ReconSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} acquisitions, {} repetitions, {} images",
            self.acquisitions, self.repetitions, self.images
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(ReconState::default(), ReconState::AwaitingHeader);
        assert_eq!(ReconState::FlushFinal.to_string(), "flush-final");
    }

    #[test]
    fn test_summary_display() {
        let summary = ReconSummary {
            acquisitions: 128,
            repetitions: 2,
            images: 2,
        };
        assert_eq!(
            summary.to_string(),
            "128 acquisitions, 2 repetitions, 2 images"
        );
    }
}
