//! Error types for MRD stream reconstruction
//!
//! This module defines all error types that can occur while decoding the
//! framed MRD stream, resolving encoding metadata, filling k-space and
//! producing images. Every variant is fatal: a run that hits one stops
//! immediately instead of emitting partial or garbled images.

use thiserror::Error;

/// MRD stream reconstruction error types
///
/// All operations in this library return `Result<T, MrdError>`.
/// Stream termination by a Close frame or by end of input is *not* an
/// error; it is reported through [`ReadOutcome`](crate::protocol::ReadOutcome).
#[derive(Error, Debug)]
pub enum MrdError {
    /// The input ended in the middle of a frame
    ///
    /// This error occurs when:
    /// - Only one byte of a 2-byte message id is available
    /// - A header length prefix, acquisition or image payload is cut short
    ///
    /// # Example
    /// ```no_run
    /// # use mrd_stream_recon::error::MrdError;
    /// let err = MrdError::TruncatedStream { expected: 340, actual: 12 };
    /// ```
    #[error("Truncated stream: expected {expected} bytes, got {actual}")]
    TruncatedStream {
        /// Number of bytes the frame requires
        expected: usize,
        /// Number of bytes actually available
        actual: usize,
    },

    /// A message id arrived that is not valid at this point of the stream
    ///
    /// For example an IMAGE frame where an ACQUISITION was expected, or a
    /// second HEADER in the middle of the acquisition stream.
    #[error("Unexpected message id {got}, expected {expected}")]
    ProtocolMismatch {
        /// Id read from the stream
        got: u16,
        /// Id required by the current state
        expected: u16,
    },

    /// The XML header lacks the matrix sizes needed to allocate k-space
    ///
    /// Nothing can be reconstructed without the encoded and recon spaces.
    #[error("Required encoding information not found in header: {0}")]
    MissingEncodingInfo(String),

    /// XML header is empty or cannot be parsed
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Acquisition samples do not fit the allocated k-space volume
    ///
    /// The volume is shaped from the header and the first acquisition of the
    /// repetition; every later acquisition must carry the same number of coils
    /// and readout samples.
    #[error("Acquisition shape mismatch: expected {expected_coils}x{expected_samples} (coils x samples), got {coils}x{samples}")]
    AcquisitionShape {
        /// Coil count of the volume
        expected_coils: usize,
        /// Readout length of the volume
        expected_samples: usize,
        /// Active channels of the acquisition
        coils: usize,
        /// Samples of the acquisition
        samples: usize,
    },

    /// Acquisition index lies outside the allocated k-space volume
    #[error("K-space index out of range: {axis} = {index}, size {size}")]
    KSpaceIndexOutOfRange {
        /// Name of the offending axis (contrast, slice, kz, ky)
        axis: &'static str,
        /// Index after applying offsets
        index: i64,
        /// Extent of that axis in the volume
        size: usize,
    },

    /// Requested output matrix is larger than the reconstructed image
    #[error("Crop out of bounds on axis {axis}: target {target} exceeds image size {size}")]
    CropOutOfBounds {
        /// Axis index after squeezing
        axis: usize,
        /// Image extent along the axis
        size: usize,
        /// Requested extent
        target: usize,
    },

    /// Image rank after squeezing singleton axes is not 2 or 3
    #[error("Unsupported image rank {0}, expected 2 or 3")]
    UnsupportedRank(usize),

    /// Image header declares an unknown pixel data type
    #[error("Invalid image data type: {0}")]
    InvalidDataType(u16),

    /// Buffer size does not match the size implied by a header
    ///
    /// # Example
    /// ```no_run
    /// # use mrd_stream_recon::error::MrdError;
    /// let err = MrdError::InvalidSize { expected: 198, actual: 120 };
    /// ```
    #[error("Invalid size: expected {expected}, got {actual}")]
    InvalidSize {
        /// Expected size in bytes or elements
        expected: usize,
        /// Actual size in bytes or elements
        actual: usize,
    },

    /// Frame payload exceeds the configured maximum
    ///
    /// Protects against allocating gigabytes because of a corrupted length
    /// field. Limits are set through [`ReconConfig`](crate::config::ReconConfig).
    #[error("Frame too large: {size} bytes (max: {max})")]
    BodyTooLarge {
        /// Declared payload size in bytes
        size: usize,
        /// Maximum allowed size in bytes
        max: usize,
    },

    /// Background reconstruction task panicked or was cancelled
    #[error("Reconstruction task failed: {0}")]
    TaskFailed(String),

    /// I/O error on the input or output stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for MRD reconstruction operations
pub type Result<T> = std::result::Result<T, MrdError>;
