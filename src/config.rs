//! Reconstruction run configuration
//!
//! Frame and volume size limits guard the decoder against corrupted length
//! fields and oversized headers, and the async driver can overlap reconstruction of one repetition with the
//! acquisition of the next.

/// Configuration shared by the sync and async stream reconstructors
///
/// # Examples
///
/// ```
/// use mrd_stream_recon::config::ReconConfig;
///
/// let config = ReconConfig::default()
///     .with_max_header_bytes(1 << 20)
///     .with_double_buffering(false);
/// assert_eq!(config.max_header_bytes, 1 << 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconConfig {
    /// Largest accepted XML header payload in bytes
    pub max_header_bytes: usize,
    /// Largest accepted acquisition or image payload in bytes
    pub max_frame_bytes: usize,
    /// Largest k-space volume allocated for one repetition, in bytes
    pub max_volume_bytes: usize,
    /// Let the async driver fill the next repetition while the previous one
    /// is reconstructed on a blocking worker
    pub double_buffering: bool,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: 16 * 1024 * 1024,
            max_frame_bytes: 1024 * 1024 * 1024,
            max_volume_bytes: 4 * 1024 * 1024 * 1024,
            double_buffering: true,
        }
    }
}

impl ReconConfig {
    /// Strictly sequential processing with default limits
    ///
    /// Each repetition is reconstructed and written before the next
    /// acquisition is read.
    pub fn sequential() -> Self {
        Self {
            double_buffering: false,
            ..Self::default()
        }
    }

    /// Set the maximum XML header size
    pub fn with_max_header_bytes(mut self, bytes: usize) -> Self {
        self.max_header_bytes = bytes;
        self
    }

    /// Set the maximum acquisition/image payload size
    pub fn with_max_frame_bytes(mut self, bytes: usize) -> Self {
        self.max_frame_bytes = bytes;
        self
    }

    /// Set the maximum k-space volume size
    pub fn with_max_volume_bytes(mut self, bytes: usize) -> Self {
        self.max_volume_bytes = bytes;
        self
    }

    /// Enable or disable double buffering in the async driver
    pub fn with_double_buffering(mut self, enabled: bool) -> Self {
        self.double_buffering = enabled;
        self
    }
}
