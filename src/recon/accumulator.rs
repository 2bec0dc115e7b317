//! K-space accumulation across repetitions
//!
//! Acquisitions of one repetition are written into a single zero-filled
//! volume. The first acquisition carrying a different repetition counter
//! hands the filled volume back to the caller and starts a fresh one.

use crate::error::{MrdError, Result};
use crate::protocol::acquisition::{Acquisition, AcquisitionHeader};
use crate::recon::metadata::EncodingMetadata;
use ndarray::{s, Array6};
use num_complex::Complex32;
use std::mem;
use tracing::{debug, trace};

/// Complex k-space buffer `[contrast, slice, coil, kz, ky, readout]`
#[derive(Debug, Clone, PartialEq)]
pub struct KSpaceVolume {
    data: Array6<Complex32>,
}

impl KSpaceVolume {
    /// Allocate a zero-filled volume
    pub fn zeros(shape: [usize; 6]) -> Self {
        KSpaceVolume {
            data: Array6::zeros(shape),
        }
    }

    /// Allocate a zero-filled volume of at most `max_bytes`
    ///
    /// # Errors
    ///
    /// - [`MrdError::BodyTooLarge`] - the volume would exceed `max_bytes`, or
    ///   its size does not fit in `usize`
    pub fn try_zeros(shape: [usize; 6], max_bytes: usize) -> Result<Self> {
        let size = Self::byte_size(shape).unwrap_or(usize::MAX);
        let max = max_bytes.min(isize::MAX as usize);
        if size > max {
            return Err(MrdError::BodyTooLarge { size, max });
        }
        Ok(Self::zeros(shape))
    }

    /// Size in bytes of a volume of `shape`, `None` on overflow
    pub fn byte_size(shape: [usize; 6]) -> Option<usize> {
        shape
            .iter()
            .try_fold(mem::size_of::<Complex32>(), |acc, &n| acc.checked_mul(n))
    }

    /// Wrap an existing array
    pub fn from_array(data: Array6<Complex32>) -> Self {
        KSpaceVolume { data }
    }

    /// Volume shape
    pub fn shape(&self) -> [usize; 6] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3], s[4], s[5]]
    }

    /// Number of readout samples per line
    pub fn readout_length(&self) -> usize {
        self.data.shape()[5]
    }

    /// True when the volume has more than one partition (kz) line
    pub fn is_3d(&self) -> bool {
        self.data.shape()[3] > 1
    }

    pub fn data(&self) -> &Array6<Complex32> {
        &self.data
    }

    pub fn into_array(self) -> Array6<Complex32> {
        self.data
    }

    /// Write one acquisition at (contrast, slice, :, kz, ky + ky_offset, :)
    ///
    /// A line written twice keeps the last samples.
    pub fn insert(&mut self, acq: &Acquisition, ky_offset: i64) -> Result<()> {
        let [contrasts, slices, coils, nz, ny, readout] = self.shape();
        let (acq_coils, acq_samples) = acq.data.dim();
        if acq_coils != coils || acq_samples != readout {
            return Err(MrdError::AcquisitionShape {
                expected_coils: coils,
                expected_samples: readout,
                coils: acq_coils,
                samples: acq_samples,
            });
        }

        let idx = &acq.head.idx;
        let contrast = check_index("contrast", idx.contrast as i64, contrasts)?;
        let slice = check_index("slice", idx.slice as i64, slices)?;
        let kz = check_index("kz", idx.kspace_encode_step_2 as i64, nz)?;
        let ky = check_index("ky", idx.kspace_encode_step_1 as i64 + ky_offset, ny)?;

        self.data
            .slice_mut(s![contrast, slice, .., kz, ky, ..])
            .assign(&acq.data);
        Ok(())
    }
}

fn check_index(axis: &'static str, index: i64, size: usize) -> Result<usize> {
    if index < 0 || index >= size as i64 {
        return Err(MrdError::KSpaceIndexOutOfRange { axis, index, size });
    }
    Ok(index as usize)
}

/// A completed repetition handed back for reconstruction
#[derive(Debug, Clone, PartialEq)]
pub struct FlushedRepetition {
    pub repetition: u16,
    /// Header of the first acquisition of the repetition
    pub reference: AcquisitionHeader,
    pub kspace: KSpaceVolume,
    /// Number of acquisitions written into the volume
    pub acquisitions: usize,
}

/// Owns the single live k-space volume of the stream
#[derive(Debug)]
pub struct KSpaceAccumulator {
    metadata: EncodingMetadata,
    max_volume_bytes: usize,
    current: Option<FlushedRepetition>,
}

impl KSpaceAccumulator {
    /// Accumulator refusing volumes larger than `max_volume_bytes`
    pub fn new(metadata: EncodingMetadata, max_volume_bytes: usize) -> Self {
        KSpaceAccumulator {
            metadata,
            max_volume_bytes,
            current: None,
        }
    }

    pub fn metadata(&self) -> &EncodingMetadata {
        &self.metadata
    }

    /// Repetition currently being filled, if any
    pub fn current_repetition(&self) -> Option<u16> {
        self.current.as_ref().map(|rep| rep.repetition)
    }

    /// Add an acquisition to the current repetition
    ///
    /// Returns the previous repetition when `acq` starts a new one. The new
    /// volume is shaped from the metadata and from `acq`'s sample count, and
    /// `acq` becomes its reference acquisition.
    ///
    /// # Errors
    ///
    /// - [`MrdError::BodyTooLarge`] - the new volume exceeds the size limit
    /// - [`MrdError::AcquisitionShape`] - coil or sample count mismatch
    /// - [`MrdError::KSpaceIndexOutOfRange`] - a counter falls outside the volume
    pub fn ingest(&mut self, acq: &Acquisition) -> Result<Option<FlushedRepetition>> {
        let repetition = acq.repetition();
        let flushed = if self.current_repetition() != Some(repetition) {
            let readout = self.metadata.readout_length(acq.number_of_samples());
            let shape = self.metadata.kspace_shape(readout);
            let kspace = KSpaceVolume::try_zeros(shape, self.max_volume_bytes)?;
            let previous = self.current.take();
            debug!(
                repetition = repetition,
                shape = ?shape,
                flushing = previous.is_some(),
                "Starting new repetition"
            );
            self.current = Some(FlushedRepetition {
                repetition,
                reference: acq.head.clone(),
                kspace,
                acquisitions: 0,
            });
            previous
        } else {
            None
        };

        if let Some(current) = self.current.as_mut() {
            current.kspace.insert(acq, self.metadata.ky_offset)?;
            current.acquisitions += 1;
            trace!(
                repetition = repetition,
                ky = acq.head.idx.kspace_encode_step_1,
                kz = acq.head.idx.kspace_encode_step_2,
                slice = acq.head.idx.slice,
                contrast = acq.head.idx.contrast,
                "Acquisition stored"
            );
        }

        Ok(flushed)
    }

    /// Hand back the repetition in progress at end of stream
    pub fn drain(&mut self) -> Option<FlushedRepetition> {
        self.current.take()
    }
}
