//! Acquisition frame (id 1008)
//!
//! One acquisition is a single readout line from all active receiver coils,
//! together with the encoding counters that place it in k-space.
//!
//! # Wire layout (little-endian)
//! - Fixed header: 340 bytes ([`AcquisitionHeader`])
//! - Trajectory: `f32[trajectory_dimensions * number_of_samples]`
//! - Samples: `f32[2 * number_of_samples * active_channels]`, coil-major,
//!   interleaved real/imaginary

use crate::error::{MrdError, Result};
use bytes::{Buf, BufMut};
use ndarray::Array2;
use num_complex::Complex32;

/// Encoding counters placing an acquisition in k-space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodingCounters {
    /// Phase encoding line (ky)
    pub kspace_encode_step_1: u16,
    /// Partition encoding line (kz)
    pub kspace_encode_step_2: u16,
    pub average: u16,
    pub slice: u16,
    pub contrast: u16,
    pub phase: u16,
    pub repetition: u16,
    pub set: u16,
    pub segment: u16,
    pub user: [u16; 8],
}

impl EncodingCounters {
    /// Encoded size in bytes
    pub const SIZE: usize = 34;

    fn decode(buf: &mut &[u8]) -> Self {
        let mut counters = EncodingCounters {
            kspace_encode_step_1: buf.get_u16_le(),
            kspace_encode_step_2: buf.get_u16_le(),
            average: buf.get_u16_le(),
            slice: buf.get_u16_le(),
            contrast: buf.get_u16_le(),
            phase: buf.get_u16_le(),
            repetition: buf.get_u16_le(),
            set: buf.get_u16_le(),
            segment: buf.get_u16_le(),
            user: [0; 8],
        };
        for v in &mut counters.user {
            *v = buf.get_u16_le();
        }
        counters
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u16_le(self.kspace_encode_step_1);
        buf.put_u16_le(self.kspace_encode_step_2);
        buf.put_u16_le(self.average);
        buf.put_u16_le(self.slice);
        buf.put_u16_le(self.contrast);
        buf.put_u16_le(self.phase);
        buf.put_u16_le(self.repetition);
        buf.put_u16_le(self.set);
        buf.put_u16_le(self.segment);
        for &v in &self.user {
            buf.put_u16_le(v);
        }
    }
}

/// Fixed-size acquisition header (340 bytes)
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionHeader {
    pub version: u16,
    pub flags: u64,
    pub measurement_uid: u32,
    pub scan_counter: u32,
    pub acquisition_time_stamp: u32,
    pub physiology_time_stamp: [u32; 3],
    pub number_of_samples: u16,
    pub available_channels: u16,
    pub active_channels: u16,
    pub channel_mask: [u64; 16],
    pub discard_pre: u16,
    pub discard_post: u16,
    pub center_sample: u16,
    pub encoding_space_ref: u16,
    pub trajectory_dimensions: u16,
    pub sample_time_us: f32,
    pub position: [f32; 3],
    pub read_dir: [f32; 3],
    pub phase_dir: [f32; 3],
    pub slice_dir: [f32; 3],
    pub patient_table_position: [f32; 3],
    pub idx: EncodingCounters,
    pub user_int: [i32; 8],
    pub user_float: [f32; 8],
}

impl Default for AcquisitionHeader {
    fn default() -> Self {
        AcquisitionHeader {
            version: 1,
            flags: 0,
            measurement_uid: 0,
            scan_counter: 0,
            acquisition_time_stamp: 0,
            physiology_time_stamp: [0; 3],
            number_of_samples: 0,
            available_channels: 0,
            active_channels: 0,
            channel_mask: [0; 16],
            discard_pre: 0,
            discard_post: 0,
            center_sample: 0,
            encoding_space_ref: 0,
            trajectory_dimensions: 0,
            sample_time_us: 0.0,
            position: [0.0; 3],
            read_dir: [0.0; 3],
            phase_dir: [0.0; 3],
            slice_dir: [0.0; 3],
            patient_table_position: [0.0; 3],
            idx: EncodingCounters::default(),
            user_int: [0; 8],
            user_float: [0.0; 8],
        }
    }
}

fn get_f32x3(buf: &mut &[u8]) -> [f32; 3] {
    [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()]
}

fn put_f32x3(buf: &mut Vec<u8>, values: &[f32; 3]) {
    for &v in values {
        buf.put_f32_le(v);
    }
}

impl AcquisitionHeader {
    /// Header size in bytes
    pub const SIZE: usize = 340;

    /// Decode a header from a byte slice of at least [`Self::SIZE`] bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(MrdError::InvalidSize {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }

        let mut buf = &data[..Self::SIZE];
        let version = buf.get_u16_le();
        let flags = buf.get_u64_le();
        let measurement_uid = buf.get_u32_le();
        let scan_counter = buf.get_u32_le();
        let acquisition_time_stamp = buf.get_u32_le();
        let physiology_time_stamp = [buf.get_u32_le(), buf.get_u32_le(), buf.get_u32_le()];
        let number_of_samples = buf.get_u16_le();
        let available_channels = buf.get_u16_le();
        let active_channels = buf.get_u16_le();
        let mut channel_mask = [0u64; 16];
        for mask in &mut channel_mask {
            *mask = buf.get_u64_le();
        }
        let discard_pre = buf.get_u16_le();
        let discard_post = buf.get_u16_le();
        let center_sample = buf.get_u16_le();
        let encoding_space_ref = buf.get_u16_le();
        let trajectory_dimensions = buf.get_u16_le();
        let sample_time_us = buf.get_f32_le();
        let position = get_f32x3(&mut buf);
        let read_dir = get_f32x3(&mut buf);
        let phase_dir = get_f32x3(&mut buf);
        let slice_dir = get_f32x3(&mut buf);
        let patient_table_position = get_f32x3(&mut buf);
        let idx = EncodingCounters::decode(&mut buf);
        let mut user_int = [0i32; 8];
        for v in &mut user_int {
            *v = buf.get_i32_le();
        }
        let mut user_float = [0f32; 8];
        for v in &mut user_float {
            *v = buf.get_f32_le();
        }

        Ok(AcquisitionHeader {
            version,
            flags,
            measurement_uid,
            scan_counter,
            acquisition_time_stamp,
            physiology_time_stamp,
            number_of_samples,
            available_channels,
            active_channels,
            channel_mask,
            discard_pre,
            discard_post,
            center_sample,
            encoding_space_ref,
            trajectory_dimensions,
            sample_time_us,
            position,
            read_dir,
            phase_dir,
            slice_dir,
            patient_table_position,
            idx,
            user_int,
            user_float,
        })
    }

    /// Append the 340-byte encoding to `buf`
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.put_u16_le(self.version);
        buf.put_u64_le(self.flags);
        buf.put_u32_le(self.measurement_uid);
        buf.put_u32_le(self.scan_counter);
        buf.put_u32_le(self.acquisition_time_stamp);
        for &ts in &self.physiology_time_stamp {
            buf.put_u32_le(ts);
        }
        buf.put_u16_le(self.number_of_samples);
        buf.put_u16_le(self.available_channels);
        buf.put_u16_le(self.active_channels);
        for &mask in &self.channel_mask {
            buf.put_u64_le(mask);
        }
        buf.put_u16_le(self.discard_pre);
        buf.put_u16_le(self.discard_post);
        buf.put_u16_le(self.center_sample);
        buf.put_u16_le(self.encoding_space_ref);
        buf.put_u16_le(self.trajectory_dimensions);
        buf.put_f32_le(self.sample_time_us);
        put_f32x3(buf, &self.position);
        put_f32x3(buf, &self.read_dir);
        put_f32x3(buf, &self.phase_dir);
        put_f32x3(buf, &self.slice_dir);
        put_f32x3(buf, &self.patient_table_position);
        self.idx.encode(buf);
        for &v in &self.user_int {
            buf.put_i32_le(v);
        }
        for &v in &self.user_float {
            buf.put_f32_le(v);
        }
    }

    /// Number of trajectory values following the header
    pub fn trajectory_len(&self) -> usize {
        self.trajectory_dimensions as usize * self.number_of_samples as usize
    }

    /// Number of complex samples (all coils) following the trajectory
    pub fn sample_count(&self) -> usize {
        self.number_of_samples as usize * self.active_channels as usize
    }

    /// Size in bytes of the trajectory and sample payload after the header
    pub fn payload_len(&self) -> usize {
        self.trajectory_len() * 4 + self.sample_count() * 8
    }
}

/// Decoded acquisition: header, optional trajectory, complex samples
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub head: AcquisitionHeader,
    /// Trajectory values, `trajectory_dimensions` per sample
    pub trajectory: Vec<f32>,
    /// Samples shaped `[active_channels, number_of_samples]`
    pub data: Array2<Complex32>,
}

impl Acquisition {
    /// Create an acquisition from samples shaped `[coils, samples]`
    ///
    /// Sample and channel counts in the header are filled in from `data`.
    pub fn new(mut head: AcquisitionHeader, data: Array2<Complex32>) -> Result<Self> {
        let (coils, samples) = data.dim();
        head.active_channels = u16::try_from(coils).map_err(|_| MrdError::InvalidSize {
            expected: u16::MAX as usize,
            actual: coils,
        })?;
        head.number_of_samples = u16::try_from(samples).map_err(|_| MrdError::InvalidSize {
            expected: u16::MAX as usize,
            actual: samples,
        })?;
        if head.available_channels < head.active_channels {
            head.available_channels = head.active_channels;
        }
        head.trajectory_dimensions = 0;
        Ok(Acquisition {
            head,
            trajectory: Vec::new(),
            data,
        })
    }

    /// Repetition counter of this acquisition
    pub fn repetition(&self) -> u16 {
        self.head.idx.repetition
    }

    /// Number of readout samples per coil
    pub fn number_of_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Number of coils carried by this acquisition
    pub fn active_channels(&self) -> usize {
        self.data.nrows()
    }

    /// Decode the trajectory and samples that follow an already decoded header
    pub fn decode_payload(head: AcquisitionHeader, payload: &[u8]) -> Result<Self> {
        let expected = head.payload_len();
        if payload.len() != expected {
            return Err(MrdError::InvalidSize {
                expected,
                actual: payload.len(),
            });
        }

        let mut buf = payload;
        let trajectory = (0..head.trajectory_len())
            .map(|_| buf.get_f32_le())
            .collect::<Vec<_>>();

        let coils = head.active_channels as usize;
        let samples = head.number_of_samples as usize;
        let values = (0..coils * samples)
            .map(|_| {
                let re = buf.get_f32_le();
                let im = buf.get_f32_le();
                Complex32::new(re, im)
            })
            .collect::<Vec<_>>();
        let data = Array2::from_shape_vec((coils, samples), values).map_err(|_| {
            MrdError::InvalidSize {
                expected: coils * samples,
                actual: payload.len() / 8,
            }
        })?;

        Ok(Acquisition {
            head,
            trajectory,
            data,
        })
    }

    /// Decode a full acquisition payload (header + trajectory + samples)
    pub fn decode(data: &[u8]) -> Result<Self> {
        let head = AcquisitionHeader::decode(data)?;
        Self::decode_payload(head, &data[AcquisitionHeader::SIZE..])
    }

    /// Encode header, trajectory and samples (without the message id)
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (coils, samples) = self.data.dim();
        if coils != self.head.active_channels as usize
            || samples != self.head.number_of_samples as usize
        {
            return Err(MrdError::InvalidSize {
                expected: self.head.sample_count(),
                actual: coils * samples,
            });
        }
        if self.trajectory.len() != self.head.trajectory_len() {
            return Err(MrdError::InvalidSize {
                expected: self.head.trajectory_len(),
                actual: self.trajectory.len(),
            });
        }

        let mut buf = Vec::with_capacity(AcquisitionHeader::SIZE + self.head.payload_len());
        self.head.encode_into(&mut buf);
        for &t in &self.trajectory {
            buf.put_f32_le(t);
        }
        // Standard layout iteration is coil-major, matching the wire order
        for value in self.data.iter() {
            buf.put_f32_le(value.re);
            buf.put_f32_le(value.im);
        }
        Ok(buf)
    }
}
