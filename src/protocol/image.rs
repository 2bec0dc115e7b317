//! Image frame (id 1022)
//!
//! Reconstructed images leave the pipeline as IMAGE frames. The pixel data
//! is stored x-fastest, followed by y, z and channel.
//!
//! # Wire layout (little-endian)
//! - Fixed header: 198 bytes ([`ImageHeader`])
//! - Attribute string length: `u64`
//! - Attribute string: UTF-8 bytes
//! - Pixel data: `matrix_size[0] * matrix_size[1] * matrix_size[2] * channels`
//!   values of [`ImageDataType`]

use crate::error::{MrdError, Result};
use crate::protocol::acquisition::AcquisitionHeader;
use bytes::{Buf, BufMut};
use ndarray::ArrayD;

/// Pixel data type of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ImageDataType {
    Ushort = 1,
    Short = 2,
    Uint = 3,
    Int = 4,
    Float = 5,
    Double = 6,
    CxFloat = 7,
    CxDouble = 8,
}

impl ImageDataType {
    /// Get size in bytes of one pixel value
    pub fn size(&self) -> usize {
        match self {
            ImageDataType::Ushort | ImageDataType::Short => 2,
            ImageDataType::Uint | ImageDataType::Int | ImageDataType::Float => 4,
            ImageDataType::Double | ImageDataType::CxFloat => 8,
            ImageDataType::CxDouble => 16,
        }
    }

    /// Create from type value
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            1 => Ok(ImageDataType::Ushort),
            2 => Ok(ImageDataType::Short),
            3 => Ok(ImageDataType::Uint),
            4 => Ok(ImageDataType::Int),
            5 => Ok(ImageDataType::Float),
            6 => Ok(ImageDataType::Double),
            7 => Ok(ImageDataType::CxFloat),
            8 => Ok(ImageDataType::CxDouble),
            _ => Err(MrdError::InvalidDataType(value)),
        }
    }
}

/// Image type flag stored in the header
pub const IMAGE_TYPE_MAGNITUDE: u16 = 1;

/// Fixed-size image header (198 bytes)
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
    pub version: u16,
    pub data_type: ImageDataType,
    pub flags: u64,
    pub measurement_uid: u32,
    /// Image size [x, y, z]
    pub matrix_size: [u16; 3],
    /// Physical field of view in mm
    pub field_of_view: [f32; 3],
    pub channels: u16,
    pub position: [f32; 3],
    pub read_dir: [f32; 3],
    pub phase_dir: [f32; 3],
    pub slice_dir: [f32; 3],
    pub patient_table_position: [f32; 3],
    pub average: u16,
    pub slice: u16,
    pub contrast: u16,
    pub phase: u16,
    pub repetition: u16,
    pub set: u16,
    pub acquisition_time_stamp: u32,
    pub physiology_time_stamp: [u32; 3],
    pub image_type: u16,
    pub image_index: u16,
    pub image_series_index: u16,
    pub user_int: [i32; 8],
    pub user_float: [f32; 8],
    pub attribute_string_len: u32,
}

impl Default for ImageHeader {
    fn default() -> Self {
        ImageHeader {
            version: 1,
            data_type: ImageDataType::Float,
            flags: 0,
            measurement_uid: 0,
            matrix_size: [0; 3],
            field_of_view: [0.0; 3],
            channels: 1,
            position: [0.0; 3],
            read_dir: [0.0; 3],
            phase_dir: [0.0; 3],
            slice_dir: [0.0; 3],
            patient_table_position: [0.0; 3],
            average: 0,
            slice: 0,
            contrast: 0,
            phase: 0,
            repetition: 0,
            set: 0,
            acquisition_time_stamp: 0,
            physiology_time_stamp: [0; 3],
            image_type: IMAGE_TYPE_MAGNITUDE,
            image_index: 0,
            image_series_index: 0,
            user_int: [0; 8],
            user_float: [0.0; 8],
            attribute_string_len: 0,
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

impl ImageHeader {
    /// Header size in bytes
    pub const SIZE: usize = 198;

    /// Build a header carrying the position, orientation, counters and
    /// timestamps of a reference acquisition
    pub fn from_acquisition(acq: &AcquisitionHeader) -> Self {
        ImageHeader {
            version: acq.version,
            measurement_uid: acq.measurement_uid,
            position: acq.position,
            read_dir: acq.read_dir,
            phase_dir: acq.phase_dir,
            slice_dir: acq.slice_dir,
            patient_table_position: acq.patient_table_position,
            average: acq.idx.average,
            slice: acq.idx.slice,
            contrast: acq.idx.contrast,
            phase: acq.idx.phase,
            repetition: acq.idx.repetition,
            set: acq.idx.set,
            acquisition_time_stamp: acq.acquisition_time_stamp,
            physiology_time_stamp: acq.physiology_time_stamp,
            ..ImageHeader::default()
        }
    }

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
        let data_type = ImageDataType::from_u16(buf.get_u16_le())?;
        let flags = buf.get_u64_le();
        let measurement_uid = buf.get_u32_le();
        let matrix_size = [buf.get_u16_le(), buf.get_u16_le(), buf.get_u16_le()];
        let field_of_view = get_f32x3(&mut buf);
        let channels = buf.get_u16_le();
        let position = get_f32x3(&mut buf);
        let read_dir = get_f32x3(&mut buf);
        let phase_dir = get_f32x3(&mut buf);
        let slice_dir = get_f32x3(&mut buf);
        let patient_table_position = get_f32x3(&mut buf);
        let average = buf.get_u16_le();
        let slice = buf.get_u16_le();
        let contrast = buf.get_u16_le();
        let phase = buf.get_u16_le();
        let repetition = buf.get_u16_le();
        let set = buf.get_u16_le();
        let acquisition_time_stamp = buf.get_u32_le();
        let physiology_time_stamp = [buf.get_u32_le(), buf.get_u32_le(), buf.get_u32_le()];
        let image_type = buf.get_u16_le();
        let image_index = buf.get_u16_le();
        let image_series_index = buf.get_u16_le();
        let mut user_int = [0i32; 8];
        for v in &mut user_int {
            *v = buf.get_i32_le();
        }
        let mut user_float = [0f32; 8];
        for v in &mut user_float {
            *v = buf.get_f32_le();
        }
        let attribute_string_len = buf.get_u32_le();

        Ok(ImageHeader {
            version,
            data_type,
            flags,
            measurement_uid,
            matrix_size,
            field_of_view,
            channels,
            position,
            read_dir,
            phase_dir,
            slice_dir,
            patient_table_position,
            average,
            slice,
            contrast,
            phase,
            repetition,
            set,
            acquisition_time_stamp,
            physiology_time_stamp,
            image_type,
            image_index,
            image_series_index,
            user_int,
            user_float,
            attribute_string_len,
        })
    }

    /// Append the 198-byte encoding to `buf`
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.put_u16_le(self.version);
        buf.put_u16_le(self.data_type as u16);
        buf.put_u64_le(self.flags);
        buf.put_u32_le(self.measurement_uid);
        for &s in &self.matrix_size {
            buf.put_u16_le(s);
        }
        put_f32x3(buf, &self.field_of_view);
        buf.put_u16_le(self.channels);
        put_f32x3(buf, &self.position);
        put_f32x3(buf, &self.read_dir);
        put_f32x3(buf, &self.phase_dir);
        put_f32x3(buf, &self.slice_dir);
        put_f32x3(buf, &self.patient_table_position);
        buf.put_u16_le(self.average);
        buf.put_u16_le(self.slice);
        buf.put_u16_le(self.contrast);
        buf.put_u16_le(self.phase);
        buf.put_u16_le(self.repetition);
        buf.put_u16_le(self.set);
        buf.put_u32_le(self.acquisition_time_stamp);
        for &ts in &self.physiology_time_stamp {
            buf.put_u32_le(ts);
        }
        buf.put_u16_le(self.image_type);
        buf.put_u16_le(self.image_index);
        buf.put_u16_le(self.image_series_index);
        for &v in &self.user_int {
            buf.put_i32_le(v);
        }
        for &v in &self.user_float {
            buf.put_f32_le(v);
        }
        buf.put_u32_le(self.attribute_string_len);
    }

    /// Number of pixels across all channels
    pub fn num_pixels(&self) -> usize {
        self.matrix_size.iter().map(|&s| s as usize).product::<usize>() * self.channels as usize
    }

    /// Size of the pixel data in bytes
    pub fn data_len(&self) -> usize {
        self.num_pixels() * self.data_type.size()
    }
}

/// Image with header, attribute string and raw little-endian pixel data
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub head: ImageHeader,
    /// Free-form attribute string (usually XML meta attributes)
    pub attributes: String,
    /// Raw pixel bytes laid out x-fastest
    pub data: Vec<u8>,
}

impl Image {
    /// Create a single-channel float magnitude image from a 2-D `[y, x]`
    /// or 3-D `[z, y, x]` array
    ///
    /// Counters, orientation and timestamps are copied from `reference`.
    pub fn from_magnitude(pixels: &ArrayD<f32>, reference: &AcquisitionHeader) -> Result<Self> {
        let shape = pixels.shape();
        let (nx, ny, nz) = match *shape {
            [ny, nx] => (nx, ny, 1),
            [nz, ny, nx] => (nx, ny, nz),
            _ => return Err(MrdError::UnsupportedRank(shape.len())),
        };
        let to_u16 = |n: usize| {
            u16::try_from(n).map_err(|_| MrdError::InvalidSize {
                expected: u16::MAX as usize,
                actual: n,
            })
        };

        let mut head = ImageHeader::from_acquisition(reference);
        head.data_type = ImageDataType::Float;
        head.image_type = IMAGE_TYPE_MAGNITUDE;
        head.channels = 1;
        head.matrix_size = [to_u16(nx)?, to_u16(ny)?, to_u16(nz)?];

        let mut data = Vec::with_capacity(pixels.len() * 4);
        // Logical iteration order is row-major, i.e. x fastest
        for &value in pixels.iter() {
            data.put_f32_le(value);
        }

        Ok(Image {
            head,
            attributes: String::new(),
            data,
        })
    }

    /// Set the physical field of view in mm
    pub fn with_field_of_view(mut self, fov: [f32; 3]) -> Self {
        self.head.field_of_view = fov;
        self
    }

    /// Set the 1-based image index
    pub fn with_image_index(mut self, index: u16) -> Self {
        self.head.image_index = index;
        self
    }

    /// Decode pixel data as `f32` values
    pub fn pixels_f32(&self) -> Result<Vec<f32>> {
        if self.head.data_type != ImageDataType::Float {
            return Err(MrdError::InvalidDataType(self.head.data_type as u16));
        }
        let mut buf = self.data.as_slice();
        Ok((0..self.data.len() / 4).map(|_| buf.get_f32_le()).collect())
    }

    /// Encode header, attributes and pixels (without the message id)
    pub fn encode(&self) -> Result<Vec<u8>> {
        let expected = self.head.data_len();
        if self.data.len() != expected {
            return Err(MrdError::InvalidSize {
                expected,
                actual: self.data.len(),
            });
        }

        let attributes = self.attributes.as_bytes();
        let mut head = self.head.clone();
        head.attribute_string_len =
            u32::try_from(attributes.len()).map_err(|_| MrdError::BodyTooLarge {
                size: attributes.len(),
                max: u32::MAX as usize,
            })?;

        let mut buf = Vec::with_capacity(ImageHeader::SIZE + 8 + attributes.len() + self.data.len());
        head.encode_into(&mut buf);
        buf.put_u64_le(attributes.len() as u64);
        buf.put_slice(attributes);
        buf.put_slice(&self.data);
        Ok(buf)
    }

    /// Decode a full image payload (header + attributes + pixels)
    pub fn decode(data: &[u8]) -> Result<Self> {
        let head = ImageHeader::decode(data)?;
        let mut buf = &data[ImageHeader::SIZE..];
        if buf.len() < 8 {
            return Err(MrdError::InvalidSize {
                expected: 8,
                actual: buf.len(),
            });
        }
        let attr_len = buf.get_u64_le() as usize;
        if buf.len() < attr_len {
            return Err(MrdError::InvalidSize {
                expected: attr_len,
                actual: buf.len(),
            });
        }
        let attributes = String::from_utf8_lossy(&buf[..attr_len]).into_owned();
        buf.advance(attr_len);

        let expected = head.data_len();
        if buf.len() != expected {
            return Err(MrdError::InvalidSize {
                expected,
                actual: buf.len(),
            });
        }

        Ok(Image {
            head,
            attributes,
            data: buf.to_vec(),
        })
    }
}
