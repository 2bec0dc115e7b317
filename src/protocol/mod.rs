//! MRD streaming protocol implementation module
//!
//! This module contains the frame layout and the payload codecs for the
//! header, acquisition and image messages.

pub mod acquisition;
pub mod frame;
pub mod header;
pub mod image;

// Re-export commonly used types
pub use acquisition::{Acquisition, AcquisitionHeader, EncodingCounters};
pub use frame::{MessageId, ReadOutcome};
pub use header::{IsmrmrdHeader, MrdHeader};
pub use image::{Image, ImageDataType, ImageHeader};
