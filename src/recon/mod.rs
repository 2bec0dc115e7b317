//! Cartesian reconstruction: metadata, k-space accumulation, Fourier
//! transform, coil combination and field-of-view cropping.

pub mod accumulator;
pub mod crop;
pub mod fourier;
pub mod metadata;

pub use accumulator::{FlushedRepetition, KSpaceAccumulator, KSpaceVolume};
pub use crop::crop_to_matrix;
pub use fourier::{reconstruct, CoilCombinedImages, CombinedImage};
pub use metadata::{EncodingMetadata, Matrix};
