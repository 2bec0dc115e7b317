//! Image frames of one reconstructed repetition

use crate::error::Result;
use crate::protocol::acquisition::AcquisitionHeader;
use crate::protocol::image::Image;
use crate::recon::accumulator::FlushedRepetition;
use crate::recon::crop::crop_to_matrix;
use crate::recon::fourier::{reconstruct, CoilCombinedImages, CombinedImage};
use crate::recon::metadata::{EncodingMetadata, Matrix};
use tracing::trace;

/// Lazily reconstructs, crops and encodes the images of a repetition
///
/// Images come out contrast outer, slice inner. Each is numbered from a
/// running 1-based index shared across the whole stream.
pub struct RepetitionImages {
    images: CoilCombinedImages,
    reference: AcquisitionHeader,
    matrix: Matrix,
    field_of_view: [f32; 3],
    next_index: usize,
}

impl RepetitionImages {
    /// Transform `repetition` to image space
    ///
    /// `first_index` is the image index given to the first image.
    pub fn new(repetition: FlushedRepetition, metadata: &EncodingMetadata, first_index: usize) -> Self {
        RepetitionImages {
            images: reconstruct(repetition.kspace),
            reference: repetition.reference,
            matrix: metadata.recon,
            field_of_view: metadata.recon_fov,
            next_index: first_index,
        }
    }

    fn finish(&self, combined: CombinedImage, index: usize) -> Result<Image> {
        let cropped = crop_to_matrix(combined.pixels, self.matrix)?;
        trace!(
            contrast = combined.contrast,
            slice = combined.slice,
            shape = ?cropped.shape(),
            image_index = index,
            "Image cropped"
        );
        // image_index is a u16 on the wire and wraps on very long streams
        Ok(Image::from_magnitude(&cropped, &self.reference)?
            .with_field_of_view(self.field_of_view)
            .with_image_index(index as u16))
    }
}

impl Iterator for RepetitionImages {
    type Item = Result<Image>;

    fn next(&mut self) -> Option<Self::Item> {
        let combined = self.images.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some(self.finish(combined, index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.images.size_hint()
    }
}

impl ExactSizeIterator for RepetitionImages {}
