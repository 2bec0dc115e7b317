//! Field-of-view cropping
//!
//! Removes readout oversampling and any other excess matrix by taking a
//! centered window of the recon matrix size from each spatial axis.

use crate::error::{MrdError, Result};
use crate::recon::metadata::Matrix;
use ndarray::{ArrayD, Axis, Slice};

/// Drop every axis of length one
pub fn squeeze(mut image: ArrayD<f32>) -> ArrayD<f32> {
    for axis in (0..image.ndim()).rev() {
        if image.len_of(Axis(axis)) == 1 {
            image = image.remove_axis(Axis(axis));
        }
    }
    image
}

/// Start of a centered window of `target` samples inside `size`
fn center_offset(size: usize, target: usize) -> usize {
    (size + 1) / 2 - (target + 1) / 2
}

/// Center-crop a magnitude image to the recon matrix
///
/// Singleton axes are squeezed first. The remaining axes are `[y, x]` for
/// 2-D images and `[z, y, x]` for 3-D images and are cropped to
/// `(rNy, rNx)` and `(rNz, rNy, rNx)` respectively.
///
/// # Errors
///
/// - [`MrdError::UnsupportedRank`] - image is not 2-D or 3-D after squeezing
/// - [`MrdError::CropOutOfBounds`] - a target extent exceeds the image
pub fn crop_to_matrix(image: ArrayD<f32>, target: Matrix) -> Result<ArrayD<f32>> {
    let image = squeeze(image);
    let targets: &[usize] = match image.ndim() {
        2 => &[target.y, target.x],
        3 => &[target.z, target.y, target.x],
        rank => return Err(MrdError::UnsupportedRank(rank)),
    };

    let mut offsets = Vec::with_capacity(targets.len());
    for (axis, (&size, &want)) in image.shape().iter().zip(targets).enumerate() {
        if want > size {
            return Err(MrdError::CropOutOfBounds {
                axis,
                size,
                target: want,
            });
        }
        offsets.push(center_offset(size, want));
    }

    if image.shape() == targets {
        return Ok(image);
    }

    let cropped = image.slice_each_axis(|ax| {
        let axis = ax.axis.index();
        let start = offsets[axis] as isize;
        Slice::from(start..start + targets[axis] as isize)
    });
    Ok(cropped.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    fn matrix(x: usize, y: usize, z: usize) -> Matrix {
        Matrix { x, y, z }
    }

    #[test]
    fn test_center_offset() {
        assert_eq!(center_offset(128, 64), 32);
        assert_eq!(center_offset(5, 4), 1);
        assert_eq!(center_offset(4, 3), 0);
        assert_eq!(center_offset(7, 7), 0);
    }

    #[test]
    fn test_crop_identity() {
        let image = Array2::from_shape_fn((4, 6), |(y, x)| (y * 6 + x) as f32).into_dyn();
        let cropped = crop_to_matrix(image.clone(), matrix(6, 4, 1)).unwrap();
        assert_eq!(cropped, image);
    }

    #[test]
    fn test_crop_readout_oversampling() {
        let image = Array3::from_shape_fn((1, 2, 8), |(_, y, x)| (y * 8 + x) as f32).into_dyn();
        let cropped = crop_to_matrix(image, matrix(4, 2, 1)).unwrap();

        assert_eq!(cropped.shape(), &[2, 4]);
        // offset (8+1)/2 - (4+1)/2 = 2
        assert_eq!(cropped[[0, 0]], 2.0);
        assert_eq!(cropped[[1, 3]], 13.0);
    }

    #[test]
    fn test_crop_3d() {
        let image = Array3::from_shape_fn((4, 4, 4), |(z, y, x)| (z * 16 + y * 4 + x) as f32)
            .into_dyn();
        let cropped = crop_to_matrix(image, matrix(2, 4, 2)).unwrap();

        assert_eq!(cropped.shape(), &[2, 4, 2]);
        // z offset 1, y offset 0, x offset 1
        assert_eq!(cropped[[0, 0, 0]], 17.0);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let image = Array2::<f32>::zeros((4, 4)).into_dyn();
        let result = crop_to_matrix(image, matrix(8, 4, 1));
        assert!(matches!(
            result,
            Err(MrdError::CropOutOfBounds {
                axis: 1,
                size: 4,
                target: 8
            })
        ));
    }

    #[test]
    fn test_unsupported_rank() {
        let image = Array3::<f32>::zeros((1, 1, 8)).into_dyn();
        let result = crop_to_matrix(image, matrix(8, 1, 1));
        assert!(matches!(result, Err(MrdError::UnsupportedRank(1))));
    }

    #[test]
    fn test_squeeze() {
        let image = ArrayD::<f32>::zeros(ndarray::IxDyn(&[1, 3, 1, 2]));
        assert_eq!(squeeze(image).shape(), &[3, 2]);
    }
}
