//! K-space to image transform and coil combination
//!
//! Each transformed axis goes through `ifftshift -> inverse DFT -> fftshift`
//! and is scaled by `1/sqrt(n)`, which makes the whole transform unitary.
//! Because the shifts and the DFT are separable, applying the sequence axis
//! by axis gives the same result as the multidimensional version.

use crate::recon::accumulator::KSpaceVolume;
use ndarray::{s, Array6, ArrayD, Axis, Dimension, RemoveAxis};
use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Transform the given axes of `data` from k-space to image space in place
pub fn k2i<D>(data: &mut ndarray::Array<Complex32, D>, axes: &[usize])
where
    D: Dimension + RemoveAxis,
{
    let mut planner = FftPlanner::<f32>::new();

    for &axis in axes {
        let n = data.len_of(Axis(axis));
        if n == 0 {
            continue;
        }
        let ifft: Arc<dyn Fft<f32>> = planner.plan_fft_inverse(n);
        let mut scratch = vec![Complex32::new(0.0, 0.0); ifft.get_inplace_scratch_len()];
        let mut buffer = vec![Complex32::new(0.0, 0.0); n];
        let scale = 1.0 / (n as f32).sqrt();
        let half = n / 2;

        for mut lane in data.lanes_mut(Axis(axis)) {
            for (dst, src) in buffer.iter_mut().zip(lane.iter()) {
                *dst = *src;
            }
            // ifftshift
            buffer.rotate_left(half);
            ifft.process_with_scratch(&mut buffer, &mut scratch);
            // fftshift
            buffer.rotate_right(half);
            for (dst, src) in lane.iter_mut().zip(buffer.iter()) {
                *dst = *src * scale;
            }
        }
    }
}

/// Axes of a `[contrast, slice, coil, kz, ky, readout]` volume to transform
///
/// Partitions are only transformed for 3-D acquisitions.
pub fn transform_axes(kspace: &KSpaceVolume) -> &'static [usize] {
    if kspace.is_3d() {
        &[3, 4, 5]
    } else {
        &[4, 5]
    }
}

/// Reconstruct a filled k-space volume
///
/// The returned iterator combines coils lazily, one `(contrast, slice)`
/// image per step, contrast outer and slice inner.
pub fn reconstruct(kspace: KSpaceVolume) -> CoilCombinedImages {
    let axes = transform_axes(&kspace);
    let mut images = kspace.into_array();
    k2i(&mut images, axes);

    let (contrasts, slices, ..) = images.dim();
    CoilCombinedImages {
        images,
        contrasts,
        slices,
        next: 0,
    }
}

/// Root-sum-of-squares over the leading coil axis
pub fn root_sum_of_squares(coil_images: ndarray::ArrayView4<'_, Complex32>) -> ArrayD<f32> {
    coil_images
        .map_axis(Axis(0), |coils| {
            coils.iter().map(|v| v.norm_sqr()).sum::<f32>().sqrt()
        })
        .into_dyn()
}

/// One coil-combined image
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedImage {
    pub contrast: usize,
    pub slice: usize,
    /// Magnitude shaped `[kz, ky, readout]`
    pub pixels: ArrayD<f32>,
}

/// One-shot iterator over the images of a reconstructed repetition
#[derive(Debug)]
pub struct CoilCombinedImages {
    images: Array6<Complex32>,
    contrasts: usize,
    slices: usize,
    next: usize,
}

impl Iterator for CoilCombinedImages {
    type Item = CombinedImage;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.contrasts * self.slices {
            return None;
        }
        let contrast = self.next / self.slices;
        let slice = self.next % self.slices;
        self.next += 1;

        let pixels = root_sum_of_squares(self.images.slice(s![contrast, slice, .., .., .., ..]));
        Some(CombinedImage {
            contrast,
            slice,
            pixels,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.contrasts * self.slices - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CoilCombinedImages {}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
    }

    #[test]
    fn test_k2i_dc_component() {
        // A single sample at the k-space center becomes a flat image
        let n = 8;
        let mut line = Array1::from_elem(n, Complex32::new(0.0, 0.0));
        line[n / 2] = Complex32::new(1.0, 0.0);
        k2i(&mut line, &[0]);

        for v in line.iter() {
            assert_close(v.re, 1.0 / (n as f32).sqrt());
            assert_close(v.im, 0.0);
        }
    }

    #[test]
    fn test_k2i_flat_kspace_gives_centered_peak() {
        let n = 8;
        let mut line = Array1::from_elem(n, Complex32::new(1.0, 0.0));
        k2i(&mut line, &[0]);

        assert_close(line[n / 2].re, (n as f32).sqrt());
        for (i, v) in line.iter().enumerate() {
            if i != n / 2 {
                assert_close(v.norm(), 0.0);
            }
        }
    }

    #[test]
    fn test_k2i_preserves_energy() {
        let mut img = Array2::from_shape_fn((6, 5), |(y, x)| {
            Complex32::new((y * 5 + x) as f32, (x as f32) - 2.0)
        });
        let before: f32 = img.iter().map(|v| v.norm_sqr()).sum();
        k2i(&mut img, &[0, 1]);
        let after: f32 = img.iter().map(|v| v.norm_sqr()).sum();
        assert!((before - after).abs() / before < 1e-4);
    }

    #[test]
    fn test_transform_axes() {
        let flat = KSpaceVolume::zeros([1, 1, 1, 1, 4, 4]);
        let volume = KSpaceVolume::zeros([1, 1, 1, 2, 4, 4]);
        assert_eq!(transform_axes(&flat), &[4, 5]);
        assert_eq!(transform_axes(&volume), &[3, 4, 5]);
    }

    #[test]
    fn test_2d_volume_does_not_mix_partitions() {
        // A 2-D volume has one partition; its single kz line is left alone,
        // so the centre sample becomes a flat image of amplitude 4/sqrt(16)
        let mut data = Array6::from_elem([1, 1, 1, 1, 4, 4], Complex32::new(0.0, 0.0));
        data[[0, 0, 0, 0, 2, 2]] = Complex32::new(4.0, 0.0);
        let images: Vec<_> = reconstruct(KSpaceVolume::from_array(data)).collect();

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].pixels.shape(), &[1, 4, 4]);
        for v in images[0].pixels.iter() {
            assert_close(*v, 1.0);
        }
    }

    #[test]
    fn test_identical_coils_combine_to_sqrt_c() {
        let coils = 4;
        let mut data = Array6::from_elem([1, 1, coils, 1, 4, 4], Complex32::new(0.0, 0.0));
        for c in 0..coils {
            data[[0, 0, c, 0, 2, 2]] = Complex32::new(0.0, 8.0);
        }
        let image = reconstruct(KSpaceVolume::from_array(data)).next().unwrap();

        // each coil image has magnitude 8 / sqrt(16) = 2
        for v in image.pixels.iter() {
            assert_close(*v, 2.0 * (coils as f32).sqrt());
        }
    }

    #[test]
    fn test_image_order_contrast_outer() {
        let data = Array6::from_elem([2, 3, 1, 1, 2, 2], Complex32::new(0.0, 0.0));
        let mut images = reconstruct(KSpaceVolume::from_array(data));
        assert_eq!(images.len(), 6);

        let order: Vec<_> = images.by_ref().map(|img| (img.contrast, img.slice)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
        assert!(images.next().is_none());
    }

    #[test]
    fn test_root_sum_of_squares() {
        let mut coils = ndarray::Array4::from_elem((2, 1, 1, 2), Complex32::new(0.0, 0.0));
        coils[[0, 0, 0, 0]] = Complex32::new(3.0, 0.0);
        coils[[1, 0, 0, 0]] = Complex32::new(0.0, 4.0);
        let combined = root_sum_of_squares(coils.view());

        assert_eq!(combined.shape(), &[1, 1, 2]);
        assert_close(combined[[0, 0, 0]], 5.0);
        assert_close(combined[[0, 0, 1]], 0.0);
    }
}
