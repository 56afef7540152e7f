//! Ring-artifact reduction for tomographic slices.
//!
//! Ring artifacts are concentric intensity bands around a (possibly
//! off-image) centre. Every method here estimates one additive correction per
//! radial bin `bin = radius / dr` and subtracts the interpolated correction
//! from each pixel:
//!
//! - [`RingsReducer::sijbers`] blurs the volume, isolates the high-frequency
//!   residual and takes the median of that residual on each ring.
//! - [`RingsReducer::polar_rd`] compares every ring with a fixed reference
//!   ring on the centre slice, using mean or median ring statistics.
//! - [`RingsReducer::mmd_polar_rd_2d`] / [`RingsReducer::mmd_polar_rd_3d`]
//!   take median differences between adjacent rings, accumulate them from the
//!   outside in and remove the drift so the reference ring stays unchanged.

mod correct;
pub mod interp;
mod options;
pub mod sampler;

pub use correct::{correct_image, correct_slice, interpolate_correction};
pub use options::{BlurKind, PolarRdOption, RingParams};
pub use sampler::{median, ring_sample_count, RadialSampler, HISTOGRAM_BINS};

use crate::filters::{gaussian_blur_3d, mean_blur_3d, subtract_3d};
use crate::image::{ImageView, ImageViewMut, SliceViewMut};
use crate::volume::Volume;
use log::{debug, info};
use rayon::prelude::*;
use std::time::Instant;

/// Distance from `center` to the farthest of the four corners of an image of
/// `size = [width, height]`.
pub fn max_ring_radius(center: [f64; 2], size: [f64; 2]) -> f64 {
    let corners = [
        [0.0 - center[0], 0.0 - center[1]],
        [size[0] - center[0], size[1] - center[1]],
        [0.0 - center[0], size[1] - center[1]],
        [size[0] - center[0], 0.0 - center[1]],
    ];
    corners
        .iter()
        .map(|c| c[0] * c[0] + c[1] * c[1])
        .fold(0.0, f64::max)
        .sqrt()
}

#[inline]
fn num_rings(max_radius: f64, dr: f64) -> usize {
    (max_radius / dr) as usize
}

/// Centre of slice `z`, linear between the first and the last slice.
fn slice_center(first: [f64; 2], last: [f64; 2], z: usize, sz: usize) -> [f64; 2] {
    if sz <= 1 {
        return first;
    }
    let t = z as f64 / (sz - 1) as f64;
    [
        first[0] + (last[0] - first[0]) * t,
        first[1] + (last[1] - first[1]) * t,
    ]
}

/// Ring-artifact estimator and corrector.
#[derive(Clone, Debug, Default)]
pub struct RingsReducer {
    params: RingParams,
}

impl RingsReducer {
    pub fn new(params: RingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RingParams {
        &self.params
    }

    fn sampler<'a, I: ImageView<Pixel = i16>>(
        &self,
        image: &'a I,
        center: [f64; 2],
        dr: f64,
    ) -> RadialSampler<'a, I> {
        RadialSampler::new(image, center, dr).with_polar_window(self.params.polar_window)
    }

    /// Index of the ring pinned to zero correction, clamped to the last ring
    /// when the image is smaller than the reference radius.
    pub fn reference_index(&self, dr: f64, num_rings: usize) -> usize {
        ((self.params.reference_radius / dr) as usize).min(num_rings.saturating_sub(1))
    }

    /// Turn adjacent-ring differences into offsets: accumulate from the
    /// outermost ring inwards, then subtract the value at the reference ring.
    pub fn anchor_to_reference(&self, correction: &mut [f64], dr: f64) {
        let n = correction.len();
        if n == 0 {
            return;
        }
        for ri in (0..n - 1).rev() {
            correction[ri] += correction[ri + 1];
        }
        let drift = correction[self.reference_index(dr, n)];
        for c in correction.iter_mut() {
            *c -= drift;
        }
    }

    /// Sijbers-style reduction: blur, subtract, median of the residual on
    /// every ring, per slice. Returns the correction of the last slice.
    pub fn sijbers(
        &self,
        src: &Volume<i16>,
        dst: &mut Volume<i16>,
        dr: f64,
        center: [f64; 2],
        blur: BlurKind,
    ) -> Vec<f64> {
        assert!(dr > 0.0, "ring thickness must be greater than 0");
        let start = Instant::now();
        let size = src.get_size();

        let mut smooth = Volume::new(size);
        match blur {
            BlurKind::Gaussian => gaussian_blur_3d(src, &mut smooth, 2 * self.params.blur_window + 1),
            BlurKind::Mean => mean_blur_3d(src, &mut smooth, self.params.blur_window),
        }
        let mut diff = Volume::new(size);
        subtract_3d(src, &smooth, &mut diff);
        debug!("sijbers: {blur:?} blur done in {:.1} ms", start.elapsed().as_secs_f64() * 1000.0);

        let max_radius = max_ring_radius(center, [size[0] as f64, size[1] as f64]);
        let n = num_rings(max_radius, dr);
        let mut correction = vec![0.0; n];
        if dst.get_size() != size {
            dst.reset(size, 0);
        }
        for z in 0..src.sz() {
            let residual = diff.slice(z);
            let sampler = self.sampler(&residual, center, dr);
            correction[..n.saturating_sub(1)]
                .par_iter_mut()
                .enumerate()
                .for_each(|(ri, c)| *c = sampler.med_on_ring(ri, 1.0));
            correct_slice(src, dst, &correction, z, center, dr);
            debug!("sijbers: slice {}/{} corrected", z + 1, src.sz());
        }
        info!(
            "sijbers: {} rings over {} slices in {:.1} ms",
            n,
            src.sz(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        correction
    }

    /// Compare each ring with the reference ring on the centre slice and
    /// apply the resulting correction to every slice.
    pub fn polar_rd(
        &self,
        src: &Volume<i16>,
        dst: &mut Volume<i16>,
        option: PolarRdOption,
        dr: f64,
        center: [f64; 2],
        subpixel_on_ring: f64,
    ) -> Vec<f64> {
        assert!(dr > 0.0, "ring thickness must be greater than 0");
        assert!(subpixel_on_ring > 0.0, "ring sample spacing must be greater than 0");
        let start = Instant::now();
        let size = src.get_size();
        if dst.get_size() != size {
            dst.reset(size, 0);
        }
        if src.sz() == 0 {
            return Vec::new();
        }
        let n = num_rings(max_ring_radius(center, [size[0] as f64, size[1] as f64]), dr);
        let reference = self.reference_index(dr, n);

        let slice = src.slice(src.sz() / 2);
        let sampler = self.sampler(&slice, center, dr);
        let mut correction = vec![0.0; n];
        correction[..n.saturating_sub(1)]
            .par_iter_mut()
            .enumerate()
            .for_each(|(ri, c)| {
                *c = match option {
                    PolarRdOption::AvgDiff => sampler.avg_diff_v2(ri, reference, subpixel_on_ring),
                    PolarRdOption::MedDiff => sampler.med_diff_v2(ri, reference, subpixel_on_ring),
                }
            });

        for z in 0..src.sz() {
            correct_slice(src, dst, &correction, z, center, dr);
        }
        info!(
            "polar_rd ({option}): {n} rings, reference ring {reference}, {:.1} ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
        correction
    }

    /// Median-of-differences correction for one slice. Adjacent ring
    /// differences are computed in parallel; accumulation runs after the join.
    pub fn mmd_polar_rd_2d<S, D>(&self, src: &S, dst: &mut D, center: [f64; 2], dr: f64) -> Vec<f64>
    where
        S: ImageView<Pixel = i16> + Sync,
        D: ImageViewMut<Pixel = i16>,
    {
        assert!(dr > 0.0, "ring thickness must be greater than 0");
        let size = [src.width() as f64, src.height() as f64];
        let n = num_rings(max_ring_radius(center, size), dr);
        let sampler = self.sampler(src, center, dr);

        let mut correction = vec![0.0; n];
        correction[..n.saturating_sub(1)]
            .par_iter_mut()
            .enumerate()
            .for_each(|(ri, c)| *c = sampler.med_diff(ri, ri + 1));
        self.anchor_to_reference(&mut correction, dr);

        correct_image(src, dst, &correction, center, dr);
        debug!("mmd_polar_rd_2d: {n} rings");
        correction
    }

    /// Median-of-differences correction for a volume whose ring centre moves
    /// linearly from `first_center` (slice 0) to `last_center` (last slice).
    ///
    /// Slices run in parallel, each worker reusing a private correction
    /// buffer and writing only its own destination slice. Returns the
    /// per-slice corrections.
    pub fn mmd_polar_rd_3d(
        &self,
        src: &Volume<i16>,
        dst: &mut Volume<i16>,
        first_center: [f64; 2],
        last_center: [f64; 2],
        dr: f64,
    ) -> Vec<Vec<f64>> {
        assert!(dr > 0.0, "ring thickness must be greater than 0");
        let start = Instant::now();
        let size = src.get_size();
        let extent = [size[0] as f64, size[1] as f64];
        let max_radius = max_ring_radius(first_center, extent).max(max_ring_radius(last_center, extent));
        let n = num_rings(max_radius, dr);
        if dst.get_size() != size {
            dst.reset(size, 0);
        }
        let slice_len = src.slice_len();
        if slice_len == 0 {
            return Vec::new();
        }

        let sz = src.sz();
        let corrections: Vec<Vec<f64>> = dst
            .as_mut_slice()
            .par_chunks_mut(slice_len)
            .enumerate()
            .map_init(
                || vec![0.0; n],
                |correction, (z, dst_data)| {
                    correction.fill(0.0);
                    let center = slice_center(first_center, last_center, z, sz);
                    let src_slice = src.slice(z);
                    let sampler = self.sampler(&src_slice, center, dr);
                    for ri in 0..n.saturating_sub(1) {
                        correction[ri] = sampler.med_diff(ri, ri + 1);
                    }
                    self.anchor_to_reference(correction, dr);

                    let mut dst_slice = SliceViewMut {
                        w: size[0],
                        h: size[1],
                        stride: size[0],
                        data: dst_data,
                    };
                    correct_image(&src_slice, &mut dst_slice, &correction[..], center, dr);
                    correction.clone()
                },
            )
            .collect();
        info!(
            "mmd_polar_rd_3d: {n} rings over {sz} slices in {:.1} ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
        corrections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_radius_reaches_farthest_corner() {
        assert!((max_ring_radius([0.0, 0.0], [10.0, 10.0]) - 200f64.sqrt()).abs() < 1e-12);
        assert!((max_ring_radius([5.0, 5.0], [10.0, 10.0]) - 50f64.sqrt()).abs() < 1e-12);
        assert!((max_ring_radius([-3.0, 4.0], [10.0, 10.0]) - 205f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn slice_centres_interpolate_first_to_last() {
        assert_eq!(slice_center([0.0, 0.0], [4.0, 8.0], 0, 5), [0.0, 0.0]);
        assert_eq!(slice_center([0.0, 0.0], [4.0, 8.0], 4, 5), [4.0, 8.0]);
        assert_eq!(slice_center([0.0, 0.0], [4.0, 8.0], 2, 5), [2.0, 4.0]);
        assert_eq!(slice_center([1.0, 2.0], [4.0, 8.0], 0, 1), [1.0, 2.0]);
    }

    #[test]
    fn accumulation_pins_reference_ring() {
        let reducer = RingsReducer::new(RingParams {
            reference_radius: 2.0,
            ..Default::default()
        });
        let mut c = vec![1.0, 1.0, 1.0, 1.0, 0.0];
        reducer.anchor_to_reference(&mut c, 1.0);
        assert_eq!(c, vec![2.0, 1.0, 0.0, -1.0, -2.0]);
    }

    #[test]
    fn polar_rd_on_an_empty_stack_returns_no_correction() {
        let src: Volume<i16> = Volume::new([8, 8, 0]);
        let mut dst = Volume::new([1, 1, 1]);
        let correction = RingsReducer::default().polar_rd(
            &src,
            &mut dst,
            PolarRdOption::MedDiff,
            1.0,
            [4.0, 4.0],
            1.0,
        );
        assert!(correction.is_empty());
        assert_eq!(dst.get_size(), [8, 8, 0]);
    }

    #[test]
    fn reference_index_is_clamped() {
        let reducer = RingsReducer::default();
        assert_eq!(reducer.reference_index(1.0, 300), 100);
        assert_eq!(reducer.reference_index(2.0, 300), 50);
        assert_eq!(reducer.reference_index(1.0, 45), 44);
        assert_eq!(reducer.reference_index(1.0, 0), 0);
    }
}
