//! Separable 3D smoothing used to isolate ring signal from the background.
//!
//! Each filter runs one 1D pass per axis in f32 and rounds back to i16 at the
//! end. Border samples clamp to the volume extents.

use crate::volume::Volume;

/// Trait implemented by separable 1D filters.
pub trait SeparableFilter {
    /// Return the 1D taps (in left-to-right order). The kernel is assumed to be
    /// symmetric around its centre, but the implementation does not rely on it.
    fn taps(&self) -> &[f32];
}

/// Owned odd-length kernel.
#[derive(Clone, Debug)]
pub struct Kernel1D {
    taps: Vec<f32>,
}

impl Kernel1D {
    /// Normalised Gaussian of width `ksize` (forced odd). Sigma follows the
    /// usual `0.3 * ((ksize - 1) / 2 - 1) + 0.8` rule.
    pub fn gaussian(ksize: usize) -> Self {
        let ksize = odd(ksize);
        let sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
        let radius = (ksize / 2) as f64;
        let mut taps: Vec<f64> = (0..ksize)
            .map(|i| {
                let d = i as f64 - radius;
                (-(d * d) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let sum: f64 = taps.iter().sum();
        for t in &mut taps {
            *t /= sum;
        }
        Self {
            taps: taps.into_iter().map(|t| t as f32).collect(),
        }
    }

    /// Uniform box of width `wsize` (forced odd).
    pub fn mean(wsize: usize) -> Self {
        let wsize = odd(wsize);
        Self {
            taps: vec![1.0 / wsize as f32; wsize],
        }
    }
}

impl SeparableFilter for Kernel1D {
    #[inline]
    fn taps(&self) -> &[f32] {
        &self.taps
    }
}

fn odd(n: usize) -> usize {
    n.max(1) | 1
}

/// Gaussian blur with a `ksize³` kernel.
pub fn gaussian_blur_3d(src: &Volume<i16>, dst: &mut Volume<i16>, ksize: usize) {
    blur_3d(src, dst, &Kernel1D::gaussian(ksize));
}

/// Box blur with a `wsize³` window.
pub fn mean_blur_3d(src: &Volume<i16>, dst: &mut Volume<i16>, wsize: usize) {
    blur_3d(src, dst, &Kernel1D::mean(wsize));
}

/// Apply `filter` along x, y and z, writing the rounded result into `dst`.
pub fn blur_3d<F: SeparableFilter>(src: &Volume<i16>, dst: &mut Volume<i16>, filter: &F) {
    let taps = filter.taps();
    assert!(!taps.is_empty(), "filter must provide at least one tap");
    let size = src.get_size();
    let mut buf: Vec<f32> = src.as_slice().iter().map(|&v| v as f32).collect();
    let mut tmp = vec![0.0f32; buf.len()];
    // strides of the x, y and z axes
    let strides = [1, size[0], size[0] * size[1]];
    for axis in 0..3 {
        if size[axis] > 1 {
            filter_axis(&buf, &mut tmp, size, strides[axis], axis, taps);
            std::mem::swap(&mut buf, &mut tmp);
        }
    }
    if dst.get_size() != size {
        dst.resize(size);
    }
    for (d, &v) in dst.as_mut_slice().iter_mut().zip(buf.iter()) {
        *d = v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    }
}

fn filter_axis(
    src: &[f32],
    dst: &mut [f32],
    size: [usize; 3],
    stride: usize,
    axis: usize,
    taps: &[f32],
) {
    let radius = (taps.len() / 2) as isize;
    let len = size[axis];
    for z in 0..size[2] {
        for y in 0..size[1] {
            for x in 0..size[0] {
                let coord = [x, y, z][axis] as isize;
                let i = x + size[0] * (y + size[1] * z);
                let base = i - coord as usize * stride;
                let mut acc = 0.0f32;
                for (k, &tap) in taps.iter().enumerate() {
                    let c = clamp_index(coord + k as isize - radius, len);
                    acc += tap * src[base + c * stride];
                }
                dst[i] = acc;
            }
        }
    }
}

/// `dst = a - b`, saturating to the i16 range.
pub fn subtract_3d(a: &Volume<i16>, b: &Volume<i16>, dst: &mut Volume<i16>) {
    assert_eq!(a.get_size(), b.get_size(), "operands must have equal size");
    if dst.get_size() != a.get_size() {
        dst.resize(a.get_size());
    }
    let out = dst.as_mut_slice();
    for ((d, &va), &vb) in out.iter_mut().zip(a.as_slice()).zip(b.as_slice()) {
        *d = va.saturating_sub(vb);
    }
}

fn clamp_index(idx: isize, upper: usize) -> usize {
    if upper == 0 {
        return 0;
    }
    if idx < 0 {
        0
    } else if (idx as usize) >= upper {
        upper - 1
    } else {
        idx as usize
    }
}
