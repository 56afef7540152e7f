//! Apply a per-ring correction vector to image pixels.

use crate::image::{ImageView, ImageViewMut};
use crate::volume::Volume;

/// Correction at fractional ring index `rid`, linearly interpolated between
/// the bracketing bins.
///
/// Indices past the last bin are clamped to it: corner pixels beyond the
/// outermost computed ring reuse its value instead of reading out of bounds.
#[inline]
pub fn interpolate_correction(correction: &[f64], rid: f64) -> f64 {
    let Some(last) = correction.len().checked_sub(1) else {
        return 0.0;
    };
    let rid = rid.clamp(0.0, last as f64);
    let flo = rid.floor() as usize;
    let cei = rid.ceil() as usize;
    if flo == cei {
        correction[flo]
    } else {
        correction[flo] * (cei as f64 - rid) + correction[cei] * (rid - flo as f64)
    }
}

/// `dst(x, y) = src(x, y) - c(|(x, y) - center| / dr)`.
///
/// The result is truncated toward zero and saturated to the i16 range.
pub fn correct_image<S, D>(src: &S, dst: &mut D, correction: &[f64], center: [f64; 2], dr: f64)
where
    S: ImageView<Pixel = i16>,
    D: ImageViewMut<Pixel = i16>,
{
    assert!(dr > 0.0, "ring thickness must be greater than 0");
    assert!(
        src.width() == dst.width() && src.height() == dst.height(),
        "destination {}x{} does not match source {}x{}",
        dst.width(),
        dst.height(),
        src.width(),
        src.height()
    );
    for y in 0..src.height() {
        let src_row = src.row(y);
        let dst_row = dst.row_mut(y);
        let diff_y = y as f64 - center[1];
        for (x, (d, &s)) in dst_row.iter_mut().zip(src_row).enumerate() {
            let diff_x = x as f64 - center[0];
            let radius = (diff_x * diff_x + diff_y * diff_y).sqrt();
            let c = interpolate_correction(correction, radius / dr);
            *d = (s as f64 - c) as i16;
        }
    }
}

/// Correct slice `z` of `src` into the same slice of `dst`.
///
/// `dst` is reset to the source size (zero filled) when the sizes differ.
pub fn correct_slice(
    src: &Volume<i16>,
    dst: &mut Volume<i16>,
    correction: &[f64],
    z: usize,
    center: [f64; 2],
    dr: f64,
) {
    if dst.get_size() != src.get_size() {
        dst.reset(src.get_size(), 0);
    }
    let src_slice = src.slice(z);
    let mut dst_slice = dst.slice_mut(z);
    correct_image(&src_slice, &mut dst_slice, correction, center, dr);
}
