//! Ring statistics on a single slice.
//!
//! Every ring `rid` sits at radius `rid * dr` around the ring centre. Angular
//! sampling uses `max(8, 2πr / spacing)` positions and polar-window
//! interpolation (half an angular step by half a ring thickness).

use super::interp::{is_valid, polar_sample, PolarWindow};
use crate::image::ImageView;
use std::f64::consts::PI;

/// Number of bins produced by [`RadialSampler::distri_of_diff`].
pub const HISTOGRAM_BINS: usize = 200;

const MIN_RING_SAMPLES: usize = 8;

/// Number of angular samples for a ring of `radius` at `spacing` pixels.
#[inline]
pub fn ring_sample_count(radius: f64, spacing: f64) -> usize {
    MIN_RING_SAMPLES.max((2.0 * PI * radius / spacing) as usize)
}

/// Median of `values` (reordered in place). Empty input yields 0.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

/// Polar sampler bound to one slice, ring centre and ring thickness.
pub struct RadialSampler<'a, I> {
    image: &'a I,
    center: [f64; 2],
    dr: f64,
    polar_window: bool,
}

impl<'a, I: ImageView<Pixel = i16>> RadialSampler<'a, I> {
    pub fn new(image: &'a I, center: [f64; 2], dr: f64) -> Self {
        assert!(
            dr > 0.0,
            "dr indicates the thickness of the rings, which should be greater than 0"
        );
        Self {
            image,
            center,
            dr,
            polar_window: true,
        }
    }

    /// Toggle the polar neighbourhood averaging (plain bilinear when off).
    pub fn with_polar_window(mut self, enabled: bool) -> Self {
        self.polar_window = enabled;
        self
    }

    #[inline]
    pub fn radius(&self, rid: usize) -> f64 {
        rid as f64 * self.dr
    }

    fn window(&self, n: usize) -> PolarWindow {
        if !self.polar_window {
            return PolarWindow::NONE;
        }
        PolarWindow {
            half_angle: PI / n as f64,
            half_radius: self.dr / 2.0,
        }
    }

    #[inline]
    fn position(&self, radius: f64, angle: f64) -> [f64; 2] {
        [
            radius * angle.cos() + self.center[0],
            radius * angle.sin() + self.center[1],
        ]
    }

    /// Interpolated samples on ring `rid`, skipping positions outside the image.
    fn ring_values(&self, rid: usize, spacing: f64) -> Vec<f64> {
        let radius = self.radius(rid);
        let n = ring_sample_count(radius, spacing);
        let window = self.window(n);
        let dangle = 2.0 * PI / n as f64;
        let mut values = Vec::with_capacity(n);
        for i in 0..n {
            let pos = self.position(radius, i as f64 * dangle);
            if is_valid(self.image, pos[0], pos[1]) {
                values.push(polar_sample(self.image, pos, self.center, window));
            }
        }
        values
    }

    /// Same-angle differences `ring(rid1) - ring(rid2)` where both samples are
    /// inside the image. `n` angular positions.
    fn paired_differences(&self, rid1: usize, rid2: usize, n: usize) -> Vec<f64> {
        let r1 = self.radius(rid1);
        let r2 = self.radius(rid2);
        let window = self.window(n);
        let dangle = 2.0 * PI / n as f64;
        let mut diffs = Vec::with_capacity(n);
        for i in 0..n {
            let angle = i as f64 * dangle;
            let p1 = self.position(r1, angle);
            let p2 = self.position(r2, angle);
            if is_valid(self.image, p1[0], p1[1]) && is_valid(self.image, p2[0], p2[1]) {
                let v1 = polar_sample(self.image, p1, self.center, window);
                let v2 = polar_sample(self.image, p2, self.center, window);
                diffs.push(v1 - v2);
            }
        }
        diffs
    }

    /// Weighted mean over the pixel band `[r - dr, r + dr]`, weight
    /// `1 - |ρ - r| / dr`, gathered over four quadrants by symmetry plus the
    /// four axis pixels at exactly `r`. Returns 0 when nothing is covered.
    pub fn avg_intensity_on_band(&self, rid: usize) -> f64 {
        let dr = self.dr;
        let (cx, cy) = (self.center[0], self.center[1]);
        let (w, h) = (self.image.width() as i64, self.image.height() as i64);
        let radius = self.radius(rid);
        let r_min = (radius - dr).max(0.0);
        let r_max = radius + dr;
        let r_min2 = r_min * r_min;
        let r_max2 = r_max * r_max;

        let mut sum = 0.0;
        let mut weight = 0.0;
        let mut accumulate = |px: f64, py: f64, pct: f64| {
            // Truncation toward zero: coordinates in (-1, 0) land on pixel 0.
            let (px, py) = (px as i64, py as i64);
            if px >= 0 && px < w && py >= 0 && py < h {
                sum += self.image.get(px as usize, py as usize) as f64 * pct;
                weight += pct;
            }
        };

        let mut x = 1.0;
        while x <= r_max {
            let x2 = x * x;
            let y_min = (r_min2 - x2).max(0.0).sqrt();
            let y_max = (r_max2 - x2).sqrt();
            let mut y = y_min.max(1.0);
            while y <= y_max {
                let dist = ((x2 + y * y).sqrt() - radius).abs();
                if dist <= dr {
                    let pct = 1.0 - dist / dr;
                    for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
                        accumulate(cx + x * sx, cy + y * sy, pct);
                    }
                }
                y += 1.0;
            }
            x += 1.0;
        }

        for (ox, oy) in [(-1.0, 0.0), (0.0, -1.0), (1.0, 0.0), (0.0, 1.0)] {
            accumulate(cx + radius * ox, cy + radius * oy, 1.0);
        }

        if weight > 1e-2 {
            sum / weight
        } else {
            0.0
        }
    }

    /// Mean of the interpolated samples on ring `rid`; 0 without samples.
    pub fn avg_on_ring(&self, rid: usize, subpixel_on_ring: f64) -> f64 {
        let values = self.ring_values(rid, subpixel_on_ring);
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }

    /// Median of the interpolated samples on ring `rid`; 0 with fewer than
    /// two samples.
    pub fn med_on_ring(&self, rid: usize, subpixel_on_ring: f64) -> f64 {
        let mut values = self.ring_values(rid, subpixel_on_ring);
        if values.len() < 2 {
            return 0.0;
        }
        median(&mut values)
    }

    /// Mean same-angle difference between rings `rid1` and `rid2`.
    pub fn avg_diff(&self, rid1: usize, rid2: usize) -> f64 {
        let n = ring_sample_count(self.radius(rid1.max(rid2)), 1.0);
        let diffs = self.paired_differences(rid1, rid2, n);
        if diffs.is_empty() {
            0.0
        } else {
            diffs.iter().sum::<f64>() / diffs.len() as f64
        }
    }

    /// Median same-angle difference between rings `rid1` and `rid2`. Robust
    /// against vessels crossing a ring on a few angles.
    pub fn med_diff(&self, rid1: usize, rid2: usize) -> f64 {
        let n = ring_sample_count(self.radius(rid1.max(rid2)), 1.0);
        let mut diffs = self.paired_differences(rid1, rid2, n);
        median(&mut diffs)
    }

    pub fn avg_diff_v2(&self, rid1: usize, rid2: usize, subpixel_on_ring: f64) -> f64 {
        self.avg_on_ring(rid1, subpixel_on_ring) - self.avg_on_ring(rid2, subpixel_on_ring)
    }

    pub fn med_diff_v2(&self, rid1: usize, rid2: usize, subpixel_on_ring: f64) -> f64 {
        self.med_on_ring(rid1, subpixel_on_ring) - self.med_on_ring(rid2, subpixel_on_ring)
    }

    /// Histogram ([`HISTOGRAM_BINS`] bins spanning min..max) of the same-angle
    /// differences between two rings, sampled at the smaller ring's density.
    pub fn distri_of_diff(&self, rid1: usize, rid2: usize) -> Vec<f64> {
        let n = ring_sample_count(self.radius(rid1.min(rid2)), 1.0);
        let diffs = self.paired_differences(rid1, rid2, n);
        let mut bins = vec![0.0; HISTOGRAM_BINS];
        if diffs.is_empty() {
            return bins;
        }
        let min_val = diffs.iter().copied().fold(f64::INFINITY, f64::min);
        let max_val = diffs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max_val - min_val;
        for d in diffs {
            let bin = if range > 0.0 {
                ((HISTOGRAM_BINS as f64 * (d - min_val) / range) as usize).min(HISTOGRAM_BINS - 1)
            } else {
                0
            };
            bins[bin] += 1.0;
        }
        bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageI16;

    fn radial_image(size: usize, center: [f64; 2], f: impl Fn(f64) -> f64) -> ImageI16 {
        ImageI16::from_fn(size, size, |x, y| {
            let dx = x as f64 - center[0];
            let dy = y as f64 - center[1];
            f((dx * dx + dy * dy).sqrt()).round() as i16
        })
    }

    #[test]
    fn median_edge_cases() {
        assert_eq!(median(&mut []), 0.0);
        assert_eq!(median(&mut [4.5]), 4.5);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut [5.0, -1.0, 3.0]), 3.0);
    }

    #[test]
    fn constant_image_has_no_ring_differences() {
        let img = ImageI16::filled(48, 40, 321);
        for center in [[24.0, 20.0], [3.5, 7.25], [-10.0, 60.0]] {
            let s = RadialSampler::new(&img, center, 1.0);
            for (r1, r2) in [(0, 1), (5, 9), (17, 3)] {
                assert!(s.avg_diff(r1, r2).abs() < 1e-9);
                assert!(s.med_diff(r1, r2).abs() < 1e-9);
                assert!(s.avg_diff_v2(r1, r2, 0.5).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn ring_statistics_on_constant_image() {
        let img = ImageI16::filled(32, 32, 50);
        let s = RadialSampler::new(&img, [16.0, 16.0], 1.0);
        assert!((s.avg_on_ring(6, 1.0) - 50.0).abs() < 1e-9);
        assert!((s.med_on_ring(6, 1.0) - 50.0).abs() < 1e-9);
        assert!((s.avg_intensity_on_band(6) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn rings_outside_the_image_fall_back_to_zero() {
        let img = ImageI16::filled(16, 16, 50);
        let s = RadialSampler::new(&img, [8.0, 8.0], 1.0);
        assert_eq!(s.avg_on_ring(40, 1.0), 0.0);
        assert_eq!(s.med_on_ring(40, 1.0), 0.0);
        assert_eq!(s.med_diff(40, 41), 0.0);
        assert_eq!(s.avg_intensity_on_band(40), 0.0);
    }

    #[test]
    fn ring_difference_tracks_radial_step() {
        let center = [32.0, 32.0];
        let img = radial_image(64, center, |r| if r < 10.0 { 200.0 } else { 100.0 });
        let s = RadialSampler::new(&img, center, 1.0).with_polar_window(false);
        assert!((s.med_diff(5, 20) - 100.0).abs() < 1e-9);
        assert!((s.avg_diff_v2(5, 20, 1.0) - 100.0).abs() < 1e-9);
        assert!(s.med_diff(20, 25).abs() < 1e-9);
    }

    #[test]
    fn median_ring_difference_ignores_a_bright_crossing() {
        let center = [32.0, 32.0];
        let step = radial_image(64, center, |r| if r < 10.0 { 200.0 } else { 100.0 });
        // A bright blob where ring 20 crosses the positive x axis.
        let img = ImageI16::from_fn(64, 64, |x, y| {
            if (50..=54).contains(&x) && (30..=34).contains(&y) {
                1000
            } else {
                step.get(x, y)
            }
        });
        let s = RadialSampler::new(&img, center, 1.0).with_polar_window(false);
        assert!((s.med_diff_v2(5, 20, 1.0) - 100.0).abs() < 1e-9);
        assert!(s.avg_diff_v2(5, 20, 1.0) < 85.0);
    }

    #[test]
    fn band_near_the_left_edge_keeps_column_zero() {
        // Only pixel (0, 4) is bright; the band around x = 0.5 reaches it
        // from x = -0.5.
        let img = ImageI16::from_fn(4, 9, |x, y| if (x, y) == (0, 4) { 1000 } else { 0 });
        let s = RadialSampler::new(&img, [0.5, 4.0], 1.0);
        let diagonal_weight = 2.0 - 2f64.sqrt();
        let expected = 1000.0 / (4.0 * diagonal_weight + 4.0);
        assert!((s.avg_intensity_on_band(1) - expected).abs() < 1e-9);
    }

    #[test]
    fn histogram_counts_every_sample() {
        let center = [32.0, 32.0];
        let img = radial_image(64, center, |r| 10.0 * r);
        let s = RadialSampler::new(&img, center, 1.0);
        let bins = s.distri_of_diff(8, 12);
        assert_eq!(bins.len(), HISTOGRAM_BINS);
        let total: f64 = bins.iter().sum();
        assert_eq!(total as usize, ring_sample_count(8.0, 1.0));
    }

    #[test]
    fn uniform_differences_fill_the_first_bin() {
        let img = ImageI16::filled(32, 32, 0);
        let s = RadialSampler::new(&img, [16.0, 16.0], 1.0);
        let bins = s.distri_of_diff(4, 6);
        assert_eq!(bins[0] as usize, ring_sample_count(4.0, 1.0));
        assert!(bins[1..].iter().all(|&b| b == 0.0));
    }

    #[test]
    #[should_panic(expected = "thickness of the rings")]
    fn non_positive_ring_thickness_is_rejected() {
        let img = ImageI16::new(4, 4);
        let _ = RadialSampler::new(&img, [2.0, 2.0], 0.0);
    }
}
