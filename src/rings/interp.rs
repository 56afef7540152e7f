//! Bilinear and polar-window interpolation on i16 slices.

use crate::image::ImageView;

/// Half extents of the polar neighbourhood averaged around a sample.
///
/// A zero window degenerates to a plain bilinear lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolarWindow {
    /// Half angular step (radians).
    pub half_angle: f64,
    /// Half radial step (pixels).
    pub half_radius: f64,
}

impl PolarWindow {
    pub const NONE: PolarWindow = PolarWindow {
        half_angle: 0.0,
        half_radius: 0.0,
    };

    fn is_empty(&self) -> bool {
        self.half_angle <= 0.0 && self.half_radius <= 0.0
    }
}

/// True when `(x, y)` lies inside the pixel grid `[0, w-1] × [0, h-1]`.
#[inline]
pub fn is_valid<I: ImageView<Pixel = i16>>(img: &I, x: f64, y: f64) -> bool {
    if !x.is_finite() || !y.is_finite() || img.width() == 0 || img.height() == 0 {
        return false;
    }
    x >= 0.0 && y >= 0.0 && x <= (img.width() - 1) as f64 && y <= (img.height() - 1) as f64
}

/// Bilinear lookup. The caller guarantees `is_valid(img, x, y)`.
#[inline]
pub fn bilinear<I: ImageView<Pixel = i16>>(img: &I, x: f64, y: f64) -> f64 {
    let xf = x.floor();
    let yf = y.floor();
    let x0 = xf as usize;
    let y0 = yf as usize;
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);
    let tx = x - xf;
    let ty = y - yf;

    let r0 = img.row(y0);
    let r1 = img.row(y1);
    let v0 = r0[x0] as f64 * (1.0 - tx) + r0[x1] as f64 * tx;
    let v1 = r1[x0] as f64 * (1.0 - tx) + r1[x1] as f64 * tx;
    v0 * (1.0 - ty) + v1 * ty
}

/// Sample at `pos`, averaged with the valid bilinear samples one half step
/// inward/outward in radius and one half step either way in angle around
/// `center`. The caller guarantees `pos` itself is valid.
pub fn polar_sample<I: ImageView<Pixel = i16>>(
    img: &I,
    pos: [f64; 2],
    center: [f64; 2],
    window: PolarWindow,
) -> f64 {
    let mut sum = bilinear(img, pos[0], pos[1]);
    if window.is_empty() {
        return sum;
    }
    let mut count = 1.0;

    let dx = pos[0] - center[0];
    let dy = pos[1] - center[1];
    let r = (dx * dx + dy * dy).sqrt();
    let theta = dy.atan2(dx);
    let neighbours = [
        (r - window.half_radius, theta),
        (r + window.half_radius, theta),
        (r, theta - window.half_angle),
        (r, theta + window.half_angle),
    ];
    for (nr, nt) in neighbours {
        if nr < 0.0 {
            continue;
        }
        let x = center[0] + nr * nt.cos();
        let y = center[1] + nr * nt.sin();
        if is_valid(img, x, y) {
            sum += bilinear(img, x, y);
            count += 1.0;
        }
    }
    sum / count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageI16;

    #[test]
    fn bilinear_blends_neighbours() {
        let img = ImageI16::from_fn(3, 3, |x, y| (10 * x + 100 * y) as i16);
        assert!((bilinear(&img, 0.5, 0.0) - 5.0).abs() < 1e-12);
        assert!((bilinear(&img, 1.5, 1.5) - 165.0).abs() < 1e-12);
        assert!((bilinear(&img, 2.0, 2.0) - 220.0).abs() < 1e-12);
    }

    #[test]
    fn validity_covers_the_pixel_grid() {
        let img = ImageI16::new(4, 3);
        assert!(is_valid(&img, 0.0, 0.0));
        assert!(is_valid(&img, 3.0, 2.0));
        assert!(!is_valid(&img, 3.01, 1.0));
        assert!(!is_valid(&img, -0.01, 1.0));
        assert!(!is_valid(&img, f64::NAN, 1.0));
    }

    #[test]
    fn polar_window_on_linear_ramp_stays_close() {
        let img = ImageI16::from_fn(32, 32, |x, _| x as i16);
        let window = PolarWindow {
            half_angle: 0.05,
            half_radius: 0.5,
        };
        let v = polar_sample(&img, [20.0, 16.0], [16.0, 16.0], window);
        assert!((v - 20.0).abs() < 0.05, "v={v}");
    }
}
