use nalgebra::Vector3;
use vessel_recon::image::ImageI16;
use vessel_recon::model::{Line3D, ModelSet, Point3i, UNLABELED};
use vessel_recon::volume::Volume;

/// Image whose intensity depends only on the distance to `center`.
pub fn radial_image(width: usize, height: usize, center: [f64; 2], f: impl Fn(f64) -> f64) -> ImageI16 {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    ImageI16::from_fn(width, height, |x, y| {
        let dx = x as f64 - center[0];
        let dy = y as f64 - center[1];
        f((dx * dx + dy * dy).sqrt()).round() as i16
    })
}

/// Constant background with bright bands of `band` pixels every `period`
/// pixels of radius.
pub fn banded_rings(
    width: usize,
    height: usize,
    center: [f64; 2],
    period: usize,
    band: usize,
    base: f64,
    amplitude: f64,
) -> ImageI16 {
    assert!(band < period, "band must be narrower than the period");
    radial_image(width, height, center, |r| {
        if (r as usize) % period < band {
            base + amplitude
        } else {
            base
        }
    })
}

/// Mean intensity per integer radius bin.
pub fn radial_profile(image: &ImageI16, center: [f64; 2], bins: usize) -> Vec<f64> {
    let mut sum = vec![0.0; bins];
    let mut count = vec![0usize; bins];
    for y in 0..image.h {
        for x in 0..image.w {
            let dx = x as f64 - center[0];
            let dy = y as f64 - center[1];
            let bin = (dx * dx + dy * dy).sqrt() as usize;
            if bin < bins {
                sum[bin] += image.data[y * image.stride + x] as f64;
                count[bin] += 1;
            }
        }
    }
    sum.iter()
        .zip(&count)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect()
}

pub fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt()
}

/// Labelled voxels of a straight tube along x, split into consecutive
/// segments of `segment_length` voxels. Each axis voxel comes with its four
/// neighbours in y and z.
pub struct TubeDataset {
    pub points: Vec<Point3i>,
    pub labels: Vec<i32>,
    pub volume: Volume<i32>,
    pub truth: ModelSet,
}

pub fn straight_tube(segments: usize, segment_length: usize) -> TubeDataset {
    let margin = 3usize;
    let sx = segments * segment_length + 2 * margin;
    let (cy, cz) = (margin as i32, margin as i32);
    let mut volume = Volume::filled([sx, 2 * margin + 1, 2 * margin + 1], UNLABELED);
    let mut points = Vec::new();
    let mut labels = Vec::new();
    let mut truth = Vec::new();

    for s in 0..segments {
        let x0 = margin + s * segment_length;
        let x1 = x0 + segment_length - 1;
        truth.push(Line3D::new(
            Vector3::new(x0 as f64, cy as f64, cz as f64),
            Vector3::new(x1 as f64, cy as f64, cz as f64),
            1.0,
        ));
        for x in x0..=x1 {
            for (dy, dz) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
                let p = Point3i::new(x as i32, cy + dy, cz + dz);
                volume.set(p.x as usize, p.y as usize, p.z as usize, s as i32);
                points.push(p);
                labels.push(s as i32);
            }
        }
    }

    TubeDataset {
        points,
        labels,
        volume,
        truth: ModelSet::new(truth),
    }
}

/// Deterministic endpoint offsets of up to `amplitude` voxels.
pub fn perturb(models: &ModelSet, amplitude: f64) -> ModelSet {
    let offsets = [
        Vector3::new(0.4, -0.7, 0.3),
        Vector3::new(-0.5, 0.6, -0.8),
        Vector3::new(0.9, 0.2, 0.5),
        Vector3::new(-0.3, -0.4, 0.7),
    ];
    let mut k = 0;
    let mut next = || {
        let o = offsets[k % offsets.len()] * amplitude;
        k += 1;
        o
    };
    ModelSet::new(
        models
            .models
            .iter()
            .map(|m| Line3D::new(m.p1 + next(), m.p2 + next(), m.radius))
            .collect(),
    )
}

/// Mean distance between a model and samples of the true axis.
pub fn axis_error(truth: &Line3D, model: &Line3D) -> f64 {
    let samples = 10;
    (0..=samples)
        .map(|k| model.distance(&(truth.p1 + (truth.p2 - truth.p1) * (k as f64 / samples as f64))))
        .sum::<f64>()
        / (samples + 1) as f64
}
