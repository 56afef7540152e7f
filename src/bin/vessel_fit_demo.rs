use std::env;
use std::path::Path;

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vessel_recon::config::fit_demo::{self, FitDemoConfig};
use vessel_recon::fitting::LevenbergMarquardt;
use vessel_recon::image::io::write_json_file;
use vessel_recon::model::{Line3D, ModelSet, Point3i, UNLABELED};
use vessel_recon::volume::Volume;

const MARGIN: usize = 4;
/// Axis slope (dy/dx) of each synthetic segment, cycled.
const SLOPES: [f64; 4] = [0.0, 0.25, -0.15, 0.1];

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config = match env::args().nth(1) {
        Some(path) => fit_demo::load_config(Path::new(&path))?,
        None => FitDemoConfig::default(),
    };

    let dataset = Dataset::build(&config);
    let mut models = dataset.perturbed(&config);
    let initial = models.clone();

    let mut lm = LevenbergMarquardt::new(
        &dataset.points,
        &dataset.labels,
        &mut models,
        &dataset.volume,
        config.fit.clone(),
    );
    let report = lm.reestimate();

    println!(
        "{} points, {} models: energy {:.4} -> {:.4} ({:?}, {} iterations, {:.2} ms)",
        dataset.points.len(),
        models.len(),
        report.initial_energy,
        report.final_energy,
        report.termination,
        report.iterations.len(),
        report.elapsed_ms
    );
    for (m, (before, after)) in initial.models.iter().zip(&models.models).enumerate() {
        println!(
            "  model {m}: axis error {:.3} -> {:.3}",
            dataset.axis_error(m, before),
            dataset.axis_error(m, after)
        );
    }

    if let Some(path) = &config.report_json {
        write_json_file(path, &report)?;
        println!("Saved report to {}", path.display());
    }
    Ok(())
}

/// Labelled voxels of a piecewise-straight tube running along x.
struct Dataset {
    points: Vec<Point3i>,
    labels: Vec<i32>,
    volume: Volume<i32>,
    truth: Vec<Line3D>,
}

impl Dataset {
    fn build(config: &FitDemoConfig) -> Self {
        let len = config.segment_length;
        let sx = config.segments * len + 2 * MARGIN;
        let rise: f64 = (0..config.segments)
            .map(|s| SLOPES[s % SLOPES.len()].abs() * len as f64)
            .sum();
        let sy = 2 * (rise.ceil() as usize + MARGIN) + 1;
        let sz = 2 * MARGIN + 1;
        let mut volume = Volume::filled([sx, sy, sz], UNLABELED);
        let mut points = Vec::new();
        let mut labels = Vec::new();
        let mut truth = Vec::new();

        let mut start = Vector3::new(MARGIN as f64, (sy / 2) as f64, (sz / 2) as f64);
        for s in 0..config.segments {
            let slope = SLOPES[s % SLOPES.len()];
            let end = start + Vector3::new(len as f64, slope * len as f64, 0.0);
            truth.push(Line3D::new(start, end, 1.0));
            for k in 0..len {
                let axis = start + (end - start) * (k as f64 / len as f64);
                for (dy, dz) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let p = Point3i::new(
                        axis.x.round() as i32,
                        axis.y.round() as i32 + dy,
                        axis.z.round() as i32 + dz,
                    );
                    if volume.at(p.x as usize, p.y as usize, p.z as usize) != UNLABELED {
                        continue;
                    }
                    volume.set(p.x as usize, p.y as usize, p.z as usize, s as i32);
                    points.push(p);
                    labels.push(s as i32);
                }
            }
            start = end;
        }
        Self {
            points,
            labels,
            volume,
            truth,
        }
    }

    fn perturbed(&self, config: &FitDemoConfig) -> ModelSet {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let amp = config.perturbation.abs();
        let mut jitter = || {
            if amp > 0.0 {
                Vector3::new(
                    rng.gen_range(-amp..amp),
                    rng.gen_range(-amp..amp),
                    rng.gen_range(-amp..amp),
                )
            } else {
                Vector3::zeros()
            }
        };
        ModelSet::new(
            self.truth
                .iter()
                .map(|t| Line3D::new(t.p1 + jitter(), t.p2 + jitter(), t.radius))
                .collect(),
        )
    }

    /// Mean distance of the true axis samples to `model`.
    fn axis_error(&self, m: usize, model: &Line3D) -> f64 {
        let t = &self.truth[m];
        let samples = 8;
        (0..=samples)
            .map(|k| model.distance(&(t.p1 + (t.p2 - t.p1) * (k as f64 / samples as f64))))
            .sum::<f64>()
            / (samples + 1) as f64
    }
}
