//! Levenberg–Marquardt reestimation of the vessel line models.
//!
//! Each outer iteration builds the sparse system once (see [`jacobian`]) and
//! then solves `(JᵗJ + λI) Δ = −JᵗE` for increasing damping until a step
//! lowers the energy. `JᵗJ` stays sparse and is factored with a sparse
//! Cholesky. Models are only modified by accepted steps.
//!
//! ```no_run
//! use vessel_recon::fitting::{FitOptions, LevenbergMarquardt};
//! # fn demo(points: &[vessel_recon::Point3i], labels: &[i32],
//! #         volume: &vessel_recon::Volume<i32>, models: &mut vessel_recon::ModelSet) {
//! let mut lm = LevenbergMarquardt::new(points, labels, models, volume, FitOptions::default());
//! let report = lm.reestimate();
//! println!("{:?} after {} iterations", report.termination, report.iterations.len());
//! # }
//! ```

pub mod jacobian;
pub mod options;
pub mod projection;

use std::time::Instant;

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;

pub use jacobian::JacobianBuilder;
pub use options::{EnergyWeights, FitOptions, LmOptions, SmoothVariant};
pub use projection::{ProjectionCache, ProjectionEntry};

use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{LmIteration, ReestimateReport, Termination};
use crate::model::{ModelSet, Point3i};
use crate::sparse::CsrMatrix;
use crate::volume::Volume;

/// Solver bound to one dataset and one model set for its lifetime.
pub struct LevenbergMarquardt<'a> {
    builder: JacobianBuilder<'a>,
    points: &'a [Point3i],
    labels: &'a [i32],
    models: &'a mut ModelSet,
    options: LmOptions,
}

/// Trial state kept when a damped step is accepted.
struct AcceptedStep {
    models: ModelSet,
    cache: ProjectionCache,
    energy: f64,
}

impl<'a> LevenbergMarquardt<'a> {
    pub fn new(
        points: &'a [Point3i],
        labels: &'a [i32],
        models: &'a mut ModelSet,
        label_volume: &'a Volume<i32>,
        options: FitOptions,
    ) -> Self {
        let builder = JacobianBuilder::new(points, labels, label_volume, options.weights);
        Self {
            builder,
            points,
            labels,
            models,
            options: options.lm,
        }
    }

    pub fn models(&self) -> &ModelSet {
        &*self.models
    }

    /// Current total energy of the models.
    pub fn energy(&self) -> f64 {
        let cache = ProjectionCache::compute(self.points, self.labels, &*self.models);
        self.builder.energy(&cache, &*self.models)
    }

    pub fn reestimate(&mut self) -> ReestimateReport {
        let start = Instant::now();
        let opts = self.options.clone();
        let mut lambda = opts.initial_lambda;
        let mut cache = ProjectionCache::compute(self.points, self.labels, &*self.models);
        let mut energy = self.builder.energy(&cache, &*self.models);
        let initial_energy = energy;
        let mut iterations = Vec::new();
        let mut termination = Termination::MaxIterations;

        for iteration in 0..opts.max_iterations {
            let jac = self.builder.build(&cache, &*self.models, opts.variant);
            if jac.nrows() == 0 {
                termination = Termination::NoData;
                break;
            }
            energy = jac.energy();
            if energy <= opts.tolerance {
                termination = Termination::Converged;
                break;
            }

            let normal = jac.matrix.normal_matrix();
            let gradient = jac.gradient();
            let mut rejected_steps = 0;
            let mut last_trial = None;
            let mut accepted = None;

            while rejected_steps <= opts.max_damping_retries && lambda <= opts.max_lambda {
                let Some(delta) = solve_damped(&normal, &gradient, lambda) else {
                    warn!("LM: damped normal equations are singular at lambda={lambda:.3e}");
                    rejected_steps += 1;
                    lambda *= opts.lambda_up;
                    continue;
                };
                let mut trial = self.models.clone();
                trial.apply_update(delta.as_slice());
                let trial_cache = ProjectionCache::compute(self.points, self.labels, &trial);
                let trial_energy = self.builder.energy(&trial_cache, &trial);
                last_trial = Some(trial_energy);
                if trial_energy < energy {
                    lambda /= opts.lambda_down;
                    accepted = Some(AcceptedStep {
                        models: trial,
                        cache: trial_cache,
                        energy: trial_energy,
                    });
                    break;
                }
                rejected_steps += 1;
                lambda *= opts.lambda_up;
            }

            iterations.push(LmIteration {
                iteration,
                energy,
                trial_energy: last_trial,
                lambda,
                accepted: accepted.is_some(),
                rejected_steps,
                rows: jac.nrows(),
                nonzeros: jac.matrix.nnz(),
            });
            debug!(
                "LM iter {iteration}: energy={energy:.6e} trial={last_trial:?} lambda={lambda:.3e} rejected={rejected_steps}"
            );

            let Some(step) = accepted else {
                warn!("LM: no acceptable step at iteration {iteration} (lambda={lambda:.3e})");
                termination = Termination::Stalled;
                break;
            };
            let decrease = energy - step.energy;
            *self.models = step.models;
            cache = step.cache;
            energy = step.energy;
            if decrease < opts.tolerance {
                termination = Termination::Converged;
                break;
            }
        }

        let report = ReestimateReport {
            initial_energy,
            final_energy: energy,
            iterations,
            termination,
            elapsed_ms: elapsed_ms(start),
        };
        info!(
            "LM reestimation: energy {:.6e} -> {:.6e} ({:?}, {} iterations, {:.2} ms)",
            report.initial_energy,
            report.final_energy,
            report.termination,
            report.iterations.len(),
            report.elapsed_ms
        );
        report
    }
}

/// Solve `(A + λI) Δ = −g` for the symmetric sparse `A`; `None` when the
/// damped matrix is not positive definite.
fn solve_damped(normal: &CsrMatrix, gradient: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let damped = match normal.damped_symmetric_csc(lambda) {
        Ok(m) => m,
        Err(e) => {
            warn!("LM: cannot damp normal matrix: {e}");
            return None;
        }
    };
    let chol = CscCholesky::factor(&damped).ok()?;
    let rhs = DMatrix::from_iterator(gradient.len(), 1, gradient.iter().map(|g| -g));
    let delta = DVector::from_column_slice(chol.solve(&rhs).as_slice());
    delta.iter().all(|v| v.is_finite()).then_some(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagonal(values: &[f64]) -> CsrMatrix {
        let mut m = CsrMatrix::new(values.len());
        for (k, &v) in values.iter().enumerate() {
            m.push_row([(k, v)]);
        }
        m
    }

    #[test]
    fn damped_solve_shrinks_with_lambda() {
        let normal = diagonal(&[2.0, 4.0]);
        let g = DVector::from_vec(vec![2.0, -4.0]);
        let small = solve_damped(&normal, &g, 0.0).expect("spd");
        assert!((small - DVector::from_vec(vec![-1.0, 1.0])).norm() < 1e-12);
        let large = solve_damped(&normal, &g, 1e6).expect("spd");
        assert!(large.norm() < 1e-5);
    }

    #[test]
    fn zero_matrix_needs_damping() {
        let normal = diagonal(&[0.0, 0.0, 0.0]);
        let g = DVector::from_vec(vec![1.0, 0.0, 0.0]);
        assert!(solve_damped(&normal, &g, 0.0).is_none());
        assert!(solve_damped(&normal, &g, 1.0).is_some());
    }

    #[test]
    fn sparse_solve_matches_dense_cholesky() {
        // Three 2-column blocks; the outer two only couple through the middle.
        let mut jac = CsrMatrix::new(6);
        jac.push_row([(0, 1.0), (1, 0.5), (2, -1.0), (3, 0.25)]);
        jac.push_row([(0, -0.5), (1, 2.0)]);
        jac.push_row([(2, 1.5), (3, -1.0), (4, 0.75), (5, 1.0)]);
        jac.push_row([(4, -2.0), (5, 0.5)]);
        jac.push_row([(1, 1.0), (3, 1.0), (5, 1.0)]);
        let normal = jac.normal_matrix();
        let g = DVector::from_vec(vec![0.3, -1.2, 0.8, 0.1, -0.4, 2.0]);
        let lambda = 1e-2;

        let mut dense = jac.to_dense().transpose() * jac.to_dense();
        for k in 0..6 {
            dense[(k, k)] += lambda;
        }
        let expected = -dense.cholesky().expect("spd").solve(&g);
        let delta = solve_damped(&normal, &g, lambda).expect("spd");
        assert!((delta - expected).norm() < 1e-10);
    }
}
