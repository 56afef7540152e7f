//! Parameters of the vessel-model reestimation.

use serde::{Deserialize, Serialize};

/// Energy weights and the neighbourhood used by the smoothness term.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EnergyWeights {
    /// Weight of the data (distance-to-model) term.
    pub loglikelihood: f64,
    /// Weight of the pairwise smoothness term between adjacent models.
    pub pairwise_smooth: f64,
    /// Maximum number of voxel steps walked along a model tangent when
    /// looking for a neighbouring model.
    pub neighbor_steps: usize,
}

impl Default for EnergyWeights {
    fn default() -> Self {
        Self {
            loglikelihood: 1.0,
            pairwise_smooth: 7.0,
            neighbor_steps: 3,
        }
    }
}

/// How the smoothness rows are assembled. All variants produce identical
/// matrices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothVariant {
    Sequential,
    /// Per-point blocks on the rayon pool, appended in point order.
    #[default]
    Parallel,
    /// Chunk fragments collected under a mutex, merged in chunk order.
    ParallelLocked,
}

/// Damping schedule of the Levenberg–Marquardt loop.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    /// Damping above this value ends the run as stalled.
    pub max_lambda: f64,
    /// Energy decrease below which an accepted step counts as converged.
    pub tolerance: f64,
    /// Rejected steps tolerated within one outer iteration.
    pub max_damping_retries: usize,
    pub variant: SmoothVariant,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 10.0,
            max_lambda: 1e10,
            tolerance: 1e-8,
            max_damping_retries: 12,
            variant: SmoothVariant::Parallel,
        }
    }
}

/// Complete reestimation parameters, as read from a JSON config.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FitOptions {
    pub weights: EnergyWeights,
    pub lm: LmOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts: FitOptions =
            serde_json::from_str(r#"{"lm": {"variant": "parallel_locked", "max_iterations": 3}}"#)
                .expect("parse");
        assert_eq!(opts.lm.variant, SmoothVariant::ParallelLocked);
        assert_eq!(opts.lm.max_iterations, 3);
        assert_eq!(opts.lm.lambda_up, 10.0);
        assert_eq!(opts.weights.pairwise_smooth, 7.0);
    }
}
