use serde::{Deserialize, Serialize};

/// Why the Levenberg–Marquardt loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Termination {
    /// Energy decrease of the last accepted step fell below the tolerance.
    Converged,
    /// No acceptable step within the retry budget or damping limit.
    Stalled,
    MaxIterations,
    /// No labeled point produced a residual.
    NoData,
}

/// One outer iteration: a single Jacobian and one or more damped solves.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LmIteration {
    pub iteration: usize,
    pub energy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_energy: Option<f64>,
    /// Damping after the iteration.
    pub lambda: f64,
    pub accepted: bool,
    pub rejected_steps: usize,
    pub rows: usize,
    pub nonzeros: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReestimateReport {
    pub initial_energy: f64,
    pub final_energy: f64,
    pub iterations: Vec<LmIteration>,
    pub termination: Termination,
    pub elapsed_ms: f64,
}

impl ReestimateReport {
    pub fn accepted_steps(&self) -> usize {
        self.iterations.iter().filter(|it| it.accepted).count()
    }
}
