use serde::{Deserialize, Serialize};

use super::timing::TimingBreakdown;

/// Result of one ring-reduction run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingCorrectionReport {
    pub method: String,
    pub width: usize,
    pub height: usize,
    pub dr: f64,
    pub center: [f64; 2],
    /// Correction per radial bin (bin = radius / dr).
    pub correction: Vec<f64>,
    pub timing: TimingBreakdown,
}
