use crate::fitting::FitOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Synthetic vessel dataset plus solver options for `vessel_fit_demo`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FitDemoConfig {
    /// Number of consecutive line segments forming the synthetic vessel.
    pub segments: usize,
    /// Voxels per segment along the vessel axis.
    pub segment_length: usize,
    /// Amplitude (voxels) of the perturbation applied to the initial models.
    pub perturbation: f64,
    pub seed: u64,
    pub fit: FitOptions,
    pub report_json: Option<PathBuf>,
}

impl Default for FitDemoConfig {
    fn default() -> Self {
        Self {
            segments: 3,
            segment_length: 12,
            perturbation: 0.6,
            seed: 7,
            fit: FitOptions::default(),
            report_json: None,
        }
    }
}

pub fn load_config(path: &Path) -> Result<FitDemoConfig, String> {
    let config: FitDemoConfig = super::read_json(path)?;
    if config.segments == 0 || config.segment_length < 2 {
        return Err(format!(
            "Invalid dataset in {}: need at least one segment of length >= 2",
            path.display()
        ));
    }
    Ok(config)
}
