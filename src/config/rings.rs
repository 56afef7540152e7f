use crate::rings::{BlurKind, PolarRdOption, RingParams};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct RingsToolConfig {
    pub input: PathBuf,
    pub method: RingsMethod,
    /// Ring thickness in pixels.
    #[serde(default = "default_dr")]
    pub dr: f64,
    /// Ring centre `[x, y]`; the image centre when omitted.
    #[serde(default)]
    pub center: Option<[f64; 2]>,
    #[serde(default)]
    pub params: RingParams,
    pub output: RingsOutputConfig,
}

/// Correction method and its method-specific settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum RingsMethod {
    Sijbers {
        #[serde(default)]
        blur: BlurKind,
    },
    PolarRd {
        option: PolarRdOption,
        #[serde(default = "default_subpixel")]
        subpixel_on_ring: f64,
    },
    MmdPolarRd,
}

impl RingsMethod {
    pub fn label(&self) -> String {
        match self {
            Self::Sijbers { blur } => format!("sijbers/{blur:?}").to_lowercase(),
            Self::PolarRd { option, .. } => format!("polar_rd/{option}"),
            Self::MmdPolarRd => "mmd_polar_rd".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RingsOutputConfig {
    pub image: PathBuf,
    pub report_json: PathBuf,
}

impl RingsToolConfig {
    /// Configured centre, or the centre of a `width x height` image.
    pub fn center_for(&self, width: usize, height: usize) -> [f64; 2] {
        self.center
            .unwrap_or([(width as f64 - 1.0) / 2.0, (height as f64 - 1.0) / 2.0])
    }
}

fn default_dr() -> f64 {
    1.0
}

fn default_subpixel() -> f64 {
    1.0
}

pub fn load_config(path: &Path) -> Result<RingsToolConfig, String> {
    let config: RingsToolConfig = super::read_json(path)?;
    if config.dr <= 0.0 {
        return Err(format!("Invalid dr {} in {}: must be > 0", config.dr, path.display()));
    }
    Ok(config)
}
