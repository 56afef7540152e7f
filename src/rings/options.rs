use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parameters shared by all ring-reduction methods.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RingParams {
    /// Radius whose ring keeps its intensity (correction pinned to 0).
    pub reference_radius: f64,
    /// Blur window used by the Sijbers method (mean window, or half width of
    /// the Gaussian kernel).
    pub blur_window: usize,
    /// Average each interpolated sample with its polar neighbours.
    pub polar_window: bool,
}

impl Default for RingParams {
    fn default() -> Self {
        Self {
            reference_radius: 100.0,
            blur_window: 15,
            polar_window: true,
        }
    }
}

/// Blur used to separate the ring signal from the anatomy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurKind {
    #[default]
    Mean,
    Gaussian,
}

/// Ring-difference statistic used by the polar method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolarRdOption {
    AvgDiff,
    MedDiff,
}

impl FromStr for PolarRdOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AVG_DIFF" => Ok(Self::AvgDiff),
            "MED_DIFF" => Ok(Self::MedDiff),
            _ => Err(format!(
                "Undefined method option '{s}' (expected AVG_DIFF or MED_DIFF)"
            )),
        }
    }
}

impl fmt::Display for PolarRdOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AvgDiff => f.write_str("AVG_DIFF"),
            Self::MedDiff => f.write_str("MED_DIFF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_option_fails_at_selection() {
        assert_eq!("med_diff".parse::<PolarRdOption>(), Ok(PolarRdOption::MedDiff));
        assert_eq!("AVG_DIFF".parse::<PolarRdOption>(), Ok(PolarRdOption::AvgDiff));
        let err = "mean".parse::<PolarRdOption>().unwrap_err();
        assert!(err.contains("Undefined method option"), "{err}");
        assert!(serde_json::from_str::<PolarRdOption>("\"MODE\"").is_err());
    }
}
