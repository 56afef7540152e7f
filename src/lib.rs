#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod fitting;
pub mod image;
pub mod model;
pub mod rings;
pub mod volume;

// Numeric building blocks shared by the two halves of the crate.
pub mod filters;
pub mod sparse;

// --- High-level re-exports -------------------------------------------------

pub use crate::fitting::{FitOptions, LevenbergMarquardt};
pub use crate::model::{Line3D, ModelSet, Point3i, UNLABELED};
pub use crate::rings::{max_ring_radius, RingParams, RingsReducer};
pub use crate::volume::Volume;

pub use crate::diagnostics::{ReestimateReport, RingCorrectionReport};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use vessel_recon::prelude::*;
///
/// # fn main() {
/// let (w, h) = (256usize, 256usize);
/// let slice = ImageI16::from_fn(w, h, |x, y| ((x + y) % 7) as i16 * 100);
/// let mut corrected = ImageI16::new(w, h);
///
/// let reducer = RingsReducer::new(RingParams::default());
/// let correction = reducer.mmd_polar_rd_2d(&slice, &mut corrected, [128.0, 128.0], 1.0);
/// println!("{} rings, max radius {:.1}", correction.len(), max_ring_radius([128.0, 128.0], [256.0, 256.0]));
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{ImageI16, ImageView, ImageViewMut};
    pub use crate::rings::{BlurKind, PolarRdOption};
    pub use crate::{max_ring_radius, RingParams, RingsReducer, Volume};
    pub use crate::{FitOptions, LevenbergMarquardt, Line3D, ModelSet, Point3i, UNLABELED};
}
