//! Serialisable reports produced by the ring reducer and the model fitter.
//!
//! Everything here derives `Serialize`/`Deserialize` with camelCase field
//! names so the tools can dump reports as JSON.

pub mod fitting;
pub mod rings;
pub mod timing;

pub use fitting::{LmIteration, ReestimateReport, Termination};
pub use rings::RingCorrectionReport;
pub use timing::{StageTiming, TimingBreakdown};
