//!
//! Building blocks of the background error covariance: the correlation
//! length parameter field and the standard deviation scaling.
//!
pub mod correlation;
pub mod stddev;

pub use correlation::{CorrelationLengths, COR_RH, ROSSBY_RADIUS};
pub use stddev::StdDev;
