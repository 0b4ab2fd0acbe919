//!
//! Distributed regular lon-lat grid fields for sea-surface-temperature data
//! assimilation: a partitioned grid with auxiliary per-cell fields, field
//! arithmetic that propagates a missing-value sentinel, collective
//! reductions and gather/scatter, and inverse-distance interpolation of
//! scattered point data onto the grid.
//!
pub mod config;
pub mod covariance;
pub mod dataset;
pub mod errors;
pub mod fields;
pub mod geometry;
pub mod interpolation;
pub mod missing;
pub mod parallel;
pub mod serialization;
