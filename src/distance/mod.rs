//! Travel cost matrices.
//!
//! Provides the dense [`CostMatrix`], great-circle distance, injectable
//! jitter strategies and the [`CostMatrixBuilder`] that turns locations into
//! a matrix in geodesic, preference-weighted or traffic-aware mode.

mod builder;
mod geodesic;
mod jitter;
mod matrix;

pub use builder::{CostFunction, CostMatrixBuilder};
pub use geodesic::{geodesic_km, EARTH_RADIUS_KM};
pub use jitter::{JitterStrategy, NoJitter, RandomJitter, SeededJitter};
pub use matrix::{CostMatrix, EdgeRecord};
