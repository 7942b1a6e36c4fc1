//! Constructive heuristics for the classical path.
//!
//! - [`RouteAssigner`]: Budget- and span-aware greedy assignment, O(V·n²)
//! - [`nearest_neighbor_order`]: Greedy nearest-next ordering of a stop set, O(n²)

mod assigner;

pub(crate) use assigner::validate_fleet;
pub use assigner::{nearest_neighbor_order, RouteAssigner};
