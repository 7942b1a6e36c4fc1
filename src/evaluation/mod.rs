//! Solution reporting.
//!
//! - [`SolutionAggregator`]: Merges routes, edge records and provider geometry into a [`Solution`](crate::models::Solution)
//! - [`traffic_impact`]: Realised versus free-flow delay classification

mod aggregator;
mod traffic;

pub use aggregator::SolutionAggregator;
pub use traffic::{traffic_impact, LIGHT_CONGESTION_LIMIT_MIN};
