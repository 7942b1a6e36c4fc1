//! Domain model types for fleet routing.
//!
//! Provides the core abstractions: locations with optional elevation,
//! caller preferences, optimization requests, per-vehicle routes, the
//! solver-level [`RoutePlan`] and the externally reported [`Solution`].

mod location;
mod plan;
mod preferences;
mod request;
mod route;
mod solution;

pub use location::{Coordinate, Location};
pub use plan::{FallbackReason, RoutePlan, SolveMethod};
pub use preferences::{OptimizeFor, PreferenceWeights};
pub use request::{Method, OptimizationRequest};
pub use route::{Route, DEPOT};
pub use solution::{
    GeometrySource, Leg, Metrics, RouteReport, Solution, TrafficImpact, TrafficStatus,
};
