//! Externally reported solution types.

use serde::{Deserialize, Serialize};

use super::{Coordinate, FallbackReason, Location, SolveMethod};

/// One traversed edge of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Origin location index.
    pub from: usize,
    /// Destination location index.
    pub to: usize,
    /// Matrix cost of this edge.
    pub cost: f64,
    /// Road or geodesic distance in kilometres.
    pub distance_km: f64,
    /// Travel time in minutes.
    pub duration_minutes: f64,
    /// `true` when distance or time was derived from the geodesic fallback.
    pub estimated: bool,
}

/// Where a route's drawn path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySource {
    /// Polyline returned by the path geometry provider.
    Provider,
    /// Straight segments between stops.
    StraightLine,
}

/// Congestion classification of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficStatus {
    NoDelay,
    LightCongestion,
    HeavyCongestion,
}

/// Realised duration compared with a free-flow baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficImpact {
    pub status: TrafficStatus,
    /// Whole minutes of delay; negative when faster than free flow.
    pub delay_min: i64,
    /// Delay relative to the free-flow duration, in percent.
    pub delay_percent: i64,
}

/// A vehicle's route as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteReport {
    /// Vehicle slot.
    pub vehicle: usize,
    /// Node indices, depot at both ends (depot alone when empty).
    pub nodes: Vec<usize>,
    /// Coordinates from depot through stops back to depot.
    pub path: Vec<Coordinate>,
    /// Where `path` came from.
    pub geometry: GeometrySource,
    /// Visited destinations in order.
    pub destinations: Vec<Location>,
    /// Per-edge breakdown.
    pub legs: Vec<Leg>,
    /// Matrix cost including the closing leg.
    pub cost: f64,
    pub distance_km: f64,
    pub duration_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_impact: Option<TrafficImpact>,
}

/// Fleet-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_distance_km: f64,
    pub total_duration_hours: f64,
    /// Linear in total distance.
    pub co2_savings_kg: f64,
}

/// The externally reported result of an optimization.
///
/// Immutable once built; shared as `Arc<Solution>` by the session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub routes: Vec<RouteReport>,
    pub metrics: Metrics,
    /// Sum of matrix costs over every traversed edge.
    pub total_cost: f64,
    pub optimization_time_seconds: f64,
    pub method: SolveMethod,
    /// Destination indices left out by a budget-limited assignment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unassigned: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl Solution {
    /// `true` when some destinations were left out.
    pub fn is_partial(&self) -> bool {
        !self.unassigned.is_empty()
    }

    /// Number of destinations served across all routes.
    pub fn num_served(&self) -> usize {
        self.routes.iter().map(|r| r.destinations.len()).sum()
    }
}
