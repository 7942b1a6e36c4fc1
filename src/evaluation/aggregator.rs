//! Turns a route plan into the externally reported solution.

use std::time::Duration;

use super::traffic::traffic_impact;
use crate::config::FleetConfig;
use crate::distance::CostMatrix;
use crate::models::{
    Coordinate, GeometrySource, Leg, Location, Metrics, Route, RoutePlan, RouteReport, Solution,
    DEPOT,
};
use crate::providers::PathGeometry;

/// Merges routes with edge records and optional provider geometry.
///
/// Per-leg distance and time come from the route geometry when it reports
/// one value per leg, otherwise from the matrix edge record, otherwise from
/// geodesic distance at the assumed speed. The drawn path is the provider
/// polyline, else the per-edge polylines stitched together, else straight
/// segments between stops. An empty route is reported as the depot alone.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use fleetflow::config::FleetConfig;
/// use fleetflow::constructive::RouteAssigner;
/// use fleetflow::distance::CostMatrixBuilder;
/// use fleetflow::evaluation::SolutionAggregator;
/// use fleetflow::models::{GeometrySource, Location};
///
/// let locations = vec![Location::depot(0.0, 0.0), Location::new(1, 0.0, 1.0)];
/// let config = FleetConfig::default();
/// let matrix = CostMatrixBuilder::new(config.matrix.clone()).geodesic(&locations).unwrap();
/// let plan = RouteAssigner::new().assign(&matrix, 1).unwrap();
///
/// let solution = SolutionAggregator::new(&locations, &matrix, &config)
///     .aggregate(&plan, &[], Duration::from_millis(5));
/// let route = &solution.routes[0];
/// assert_eq!(route.path.len(), 3);
/// assert_eq!(route.geometry, GeometrySource::StraightLine);
/// assert!((route.distance_km - 222.39).abs() < 0.01);
/// ```
pub struct SolutionAggregator<'a> {
    locations: &'a [Location],
    matrix: &'a CostMatrix,
    config: &'a FleetConfig,
}

impl<'a> SolutionAggregator<'a> {
    /// Creates an aggregator over the locations and matrix of one request.
    pub fn new(locations: &'a [Location], matrix: &'a CostMatrix, config: &'a FleetConfig) -> Self {
        Self {
            locations,
            matrix,
            config,
        }
    }

    /// Builds the report for one route.
    pub fn build_route(&self, route: &Route, geometry: Option<&PathGeometry>) -> RouteReport {
        let edges = route.edges();
        let leg_values = geometry.and_then(|g| per_leg_values(g, edges.len()));

        let legs: Vec<Leg> = edges
            .iter()
            .enumerate()
            .map(|(k, &(from, to))| match &leg_values {
                Some(values) => Leg {
                    from,
                    to,
                    cost: self.matrix.get(from, to),
                    distance_km: values[k].0,
                    duration_minutes: values[k].1,
                    estimated: false,
                },
                None => self.leg_from_matrix(from, to),
            })
            .collect();

        let distance_km: f64 = legs.iter().map(|l| l.distance_km).sum();
        let duration_minutes: f64 = legs.iter().map(|l| l.duration_minutes).sum();
        let (path, source) = self.path(route, &edges, geometry);

        RouteReport {
            vehicle: route.vehicle_id(),
            nodes: route.nodes(),
            path,
            geometry: source,
            destinations: route
                .stops()
                .iter()
                .map(|&d| self.locations[d].clone())
                .collect(),
            legs,
            cost: route.cost(),
            distance_km,
            duration_hours: duration_minutes / 60.0,
            traffic_impact: traffic_impact(
                distance_km,
                duration_minutes,
                self.config.matrix.free_flow_speed_kmh,
            ),
        }
    }

    /// Builds the full solution. `geometries[i]` belongs to the `i`-th route;
    /// missing entries count as no geometry.
    pub fn aggregate(
        &self,
        plan: &RoutePlan,
        geometries: &[Option<PathGeometry>],
        elapsed: Duration,
    ) -> Solution {
        let routes: Vec<RouteReport> = plan
            .routes()
            .iter()
            .enumerate()
            .map(|(i, r)| self.build_route(r, geometries.get(i).and_then(Option::as_ref)))
            .collect();

        let total_distance_km: f64 = routes.iter().map(|r| r.distance_km).sum();
        let total_duration_hours: f64 = routes.iter().map(|r| r.duration_hours).sum();

        Solution {
            metrics: Metrics {
                total_distance_km,
                total_duration_hours,
                co2_savings_kg: total_distance_km * self.config.metrics.co2_kg_per_km,
            },
            routes,
            total_cost: plan.total_cost(),
            optimization_time_seconds: elapsed.as_secs_f64(),
            method: plan.method(),
            unassigned: plan.unassigned().to_vec(),
            fallback_reason: plan.fallback().cloned(),
        }
    }

    fn leg_from_matrix(&self, from: usize, to: usize) -> Leg {
        let edge = self.matrix.edge(from, to);
        let distance_km = edge
            .distance_km
            .unwrap_or_else(|| self.locations[from].distance_km_to(&self.locations[to]));
        let duration_minutes = edge
            .duration_minutes
            .unwrap_or(distance_km / self.config.matrix.assumed_speed_km_per_min());
        Leg {
            from,
            to,
            cost: self.matrix.get(from, to),
            distance_km,
            duration_minutes,
            estimated: edge.estimated || edge.duration_minutes.is_none(),
        }
    }

    fn path(
        &self,
        route: &Route,
        edges: &[(usize, usize)],
        geometry: Option<&PathGeometry>,
    ) -> (Vec<Coordinate>, GeometrySource) {
        if route.is_empty() {
            return (
                vec![self.locations[DEPOT].coordinate()],
                GeometrySource::StraightLine,
            );
        }
        if let Some(g) = geometry.filter(|g| g.polyline.len() >= 2) {
            return (g.polyline.clone(), GeometrySource::Provider);
        }

        let per_edge: Vec<&[Coordinate]> = edges
            .iter()
            .map(|&(a, b)| self.matrix.edge(a, b).geometry.as_slice())
            .collect();
        if per_edge.iter().all(|g| g.len() >= 2) {
            let mut stitched: Vec<Coordinate> = Vec::new();
            for segment in per_edge {
                let skip = usize::from(stitched.last() == segment.first());
                stitched.extend_from_slice(&segment[skip..]);
            }
            return (stitched, GeometrySource::Provider);
        }

        let straight = route
            .nodes()
            .iter()
            .map(|&i| self.locations[i].coordinate())
            .collect();
        (straight, GeometrySource::StraightLine)
    }
}

/// `(km, minutes)` per leg when the geometry has one finite, non-negative
/// value per leg for both distance and duration.
fn per_leg_values(g: &PathGeometry, legs: usize) -> Option<Vec<(f64, f64)>> {
    if g.leg_distances_m.len() != legs || g.leg_durations_s.len() != legs {
        return None;
    }
    let ok = |v: &f64| v.is_finite() && *v >= 0.0;
    if !g.leg_distances_m.iter().all(ok) || !g.leg_durations_s.iter().all(ok) {
        return None;
    }
    Some(
        g.leg_distances_m
            .iter()
            .zip(&g.leg_durations_s)
            .map(|(m, s)| (m / 1000.0, s / 60.0))
            .collect(),
    )
}
