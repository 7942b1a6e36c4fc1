//! End-to-end optimization: matrix, solve, geometry, aggregation, publish.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, info};

use super::events::FleetEvent;
use super::state::SessionState;
use crate::combinatorial::CombinatorialFormulator;
use crate::config::FleetConfig;
use crate::constructive::RouteAssigner;
use crate::distance::{CostFunction, CostMatrix, CostMatrixBuilder};
use crate::error::Result;
use crate::evaluation::SolutionAggregator;
use crate::models::{Location, Method, OptimizationRequest, RoutePlan, Solution};
use crate::providers::{DirectionsProvider, PathGeometry, PathGeometryProvider};

/// Runs optimization requests against one session.
///
/// Every completed run replaces the session's current solution and is
/// published as a `solution_update` event. Quantum requests also emit
/// progress events at 10 % (start), 50 % (fallback taken) and 100 %;
/// re-optimizations emit 10 % and 100 % around their update.
///
/// A run that finishes after the session was cleared is discarded: the
/// session stays empty and nothing is published.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use fleetflow::config::FleetConfig;
/// use fleetflow::models::{Location, OptimizationRequest, SolveMethod};
/// use fleetflow::providers::Unavailable;
/// use fleetflow::service::{FleetOptimizer, SessionState};
///
/// let state = Arc::new(SessionState::default());
/// let optimizer = FleetOptimizer::new(FleetConfig::default(), Unavailable, Unavailable, state.clone());
/// let request = OptimizationRequest::new(
///     Location::depot(0.0, 0.0),
///     vec![Location::new(0, 0.0, 1.0), Location::new(0, 1.0, 0.0)],
///     2,
/// );
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let solution = rt.block_on(optimizer.optimize(&request)).unwrap();
/// assert_eq!(solution.method, SolveMethod::Classical);
/// assert_eq!(solution.routes.len(), 2);
/// assert!(state.current().is_some());
/// ```
pub struct FleetOptimizer<D, P> {
    config: FleetConfig,
    builder: CostMatrixBuilder,
    assigner: RouteAssigner,
    formulator: CombinatorialFormulator,
    directions: D,
    geometry: P,
    state: Arc<SessionState>,
}

impl<D, P> FleetOptimizer<D, P>
where
    D: DirectionsProvider,
    P: PathGeometryProvider,
{
    /// Creates an optimizer. `config` is expected to be validated.
    pub fn new(config: FleetConfig, directions: D, geometry: P, state: Arc<SessionState>) -> Self {
        let assigner = RouteAssigner::from_config(&config.assigner);
        Self {
            builder: CostMatrixBuilder::new(config.matrix.clone()),
            formulator: CombinatorialFormulator::new(config.combinatorial.clone(), assigner.clone()),
            assigner,
            config,
            directions,
            geometry,
            state,
        }
    }

    /// Replaces the matrix builder, e.g. to inject a jitter strategy.
    pub fn with_builder(mut self, builder: CostMatrixBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Settings in use.
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Session this optimizer writes to.
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Optimizes `request` with the method it names.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Input`](crate::FleetError::Input) when the
    /// request is invalid. Provider and solver failures degrade instead.
    pub async fn optimize(&self, request: &OptimizationRequest) -> Result<Arc<Solution>> {
        let generation = self.state.generation();
        let (solution, _) = self.run(request, request.method, generation).await?;
        Ok(solution)
    }

    /// Re-runs the classical assigner for the current request with a fresh
    /// matrix. Returns `None` when the session has no request yet or was
    /// cleared while the run was in flight.
    pub async fn reoptimize(&self) -> Result<Option<Arc<Solution>>> {
        let generation = self.state.generation();
        let Some(request) = self.state.last_request() else {
            return Ok(None);
        };

        self.state
            .publish(&FleetEvent::progress("Re-optimizing current request", 10));
        let (solution, stored) = self.run(&request, Method::Classical, generation).await?;
        if !stored {
            return Ok(None);
        }
        self.state
            .publish(&FleetEvent::progress("Re-optimization complete", 100));
        Ok(Some(solution))
    }

    async fn run(
        &self,
        request: &OptimizationRequest,
        method: Method,
        generation: u64,
    ) -> Result<(Arc<Solution>, bool)> {
        let started = Instant::now();
        request.validate()?;

        let locations = request.locations();
        let function = CostFunction::select(self.config.matrix.cost_mode, request.preferences.as_ref());
        let matrix = self
            .builder
            .build(&locations, &function, &self.directions)
            .await?;
        let matrix = Arc::new(matrix);

        let plan = match method {
            Method::Classical => self.assigner.assign(&matrix, request.vehicle_count)?,
            Method::Quantum => self.solve_quantum(Arc::clone(&matrix), request.vehicle_count).await?,
        };

        let geometries = self.route_geometries(&plan, &locations).await;
        let solution = SolutionAggregator::new(&locations, &matrix, &self.config).aggregate(
            &plan,
            &geometries,
            started.elapsed(),
        );
        let solution = Arc::new(solution);

        if !self
            .state
            .replace_if_generation(generation, Arc::clone(&solution), request.clone())
        {
            info!(
                event = "optimization_discarded",
                method = ?solution.method,
                elapsed_s = solution.optimization_time_seconds
            );
            return Ok((solution, false));
        }
        let delivered = self
            .state
            .publish(&FleetEvent::solution_update(Arc::clone(&solution)));
        info!(
            event = "optimization_done",
            method = ?solution.method,
            routes = solution.routes.len(),
            unassigned = solution.unassigned.len(),
            total_distance_km = solution.metrics.total_distance_km,
            elapsed_s = solution.optimization_time_seconds,
            delivered
        );
        Ok((solution, true))
    }

    async fn solve_quantum(&self, matrix: Arc<CostMatrix>, vehicles: usize) -> Result<RoutePlan> {
        self.state
            .publish(&FleetEvent::progress("Starting quantum optimization", 10));
        let plan = self.formulator.solve(matrix, vehicles).await?;
        if plan.fallback().is_some() {
            self.state
                .publish(&FleetEvent::progress("Falling back to classical assignment", 50));
        }
        self.state
            .publish(&FleetEvent::progress("Optimization complete", 100));
        Ok(plan)
    }

    /// One geometry per route; empty routes, failed calls and calls that
    /// outlast the provider timeout give `None`.
    async fn route_geometries(
        &self,
        plan: &RoutePlan,
        locations: &[Location],
    ) -> Vec<Option<PathGeometry>> {
        let limit = self.config.matrix.provider_timeout();
        let calls = plan.routes().iter().map(|route| async move {
            if route.is_empty() {
                return None;
            }
            let stops: Vec<_> = route
                .nodes()
                .iter()
                .map(|&i| locations[i].coordinate())
                .collect();
            match timeout(limit, self.geometry.path(&stops)).await {
                Ok(Ok(g)) => Some(g),
                Ok(Err(e)) => {
                    debug!(event = "geometry_fallback", vehicle = route.vehicle_id(), error = %e);
                    None
                }
                Err(_) => {
                    debug!(
                        event = "geometry_fallback",
                        vehicle = route.vehicle_id(),
                        timeout_ms = limit.as_millis() as u64
                    );
                    None
                }
            }
        });
        join_all(calls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FleetError, InputError, ProviderError};
    use crate::models::{Coordinate, GeometrySource, PreferenceWeights, SolveMethod};
    use crate::providers::Unavailable;

    /// Draws a straight polyline and reports 1 km / 1 min per leg.
    struct Ruler;

    impl PathGeometryProvider for Ruler {
        async fn path(
            &self,
            stops: &[Coordinate],
        ) -> std::result::Result<PathGeometry, ProviderError> {
            let legs = stops.len().saturating_sub(1);
            Ok(PathGeometry {
                polyline: stops.to_vec(),
                leg_distances_m: vec![1000.0; legs],
                leg_durations_s: vec![60.0; legs],
            })
        }
    }

    /// Never answers.
    struct Silent;

    impl PathGeometryProvider for Silent {
        async fn path(
            &self,
            _stops: &[Coordinate],
        ) -> std::result::Result<PathGeometry, ProviderError> {
            std::future::pending().await
        }
    }

    fn request(vehicles: usize) -> OptimizationRequest {
        OptimizationRequest::new(
            Location::depot(0.0, 0.0),
            vec![
                Location::new(0, 0.0, 1.0),
                Location::new(0, 1.0, 0.0),
                Location::new(0, 0.0, -1.0),
            ],
            vehicles,
        )
    }

    fn optimizer<P: PathGeometryProvider>(geometry: P) -> FleetOptimizer<Unavailable, P> {
        FleetOptimizer::new(
            FleetConfig::default(),
            Unavailable,
            geometry,
            Arc::new(SessionState::default()),
        )
    }

    #[tokio::test]
    async fn test_classical_publishes_update() {
        let opt = optimizer(Unavailable);
        let (_id, mut rx) = opt.state().subscribers().subscribe();

        let solution = opt.optimize(&request(2)).await.unwrap();
        assert_eq!(solution.method, SolveMethod::Classical);
        assert_eq!(solution.num_served(), 3);
        assert!(solution
            .routes
            .iter()
            .all(|r| r.geometry == GeometrySource::StraightLine));

        match rx.try_recv().unwrap() {
            FleetEvent::SolutionUpdate { solution: pushed } => assert!(Arc::ptr_eq(&pushed, &solution)),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(opt.state().last_request(), Some(request(2)));
    }

    #[tokio::test]
    async fn test_quantum_progress_milestones() {
        let opt = optimizer(Unavailable);
        let (_id, mut rx) = opt.state().subscribers().subscribe();

        let solution = opt
            .optimize(&request(3).with_method(Method::Quantum))
            .await
            .unwrap();
        assert_eq!(solution.method, SolveMethod::Quantum);

        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let FleetEvent::Progress { percent, .. } = event {
                percents.push(percent);
            }
        }
        assert_eq!(percents, vec![10, 100]);
    }

    #[tokio::test]
    async fn test_quantum_fallback_reports_fifty_percent() {
        let mut config = FleetConfig::default();
        config.combinatorial.variable_ceiling = 1;
        let opt = FleetOptimizer::new(config, Unavailable, Unavailable, Arc::new(SessionState::default()));
        let (_id, mut rx) = opt.state().subscribers().subscribe();

        let solution = opt
            .optimize(&request(2).with_method(Method::Quantum))
            .await
            .unwrap();
        assert_eq!(solution.method, SolveMethod::QuantumWithClassicalFallback);
        assert!(solution.fallback_reason.is_some());

        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let FleetEvent::Progress { percent, .. } = event {
                percents.push(percent);
            }
        }
        assert_eq!(percents, vec![10, 50, 100]);
    }

    #[tokio::test]
    async fn test_provider_geometry_flows_through() {
        let opt = optimizer(Ruler);
        let solution = opt.optimize(&request(1)).await.unwrap();
        let route = &solution.routes[0];
        assert_eq!(route.geometry, GeometrySource::Provider);
        assert!((route.distance_km - 4.0).abs() < 1e-9);
        assert!((solution.metrics.total_duration_hours - 4.0 / 60.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_geometry_provider_times_out() {
        let opt = optimizer(Silent);
        let limit = opt.config().matrix.provider_timeout();
        let begun = tokio::time::Instant::now();

        let solution = opt.optimize(&request(2)).await.unwrap();
        assert_eq!(solution.num_served(), 3);
        assert!(solution
            .routes
            .iter()
            .all(|r| r.geometry == GeometrySource::StraightLine));
        assert!(begun.elapsed() >= limit);
        assert!(begun.elapsed() < limit * 2);
    }

    #[tokio::test]
    async fn test_run_after_clear_is_discarded() {
        let opt = optimizer(Unavailable);
        let (_id, mut rx) = opt.state().subscribers().subscribe();
        let stale = opt.state().generation();
        opt.state().clear();

        let (solution, stored) = opt.run(&request(2), Method::Classical, stale).await.unwrap();
        assert!(!stored);
        assert_eq!(solution.num_served(), 3);
        assert!(opt.state().current().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reoptimize_reports_progress_around_update() {
        let opt = optimizer(Unavailable);
        opt.optimize(&request(2)).await.unwrap();
        let (_id, mut rx) = opt.state().subscribers().subscribe();

        opt.reoptimize().await.unwrap().unwrap();
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event {
                FleetEvent::Progress { percent, .. } => format!("progress {percent}"),
                other => other.kind().to_string(),
            });
        }
        assert_eq!(kinds, vec!["progress 10", "solution_update", "progress 100"]);
    }

    #[tokio::test]
    async fn test_preferences_change_costs_not_distances() {
        let opt = optimizer(Unavailable);
        let plain = opt.optimize(&request(1)).await.unwrap();
        let tolls = opt
            .optimize(&request(1).with_preferences(PreferenceWeights::new().with_avoid_tolls(true)))
            .await
            .unwrap();
        assert!(tolls.total_cost > plain.total_cost);
        assert!((tolls.metrics.total_distance_km - plain.metrics.total_distance_km).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_invalid_request_leaves_state_untouched() {
        let opt = optimizer(Unavailable);
        let err = opt.optimize(&request(0)).await.unwrap_err();
        assert!(matches!(err, FleetError::Input(InputError::NoVehicles)));
        assert!(opt.state().current().is_none());
    }

    #[tokio::test]
    async fn test_reoptimize_uses_classical() {
        let opt = optimizer(Unavailable);
        assert!(opt.reoptimize().await.unwrap().is_none());

        opt.optimize(&request(3).with_method(Method::Quantum))
            .await
            .unwrap();
        let again = opt.reoptimize().await.unwrap().unwrap();
        assert_eq!(again.method, SolveMethod::Classical);
        assert!(Arc::ptr_eq(&again, &opt.state().current().unwrap()));
    }
}
