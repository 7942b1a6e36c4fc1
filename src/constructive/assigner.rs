//! Budget- and span-aware greedy assignment.
//!
//! Every vehicle starts at the depot. At each step the cheapest
//! `(vehicle, destination)` extension over all vehicles is taken, where the
//! cost of an extension is the edge from the vehicle's current position to
//! the destination. Extensions that would push a vehicle's closed route past
//! its budget are skipped. Among extensions whose cost is within the tie
//! tolerance of the cheapest, the one leaving the smallest maximum
//! cumulative cost across the fleet wins; remaining ties go to the lowest
//! vehicle, then the lowest destination.
//!
//! # Complexity
//!
//! O(V·n²) where n = number of destinations and V = number of vehicles.

use tracing::debug;

use crate::config::AssignerConfig;
use crate::distance::CostMatrix;
use crate::error::InputError;
use crate::models::{Route, RoutePlan, SolveMethod, DEPOT};

/// Greedy span-balanced route assigner.
///
/// # Examples
///
/// ```
/// use fleetflow::constructive::RouteAssigner;
/// use fleetflow::distance::CostMatrix;
///
/// let m = CostMatrix::from_rows(&[
///     vec![0.0, 1.0, 2.0, 3.0],
///     vec![1.0, 0.0, 1.0, 2.0],
///     vec![2.0, 1.0, 0.0, 1.0],
///     vec![3.0, 2.0, 1.0, 0.0],
/// ]).unwrap();
///
/// let plan = RouteAssigner::new().assign(&m, 1).unwrap();
/// assert_eq!(plan.routes()[0].stops(), &[1, 2, 3]);
/// assert_eq!(plan.total_cost(), 6.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RouteAssigner {
    tie_tolerance: f64,
    budget: Option<f64>,
}

impl Default for RouteAssigner {
    fn default() -> Self {
        Self::from_config(&AssignerConfig::default())
    }
}

impl RouteAssigner {
    /// Creates an assigner with no budget and the default tie tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an assigner from configuration.
    pub fn from_config(config: &AssignerConfig) -> Self {
        Self {
            tie_tolerance: config.tie_tolerance,
            budget: config.vehicle_budget,
        }
    }

    /// Sets the per-vehicle budget on the closed route cost.
    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Sets the tolerance under which two extension costs count as tied.
    pub fn with_tie_tolerance(mut self, tolerance: f64) -> Self {
        self.tie_tolerance = tolerance;
        self
    }

    /// Per-vehicle budget, if any.
    pub fn budget(&self) -> Option<f64> {
        self.budget
    }

    /// Assigns every destination of `matrix` (indices `1..n`) to one of
    /// `vehicles` routes.
    ///
    /// Always returns exactly `vehicles` routes in vehicle order; a vehicle
    /// that received nothing has an empty route. Destinations that fit no
    /// vehicle's budget are listed as unassigned, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] if the matrix has fewer than two locations,
    /// `vehicles` is zero or exceeds the destination count, or the budget is
    /// negative or NaN.
    pub fn assign(&self, matrix: &CostMatrix, vehicles: usize) -> Result<RoutePlan, InputError> {
        let n = matrix.size();
        validate_fleet(matrix, vehicles)?;
        if let Some(b) = self.budget {
            if b.is_nan() || b < 0.0 {
                return Err(InputError::InvalidBudget(b));
            }
        }
        let budget = self.budget.unwrap_or(f64::INFINITY);

        let mut position = vec![DEPOT; vehicles];
        let mut cumulative = vec![0.0_f64; vehicles];
        let mut stops: Vec<Vec<usize>> = vec![Vec::new(); vehicles];
        let mut remaining: Vec<usize> = (1..n).collect();

        while !remaining.is_empty() {
            let Some((v, slot, step)) = self.pick(matrix, &position, &cumulative, &remaining, budget)
            else {
                break;
            };
            let dest = remaining.remove(slot);
            stops[v].push(dest);
            position[v] = dest;
            cumulative[v] += step;
        }

        let mut plan = RoutePlan::new(SolveMethod::Classical);
        let mut total = 0.0;
        for (v, seq) in stops.into_iter().enumerate() {
            let mut route = Route::with_stops(v, seq);
            let cost = matrix.route_cost(&route.nodes());
            route.set_cost(cost);
            total += cost;
            plan.add_route(route);
        }
        for &d in &remaining {
            plan.add_unassigned(d);
        }
        plan.set_total_cost(total);

        debug!(
            event = "assignment_done",
            vehicles,
            served = plan.num_served(),
            unassigned = plan.num_unassigned(),
            total_cost = total
        );
        Ok(plan)
    }

    /// Chooses the next extension: `(vehicle, slot in remaining, step cost)`.
    fn pick(
        &self,
        matrix: &CostMatrix,
        position: &[usize],
        cumulative: &[f64],
        remaining: &[usize],
        budget: f64,
    ) -> Option<(usize, usize, f64)> {
        let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
        let mut cheapest = f64::INFINITY;

        for (v, &at) in position.iter().enumerate() {
            for (slot, &d) in remaining.iter().enumerate() {
                let step = matrix.get(at, d);
                let back = matrix.get(d, DEPOT);
                if !step.is_finite() || !back.is_finite() {
                    continue;
                }
                if cumulative[v] + step + back > budget {
                    continue;
                }
                cheapest = cheapest.min(step);
                candidates.push((v, slot, step));
            }
        }
        if candidates.is_empty() {
            return None;
        }

        let fleet_max = cumulative.iter().copied().fold(0.0_f64, f64::max);
        let mut best: Option<(usize, usize, f64, f64)> = None;

        // candidates are already in (vehicle, destination) order
        for (v, slot, step) in candidates {
            if step > cheapest + self.tie_tolerance {
                continue;
            }
            let span = fleet_max.max(cumulative[v] + step);
            match best {
                Some((.., best_span)) if span >= best_span - self.tie_tolerance => {}
                _ => best = Some((v, slot, step, span)),
            }
        }
        best.map(|(v, slot, step, _)| (v, slot, step))
    }
}

/// Checks that `vehicles` can serve the destinations of `matrix`: at least
/// one vehicle, no more vehicles than destinations, no negative or NaN cost.
pub(crate) fn validate_fleet(matrix: &CostMatrix, vehicles: usize) -> Result<(), InputError> {
    let n = matrix.size();
    if n < 2 {
        return Err(InputError::TooFewLocations(n));
    }
    if vehicles == 0 {
        return Err(InputError::NoVehicles);
    }
    if vehicles > n - 1 {
        return Err(InputError::TooManyVehicles {
            vehicles,
            destinations: n - 1,
        });
    }
    if let Some((from, to, value)) = matrix.first_invalid() {
        return Err(InputError::InvalidCost { from, to, value });
    }
    Ok(())
}

/// Orders `stops` by repeatedly moving to the cheapest reachable one,
/// starting from `start`.
///
/// Stops that cannot be reached from the current position are appended in
/// their input order.
///
/// # Examples
///
/// ```
/// use fleetflow::constructive::nearest_neighbor_order;
/// use fleetflow::distance::CostMatrix;
///
/// let m = CostMatrix::from_rows(&[
///     vec![0.0, 10.0, 1.0],
///     vec![10.0, 0.0, 9.0],
///     vec![1.0, 9.0, 0.0],
/// ]).unwrap();
/// assert_eq!(nearest_neighbor_order(&m, 0, &[1, 2]), vec![2, 1]);
/// ```
pub fn nearest_neighbor_order(matrix: &CostMatrix, start: usize, stops: &[usize]) -> Vec<usize> {
    let mut pending = stops.to_vec();
    let mut order = Vec::with_capacity(stops.len());
    let mut current = start;

    while let Some(next) = matrix.nearest_neighbor(current, &pending) {
        pending.retain(|&s| s != next);
        order.push(next);
        current = next;
    }
    order.extend(pending);
    order
}
