//! Solver output: routes, unassigned destinations and provenance.

use serde::{Deserialize, Serialize};

use super::Route;

/// Which path produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    /// Greedy span-balanced assignment.
    Classical,
    /// Exact solve of the binary formulation.
    Quantum,
    /// Binary formulation refused or failed; classical result returned.
    QuantumWithClassicalFallback,
}

/// Why the combinatorial path handed over to the classical assigner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Variable count exceeded the admission ceiling.
    AdmissionRejected {
        /// Variables the formulation would need.
        variables: usize,
        /// Configured ceiling.
        ceiling: usize,
    },
    /// One destination per vehicle cannot cover this many destinations.
    UnsupportedShape {
        /// Destination count.
        destinations: usize,
        /// Vehicle count.
        vehicles: usize,
    },
    /// The solve step exceeded its wall-clock limit.
    Timeout {
        /// Limit in milliseconds.
        limit_ms: u64,
    },
    /// No assignment satisfied every constraint.
    NoFeasibleAssignment,
    /// The solver or its worker failed.
    SolverFault {
        /// Failure description.
        message: String,
    },
}

/// A set of routes produced by one of the solvers.
///
/// # Examples
///
/// ```
/// use fleetflow::models::{Route, RoutePlan, SolveMethod};
///
/// let mut plan = RoutePlan::new(SolveMethod::Classical);
/// plan.add_route(Route::with_stops(0, vec![2, 1]));
/// plan.add_route(Route::new(1));
/// plan.add_unassigned(3);
/// assert_eq!(plan.num_routes(), 2);
/// assert_eq!(plan.num_served(), 2);
/// assert!(plan.is_partial());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    routes: Vec<Route>,
    unassigned: Vec<usize>,
    total_cost: f64,
    method: SolveMethod,
    fallback: Option<FallbackReason>,
}

impl RoutePlan {
    /// Creates an empty plan.
    pub fn new(method: SolveMethod) -> Self {
        Self {
            routes: Vec::new(),
            unassigned: Vec::new(),
            total_cost: 0.0,
            method,
            fallback: None,
        }
    }

    /// Adds a route to this plan.
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Marks a destination as unassigned.
    pub fn add_unassigned(&mut self, index: usize) {
        self.unassigned.push(index);
    }

    /// Returns the routes in vehicle order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of routes (one per vehicle, empty ones included).
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Destinations no vehicle could take.
    pub fn unassigned(&self) -> &[usize] {
        &self.unassigned
    }

    /// Returns the number of unassigned destinations.
    pub fn num_unassigned(&self) -> usize {
        self.unassigned.len()
    }

    /// `true` when some destinations were left out.
    pub fn is_partial(&self) -> bool {
        !self.unassigned.is_empty()
    }

    /// Sum of all traversed edges, closing legs included.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Sets the total cost.
    pub fn set_total_cost(&mut self, cost: f64) {
        self.total_cost = cost;
    }

    /// Total number of destinations served across all routes.
    pub fn num_served(&self) -> usize {
        self.routes.iter().map(|r| r.len()).sum()
    }

    /// All served destination indices, sorted.
    pub fn served(&self) -> Vec<usize> {
        let mut served: Vec<usize> = self
            .routes
            .iter()
            .flat_map(|r| r.stops().iter().copied())
            .collect();
        served.sort_unstable();
        served
    }

    /// Solver path that produced this plan.
    pub fn method(&self) -> SolveMethod {
        self.method
    }

    /// Why the combinatorial path fell back, if it did.
    pub fn fallback(&self) -> Option<&FallbackReason> {
        self.fallback.as_ref()
    }

    /// Re-tags a classical plan as the fallback result of a quantum request.
    pub fn into_fallback(mut self, reason: FallbackReason) -> Self {
        self.method = SolveMethod::QuantumWithClassicalFallback;
        self.fallback = Some(reason);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_empty() {
        let plan = RoutePlan::new(SolveMethod::Quantum);
        assert_eq!(plan.num_routes(), 0);
        assert_eq!(plan.num_unassigned(), 0);
        assert_eq!(plan.total_cost(), 0.0);
        assert_eq!(plan.num_served(), 0);
        assert!(!plan.is_partial());
        assert!(plan.fallback().is_none());
    }

    #[test]
    fn test_plan_served_sorted() {
        let mut plan = RoutePlan::new(SolveMethod::Classical);
        plan.add_route(Route::with_stops(0, vec![3, 1]));
        plan.add_route(Route::with_stops(1, vec![2]));
        assert_eq!(plan.served(), vec![1, 2, 3]);
        assert_eq!(plan.num_served(), 3);
    }

    #[test]
    fn test_into_fallback() {
        let plan = RoutePlan::new(SolveMethod::Classical).into_fallback(FallbackReason::Timeout {
            limit_ms: 30_000,
        });
        assert_eq!(plan.method(), SolveMethod::QuantumWithClassicalFallback);
        assert_eq!(
            plan.fallback(),
            Some(&FallbackReason::Timeout { limit_ms: 30_000 })
        );
    }

    #[test]
    fn test_method_tags_serialize() {
        let tag = serde_json::to_string(&SolveMethod::QuantumWithClassicalFallback).unwrap();
        assert_eq!(tag, "\"quantum_with_classical_fallback\"");
        let reason = serde_json::to_value(FallbackReason::AdmissionRejected {
            variables: 30,
            ceiling: 20,
        })
        .unwrap();
        assert_eq!(reason["kind"], "admission_rejected");
        assert_eq!(reason["variables"], 30);
    }
}
