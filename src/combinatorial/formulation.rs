//! Binary encodings of the vehicle assignment problem.
//!
//! Two variants are supported, never mixed:
//!
//! - **One-to-one**: `x[v][d] = 1` when vehicle `v` serves destination `d` as
//!   its only stop. Each destination exactly once, each vehicle at most once.
//!   The cost of a variable is the round trip `depot → d → depot`.
//! - **Full tour**: `x[k][i][j] = 1` when vehicle `k` drives the directed
//!   edge `i → j`. Each destination entered exactly once, every vehicle
//!   leaves and re-enters the depot exactly once, and in-flow equals
//!   out-flow at every destination per vehicle. Subtours satisfy every
//!   penalty term, so decoding rejects them.
//!
//! Edges with infinite cost get no variable.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Qubo;
use crate::distance::CostMatrix;
use crate::models::{Route, RoutePlan, SolveMethod, DEPOT};

/// Which encoding a formulation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// One destination per vehicle.
    OneToOne,
    /// Directed edges per vehicle.
    FullTour,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneToOne => write!(f, "one_to_one"),
            Self::FullTour => write!(f, "full_tour"),
        }
    }
}

/// Meaning of one binary variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    /// Vehicle serves the destination as its only stop.
    Assign { vehicle: usize, destination: usize },
    /// Vehicle drives the directed edge.
    Edge { vehicle: usize, from: usize, to: usize },
}

/// Variable layout plus penalty weight for one instance.
///
/// # Examples
///
/// ```
/// use fleetflow::combinatorial::{Formulation, Variant};
/// use fleetflow::distance::CostMatrix;
///
/// let m = CostMatrix::from_rows(&[
///     vec![0.0, 1.0, 2.0],
///     vec![1.0, 0.0, 1.5],
///     vec![2.0, 1.5, 0.0],
/// ]).unwrap();
///
/// let f = Formulation::new(Variant::OneToOne, &m, 2, 2.0);
/// assert_eq!(f.num_variables(), 4);
/// assert_eq!(Formulation::count(Variant::FullTour, &m, 1), 6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Formulation {
    variant: Variant,
    vehicles: usize,
    size: usize,
    variables: Vec<Variable>,
    penalty: f64,
}

impl Formulation {
    /// Number of variables `variant` would need, without building it.
    pub fn count(variant: Variant, matrix: &CostMatrix, vehicles: usize) -> usize {
        let n = matrix.size();
        let per_vehicle = match variant {
            Variant::OneToOne => (1..n).filter(|&d| round_trip(matrix, d).is_finite()).count(),
            Variant::FullTour => (0..n)
                .flat_map(|i| (0..n).map(move |j| (i, j)))
                .filter(|&(i, j)| i != j && matrix.is_allowed(i, j))
                .count(),
        };
        per_vehicle * vehicles
    }

    /// Lays out the variables of `variant`.
    ///
    /// The penalty weight is `max(Σ finite costs, 1) · safety_factor`, so one
    /// violated constraint always outweighs any feasible objective.
    pub fn new(variant: Variant, matrix: &CostMatrix, vehicles: usize, safety_factor: f64) -> Self {
        let n = matrix.size();
        let mut variables = Vec::new();
        for v in 0..vehicles {
            match variant {
                Variant::OneToOne => {
                    for d in (1..n).filter(|&d| round_trip(matrix, d).is_finite()) {
                        variables.push(Variable::Assign {
                            vehicle: v,
                            destination: d,
                        });
                    }
                }
                Variant::FullTour => {
                    for i in 0..n {
                        for j in (0..n).filter(|&j| j != i && matrix.is_allowed(i, j)) {
                            variables.push(Variable::Edge {
                                vehicle: v,
                                from: i,
                                to: j,
                            });
                        }
                    }
                }
            }
        }
        Self {
            variant,
            vehicles,
            size: n,
            variables,
            penalty: matrix.finite_sum().max(1.0) * safety_factor,
        }
    }

    /// Encoding in use.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Number of binary variables.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Variable layout.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Weight applied to every constraint term.
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Builds the penalty-augmented objective.
    pub fn encode(&self, matrix: &CostMatrix) -> Qubo {
        let mut q = Qubo::new(self.variables.len());
        let p = self.penalty;

        for (idx, var) in self.variables.iter().enumerate() {
            let cost = match *var {
                Variable::Assign { destination, .. } => round_trip(matrix, destination),
                Variable::Edge { from, to, .. } => matrix.get(from, to),
            };
            q.add_linear(idx, cost);
        }

        match self.variant {
            Variant::OneToOne => {
                for d in 1..self.size {
                    let terms = self.select(|var| matches!(var, Variable::Assign { destination, .. } if destination == d));
                    q.add_squared_penalty(&unit(&terms), -1.0, p);
                }
                for v in 0..self.vehicles {
                    let vars = self.select(|var| matches!(var, Variable::Assign { vehicle, .. } if vehicle == v));
                    q.add_at_most_one(&vars, p);
                }
            }
            Variant::FullTour => {
                for d in 1..self.size {
                    let entering = self.select(|var| matches!(var, Variable::Edge { to, .. } if to == d));
                    q.add_squared_penalty(&unit(&entering), -1.0, p);
                }
                for k in 0..self.vehicles {
                    let leaving = self.select(
                        |var| matches!(var, Variable::Edge { vehicle, from, .. } if vehicle == k && from == DEPOT),
                    );
                    q.add_squared_penalty(&unit(&leaving), -1.0, p);
                    let returning = self.select(
                        |var| matches!(var, Variable::Edge { vehicle, to, .. } if vehicle == k && to == DEPOT),
                    );
                    q.add_squared_penalty(&unit(&returning), -1.0, p);

                    for h in 1..self.size {
                        let mut flow: Vec<(usize, f64)> = Vec::new();
                        for (idx, var) in self.variables.iter().enumerate() {
                            if let Variable::Edge { vehicle, from, to } = *var {
                                if vehicle != k {
                                    continue;
                                }
                                if to == h {
                                    flow.push((idx, 1.0));
                                } else if from == h {
                                    flow.push((idx, -1.0));
                                }
                            }
                        }
                        q.add_squared_penalty(&flow, 0.0, p);
                    }
                }
            }
        }
        q
    }

    /// Recovers routes from an assignment.
    ///
    /// Returns `None` if the assignment breaks any constraint, including
    /// disconnected subtours in the full-tour variant. The plan always has
    /// one route per vehicle, tagged [`SolveMethod::Quantum`].
    pub fn decode(&self, bits: &[bool], matrix: &CostMatrix) -> Option<RoutePlan> {
        if bits.len() != self.variables.len() {
            return None;
        }
        let chosen = self
            .variables
            .iter()
            .zip(bits)
            .filter(|(_, b)| **b)
            .map(|(v, _)| *v);

        let routes = match self.variant {
            Variant::OneToOne => self.decode_one_to_one(chosen)?,
            Variant::FullTour => self.decode_full_tour(chosen)?,
        };

        let mut seen = vec![false; self.size];
        for &d in routes.iter().flatten() {
            if d == DEPOT || d >= self.size || seen[d] {
                return None;
            }
            seen[d] = true;
        }
        if seen.iter().skip(1).any(|&s| !s) {
            return None;
        }

        let mut plan = RoutePlan::new(SolveMethod::Quantum);
        let mut total = 0.0;
        for (v, stops) in routes.into_iter().enumerate() {
            let mut route = Route::with_stops(v, stops);
            let cost = matrix.route_cost(&route.nodes());
            route.set_cost(cost);
            total += cost;
            plan.add_route(route);
        }
        plan.set_total_cost(total);
        Some(plan)
    }

    fn decode_one_to_one(&self, chosen: impl Iterator<Item = Variable>) -> Option<Vec<Vec<usize>>> {
        let mut routes: Vec<Vec<usize>> = vec![Vec::new(); self.vehicles];
        for var in chosen {
            let Variable::Assign { vehicle, destination } = var else {
                return None;
            };
            if !routes[vehicle].is_empty() {
                return None;
            }
            routes[vehicle].push(destination);
        }
        Some(routes)
    }

    fn decode_full_tour(&self, chosen: impl Iterator<Item = Variable>) -> Option<Vec<Vec<usize>>> {
        // successor[k][i] = j for every chosen edge i → j of vehicle k
        let mut successor: Vec<Vec<Option<usize>>> = vec![vec![None; self.size]; self.vehicles];
        let mut edges = vec![0usize; self.vehicles];
        for var in chosen {
            let Variable::Edge { vehicle, from, to } = var else {
                return None;
            };
            if successor[vehicle][from].replace(to).is_some() {
                return None;
            }
            edges[vehicle] += 1;
        }

        let mut routes = Vec::with_capacity(self.vehicles);
        for (k, next) in successor.iter().enumerate() {
            let mut stops = Vec::new();
            let mut at = next[DEPOT]?;
            while at != DEPOT {
                if stops.len() >= self.size {
                    return None;
                }
                stops.push(at);
                at = next[at]?;
            }
            // every chosen edge of this vehicle must lie on the depot tour
            if stops.len() + 1 != edges[k] {
                return None;
            }
            routes.push(stops);
        }
        Some(routes)
    }

    fn select(&self, pred: impl Fn(Variable) -> bool) -> Vec<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| pred(**v))
            .map(|(i, _)| i)
            .collect()
    }
}

fn round_trip(matrix: &CostMatrix, d: usize) -> f64 {
    matrix.get(DEPOT, d) + matrix.get(d, DEPOT)
}

fn unit(vars: &[usize]) -> Vec<(usize, f64)> {
    vars.iter().map(|&i| (i, 1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinatorial::{ExhaustiveSolver, QuboSolver};
    use std::sync::atomic::AtomicBool;

    fn triangle() -> CostMatrix {
        CostMatrix::from_rows(&[
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 1.5],
            vec![2.0, 1.5, 0.0],
        ])
        .unwrap()
    }

    fn square() -> CostMatrix {
        // depot and three destinations on the corners of a unit square
        let pts = [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)];
        let rows: Vec<Vec<f64>> = pts
            .iter()
            .map(|a: &(f64, f64)| {
                pts.iter()
                    .map(|b| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt())
                    .collect()
            })
            .collect();
        CostMatrix::from_rows(&rows).unwrap()
    }

    fn index_of(f: &Formulation, target: Variable) -> usize {
        f.variables().iter().position(|&v| v == target).unwrap()
    }

    fn bits_for(f: &Formulation, vars: &[Variable]) -> Vec<bool> {
        let mut bits = vec![false; f.num_variables()];
        for &v in vars {
            bits[index_of(f, v)] = true;
        }
        bits
    }

    fn solve(f: &Formulation, m: &CostMatrix) -> RoutePlan {
        let q = f.encode(m);
        let accept = |bits: &[bool]| f.decode(bits, m).is_some();
        let best = ExhaustiveSolver::new()
            .solve(&q, &accept, &AtomicBool::new(false))
            .unwrap();
        f.decode(&best.bits, m).unwrap()
    }

    #[test]
    fn test_counts() {
        let m = triangle();
        assert_eq!(Formulation::count(Variant::OneToOne, &m, 2), 4);
        assert_eq!(Formulation::count(Variant::FullTour, &m, 2), 12);
        assert_eq!(Formulation::new(Variant::FullTour, &m, 2, 2.0).num_variables(), 12);
    }

    #[test]
    fn test_infinite_edges_have_no_variable() {
        let inf = f64::INFINITY;
        let m = CostMatrix::from_rows(&[
            vec![0.0, 1.0, inf],
            vec![1.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
        ])
        .unwrap();
        assert_eq!(Formulation::count(Variant::FullTour, &m, 1), 5);
        assert_eq!(Formulation::count(Variant::OneToOne, &m, 2), 2);
    }

    #[test]
    fn test_penalty_weight() {
        let m = triangle();
        let f = Formulation::new(Variant::OneToOne, &m, 2, 2.0);
        assert_eq!(f.penalty(), 9.0 * 2.0);
        let zero = CostMatrix::new(2);
        assert_eq!(Formulation::new(Variant::OneToOne, &zero, 1, 3.0).penalty(), 3.0);
    }

    #[test]
    fn test_one_to_one_decode() {
        let m = triangle();
        let f = Formulation::new(Variant::OneToOne, &m, 2, 2.0);
        let bits = bits_for(
            &f,
            &[
                Variable::Assign { vehicle: 0, destination: 2 },
                Variable::Assign { vehicle: 1, destination: 1 },
            ],
        );
        let plan = f.decode(&bits, &m).unwrap();
        assert_eq!(plan.method(), SolveMethod::Quantum);
        assert_eq!(plan.routes()[0].nodes(), vec![0, 2, 0]);
        assert_eq!(plan.routes()[1].nodes(), vec![0, 1, 0]);
        assert!((plan.total_cost() - 6.0).abs() < 1e-12);
        // feasible assignments carry no penalty
        assert!((f.encode(&m).energy(&bits) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_to_one_decode_rejects_violations() {
        let m = triangle();
        let f = Formulation::new(Variant::OneToOne, &m, 2, 2.0);
        let missing = bits_for(&f, &[Variable::Assign { vehicle: 0, destination: 1 }]);
        assert!(f.decode(&missing, &m).is_none());
        let doubled = bits_for(
            &f,
            &[
                Variable::Assign { vehicle: 0, destination: 1 },
                Variable::Assign { vehicle: 1, destination: 1 },
                Variable::Assign { vehicle: 1, destination: 2 },
            ],
        );
        assert!(f.decode(&doubled, &m).is_none());
        let overloaded = bits_for(
            &f,
            &[
                Variable::Assign { vehicle: 0, destination: 1 },
                Variable::Assign { vehicle: 0, destination: 2 },
            ],
        );
        assert!(f.decode(&overloaded, &m).is_none());
        assert!(f.decode(&[true], &m).is_none());
    }

    #[test]
    fn test_violation_costs_more_than_any_feasible() {
        let m = triangle();
        let f = Formulation::new(Variant::OneToOne, &m, 2, 1.0);
        let q = f.encode(&m);
        let overloaded = bits_for(
            &f,
            &[
                Variable::Assign { vehicle: 0, destination: 1 },
                Variable::Assign { vehicle: 0, destination: 2 },
            ],
        );
        assert!(q.energy(&overloaded) >= f.penalty());
        assert!(m.finite_sum() <= f.penalty());
    }

    #[test]
    fn test_full_tour_decode() {
        let m = square();
        let f = Formulation::new(Variant::FullTour, &m, 1, 2.0);
        let tour = [
            Variable::Edge { vehicle: 0, from: 0, to: 1 },
            Variable::Edge { vehicle: 0, from: 1, to: 2 },
            Variable::Edge { vehicle: 0, from: 2, to: 3 },
            Variable::Edge { vehicle: 0, from: 3, to: 0 },
        ];
        let bits = bits_for(&f, &tour);
        let plan = f.decode(&bits, &m).unwrap();
        assert_eq!(plan.routes()[0].nodes(), vec![0, 1, 2, 3, 0]);
        assert!((plan.total_cost() - 4.0).abs() < 1e-12);
        assert!((f.encode(&m).energy(&bits) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_tour_rejects_subtour() {
        let m = square();
        let f = Formulation::new(Variant::FullTour, &m, 1, 2.0);
        // depot ↔ 1 plus a detached 2 ↔ 3 loop satisfies every penalty term
        let bits = bits_for(
            &f,
            &[
                Variable::Edge { vehicle: 0, from: 0, to: 1 },
                Variable::Edge { vehicle: 0, from: 1, to: 0 },
                Variable::Edge { vehicle: 0, from: 2, to: 3 },
                Variable::Edge { vehicle: 0, from: 3, to: 2 },
            ],
        );
        assert!(f.decode(&bits, &m).is_none());
        assert!(f.encode(&m).energy(&bits) < f.penalty());
    }

    #[test]
    fn test_full_tour_rejects_dead_end() {
        let m = square();
        let f = Formulation::new(Variant::FullTour, &m, 1, 2.0);
        let bits = bits_for(
            &f,
            &[
                Variable::Edge { vehicle: 0, from: 0, to: 1 },
                Variable::Edge { vehicle: 0, from: 1, to: 2 },
            ],
        );
        assert!(f.decode(&bits, &m).is_none());
    }

    #[test]
    fn test_exact_one_to_one_is_optimal_partition() {
        let m = triangle();
        let f = Formulation::new(Variant::OneToOne, &m, 2, 2.0);
        let plan = solve(&f, &m);
        assert_eq!(plan.served(), vec![1, 2]);
        assert!((plan.total_cost() - 6.0).abs() < 1e-9);
        assert!(plan.routes().iter().all(|r| r.len() == 1));
    }

    #[test]
    fn test_exact_full_tour_finds_perimeter() {
        let m = square();
        let f = Formulation::new(Variant::FullTour, &m, 1, 2.0);
        let plan = solve(&f, &m);
        assert_eq!(plan.served(), vec![1, 2, 3]);
        // the perimeter in either direction
        assert!((plan.total_cost() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_full_tour_two_vehicles() {
        let m = triangle();
        let f = Formulation::new(Variant::FullTour, &m, 2, 2.0);
        let plan = solve(&f, &m);
        // every vehicle leaves the depot once, so each takes one stop
        assert_eq!(plan.served(), vec![1, 2]);
        assert!(plan.routes().iter().all(|r| r.len() == 1));
        assert!((plan.total_cost() - 6.0).abs() < 1e-9);
    }
}
