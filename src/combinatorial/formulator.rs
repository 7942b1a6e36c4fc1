//! Admission-gated exact solve with classical fallback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::formulation::{Formulation, Variant};
use super::solver::{ExhaustiveSolver, QuboSolver, SolverError};
use crate::config::{CombinatorialConfig, VariantSelection};
use crate::constructive::{validate_fleet, RouteAssigner};
use crate::distance::CostMatrix;
use crate::error::InputError;
use crate::models::{FallbackReason, RoutePlan};

/// Solves small instances exactly and hands everything else to the
/// classical assigner.
///
/// Fallback happens when the variable count exceeds the ceiling, the
/// one-to-one shape cannot cover the destinations, the solve runs past its
/// deadline, no assignment is feasible, or the solver faults. The fallback
/// plan is exactly what [`RouteAssigner::assign`] returns on the same
/// matrix, tagged `quantum_with_classical_fallback`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use fleetflow::combinatorial::CombinatorialFormulator;
/// use fleetflow::config::CombinatorialConfig;
/// use fleetflow::constructive::RouteAssigner;
/// use fleetflow::distance::CostMatrix;
/// use fleetflow::models::SolveMethod;
///
/// let m = Arc::new(CostMatrix::from_rows(&[
///     vec![0.0, 1.0, 2.0],
///     vec![1.0, 0.0, 1.5],
///     vec![2.0, 1.5, 0.0],
/// ]).unwrap());
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let formulator = CombinatorialFormulator::new(CombinatorialConfig::default(), RouteAssigner::new());
/// let plan = rt.block_on(formulator.solve(m, 2)).unwrap();
/// assert_eq!(plan.method(), SolveMethod::Quantum);
/// assert_eq!(plan.served(), vec![1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct CombinatorialFormulator<S = ExhaustiveSolver> {
    config: CombinatorialConfig,
    assigner: RouteAssigner,
    solver: Arc<S>,
}

impl CombinatorialFormulator {
    /// Creates a formulator backed by [`ExhaustiveSolver`].
    pub fn new(config: CombinatorialConfig, assigner: RouteAssigner) -> Self {
        Self {
            config,
            assigner,
            solver: Arc::new(ExhaustiveSolver::new()),
        }
    }
}

impl<S: QuboSolver + 'static> CombinatorialFormulator<S> {
    /// Replaces the exact solver.
    pub fn with_solver<T: QuboSolver + 'static>(self, solver: T) -> CombinatorialFormulator<T> {
        CombinatorialFormulator {
            config: self.config,
            assigner: self.assigner,
            solver: Arc::new(solver),
        }
    }

    /// Settings in use.
    pub fn config(&self) -> &CombinatorialConfig {
        &self.config
    }

    /// Variant used for `vehicles` vehicles and `destinations` destinations.
    ///
    /// `Auto` picks one-to-one when every destination can have its own
    /// vehicle, full-tour otherwise.
    pub fn select_variant(&self, vehicles: usize, destinations: usize) -> Variant {
        match self.config.variant {
            VariantSelection::OneToOne => Variant::OneToOne,
            VariantSelection::FullTour => Variant::FullTour,
            VariantSelection::Auto if destinations <= vehicles => Variant::OneToOne,
            VariantSelection::Auto => Variant::FullTour,
        }
    }

    /// Applies the admission gate.
    ///
    /// Returns the formulation to solve, or the reason it was refused.
    pub fn admit(&self, matrix: &CostMatrix, vehicles: usize) -> Result<Formulation, FallbackReason> {
        let destinations = matrix.size().saturating_sub(1);
        let variant = self.select_variant(vehicles, destinations);
        if variant == Variant::OneToOne && destinations > vehicles {
            return Err(FallbackReason::UnsupportedShape {
                destinations,
                vehicles,
            });
        }
        let variables = Formulation::count(variant, matrix, vehicles);
        if variables > self.config.variable_ceiling {
            return Err(FallbackReason::AdmissionRejected {
                variables,
                ceiling: self.config.variable_ceiling,
            });
        }
        Ok(Formulation::new(
            variant,
            matrix,
            vehicles,
            self.config.penalty_safety_factor,
        ))
    }

    /// Solves `matrix` for `vehicles` vehicles.
    ///
    /// The exact solve runs on the blocking pool under the configured
    /// deadline. On expiry the worker is told to stop and the fallback plan
    /// is returned without waiting for it.
    ///
    /// # Errors
    ///
    /// Only input errors surface; every solver failure becomes a fallback.
    pub async fn solve(&self, matrix: Arc<CostMatrix>, vehicles: usize) -> Result<RoutePlan, InputError> {
        validate_fleet(&matrix, vehicles)?;

        let formulation = match self.admit(&matrix, vehicles) {
            Ok(f) => f,
            Err(reason) => return self.fallback(&matrix, vehicles, reason),
        };
        info!(
            event = "combinatorial_admitted",
            variant = %formulation.variant(),
            variables = formulation.num_variables(),
            ceiling = self.config.variable_ceiling
        );

        let qubo = formulation.encode(&matrix);
        let cancel = Arc::new(AtomicBool::new(false));
        let worker = {
            let matrix = Arc::clone(&matrix);
            let solver = Arc::clone(&self.solver);
            let cancel = Arc::clone(&cancel);
            tokio::task::spawn_blocking(move || {
                let accept = |bits: &[bool]| formulation.decode(bits, &matrix).is_some();
                let best = solver.solve(&qubo, &accept, &cancel)?;
                debug!(event = "combinatorial_solved", energy = best.energy);
                formulation
                    .decode(&best.bits, &matrix)
                    .ok_or(SolverError::NoFeasibleAssignment)
            })
        };

        let limit = self.config.timeout();
        let reason = match tokio::time::timeout(limit, worker).await {
            Ok(Ok(Ok(plan))) => {
                info!(event = "combinatorial_done", total_cost = plan.total_cost());
                return Ok(plan);
            }
            Ok(Ok(Err(SolverError::NoFeasibleAssignment))) => FallbackReason::NoFeasibleAssignment,
            Ok(Ok(Err(SolverError::Cancelled))) => FallbackReason::Timeout {
                limit_ms: self.config.timeout_ms,
            },
            Ok(Ok(Err(e))) => FallbackReason::SolverFault {
                message: e.to_string(),
            },
            Ok(Err(join)) => FallbackReason::SolverFault {
                message: SolverError::WorkerFailed(join.to_string()).to_string(),
            },
            Err(_) => {
                cancel.store(true, Ordering::Relaxed);
                FallbackReason::Timeout {
                    limit_ms: self.config.timeout_ms,
                }
            }
        };
        self.fallback(&matrix, vehicles, reason)
    }

    fn fallback(
        &self,
        matrix: &CostMatrix,
        vehicles: usize,
        reason: FallbackReason,
    ) -> Result<RoutePlan, InputError> {
        warn!(event = "combinatorial_fallback", reason = ?reason);
        Ok(self.assigner.assign(matrix, vehicles)?.into_fallback(reason))
    }
}
