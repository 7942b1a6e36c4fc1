//! Exact QUBO solvers.
//!
//! [`ExhaustiveSolver`] enumerates the full binary space depth-first,
//! pruning any branch whose optimistic bound cannot beat the incumbent.
//! The bound of a partial assignment `x_0..x_{d-1}` is
//!
//! ```text
//! E_d + Σ_{k≥d} min(0, field_k) + Σ_{d≤k<l} min(0, q_kl)
//! ```
//!
//! where `E_d` is the energy restricted to assigned variables and
//! `field_k = linear_k + Σ_{i<d, x_i=1} q_ik` is the marginal effect of
//! setting an unassigned `x_k`. No completion can fall below it.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use super::Qubo;

/// Failures of the exact solve. Never surfaced to callers; the formulator
/// turns each into a fallback reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// The cancel flag was raised before the search finished.
    #[error("solve cancelled")]
    Cancelled,

    /// No assignment passed the acceptance check.
    #[error("no feasible assignment")]
    NoFeasibleAssignment,

    /// The model has non-finite coefficients.
    #[error("numeric fault: {0}")]
    Numeric(String),

    /// The worker running the solve failed.
    #[error("worker failed: {0}")]
    WorkerFailed(String),
}

/// Best assignment found by a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// One value per variable.
    pub bits: Vec<bool>,
    /// Energy of `bits`.
    pub energy: f64,
}

/// Finds the minimum-energy accepted assignment of a QUBO.
pub trait QuboSolver: Send + Sync {
    /// Solves `qubo`, considering only full assignments for which `accept`
    /// returns `true`. Must return [`SolverError::Cancelled`] promptly once
    /// `cancel` is set.
    fn solve(
        &self,
        qubo: &Qubo,
        accept: &(dyn Fn(&[bool]) -> bool + Sync),
        cancel: &AtomicBool,
    ) -> Result<Assignment, SolverError>;
}

/// Depth-first branch-and-bound over every binary assignment.
///
/// Deterministic: variables are fixed in index order, `0` before `1`, and
/// an incumbent is only replaced by a strictly lower energy, so among equal
/// optima the first one in that order wins.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::AtomicBool;
/// use fleetflow::combinatorial::{ExhaustiveSolver, Qubo, QuboSolver};
///
/// let mut q = Qubo::new(3);
/// q.add_linear(0, 4.0);
/// q.add_linear(1, 2.0);
/// q.add_linear(2, 3.0);
/// q.add_squared_penalty(&[(0, 1.0), (1, 1.0), (2, 1.0)], -1.0, 50.0);
///
/// let best = ExhaustiveSolver::new()
///     .solve(&q, &|_| true, &AtomicBool::new(false))
///     .unwrap();
/// assert_eq!(best.bits, vec![false, true, false]);
/// assert_eq!(best.energy, 2.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveSolver;

impl ExhaustiveSolver {
    /// Creates a solver.
    pub fn new() -> Self {
        Self
    }
}

impl QuboSolver for ExhaustiveSolver {
    fn solve(
        &self,
        qubo: &Qubo,
        accept: &(dyn Fn(&[bool]) -> bool + Sync),
        cancel: &AtomicBool,
    ) -> Result<Assignment, SolverError> {
        if !qubo.is_finite() {
            return Err(SolverError::Numeric("non-finite coefficient".into()));
        }
        let n = qubo.num_variables();

        // tail_neg[d] = Σ_{d≤k<l} min(0, q_kl)
        let mut tail_neg = vec![0.0; n + 1];
        for d in (0..n).rev() {
            let row: f64 = ((d + 1)..n).map(|l| qubo.quadratic(d, l).min(0.0)).sum();
            tail_neg[d] = tail_neg[d + 1] + row;
        }

        let mut search = Search {
            qubo,
            accept,
            cancel,
            tail_neg,
            field: (0..n).map(|k| qubo.linear(k)).collect(),
            bits: vec![false; n],
            best: None,
            best_energy: f64::INFINITY,
        };
        search.descend(0, qubo.offset())?;

        search.best.ok_or(SolverError::NoFeasibleAssignment)
    }
}

struct Search<'a> {
    qubo: &'a Qubo,
    accept: &'a (dyn Fn(&[bool]) -> bool + Sync),
    cancel: &'a AtomicBool,
    tail_neg: Vec<f64>,
    field: Vec<f64>,
    bits: Vec<bool>,
    best: Option<Assignment>,
    best_energy: f64,
}

impl Search<'_> {
    fn descend(&mut self, depth: usize, energy: f64) -> Result<(), SolverError> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(SolverError::Cancelled);
        }
        let n = self.bits.len();

        if depth == n {
            if energy < self.best_energy && (self.accept)(&self.bits) {
                self.best_energy = energy;
                self.best = Some(Assignment {
                    bits: self.bits.clone(),
                    energy,
                });
            }
            return Ok(());
        }

        let optimistic: f64 = energy
            + self.field[depth..].iter().map(|f| f.min(0.0)).sum::<f64>()
            + self.tail_neg[depth];
        if optimistic >= self.best_energy {
            return Ok(());
        }

        // x_depth = 0
        self.descend(depth + 1, energy)?;

        // x_depth = 1
        let gain = self.field[depth];
        self.bits[depth] = true;
        for k in (depth + 1)..n {
            self.field[k] += self.qubo.quadratic(depth, k);
        }
        let result = self.descend(depth + 1, energy + gain);
        for k in (depth + 1)..n {
            self.field[k] -= self.qubo.quadratic(depth, k);
        }
        self.bits[depth] = false;
        result
    }
}
