//! Quantum-inspired combinatorial path.
//!
//! The assignment problem is encoded as a QUBO (constraints folded into the
//! objective as squared penalties), solved exactly by branch-and-bound for
//! small instances and decoded back to routes.
//!
//! - [`Qubo`]: Dense penalty-augmented binary objective
//! - [`Formulation`]: One-to-one and full-tour variable layouts, encode/decode
//! - [`ExhaustiveSolver`]: Deterministic exact search, pluggable via [`QuboSolver`]
//! - [`CombinatorialFormulator`]: Admission gate, worker pool, deadline and fallback

mod formulation;
mod formulator;
mod qubo;
mod solver;

pub use formulation::{Formulation, Variable, Variant};
pub use formulator::CombinatorialFormulator;
pub use qubo::Qubo;
pub use solver::{Assignment, ExhaustiveSolver, QuboSolver, SolverError};
