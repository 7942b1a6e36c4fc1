//! # fleetflow
//!
//! Fleet route optimization: cost matrices from geodesic, preference or
//! traffic-aware costs, a budgeted span-balanced classical assigner, an
//! exact QUBO-style combinatorial path with deterministic classical
//! fallback, and a session service that re-optimizes periodically and
//! pushes updates to subscribers.
//!
//! ## Modules
//!
//! - [`models`]: Domain model types (Location, OptimizationRequest, Route, RoutePlan, Solution)
//! - [`distance`]: Cost matrix, geodesic distance, jitter, matrix builder
//! - [`providers`]: Geocoding, directions and geometry collaborator traits
//! - [`constructive`]: Classical route assignment
//! - [`combinatorial`]: QUBO formulation, exact solve, fallback
//! - [`evaluation`]: Solution aggregation and traffic impact
//! - [`service`]: Session state, events, optimizer, re-optimization scheduler
//! - [`config`]: TOML configuration
//!
//! ## Quick start
//!
//! ```
//! use fleetflow::constructive::RouteAssigner;
//! use fleetflow::distance::CostMatrixBuilder;
//! use fleetflow::config::MatrixConfig;
//! use fleetflow::models::OptimizationRequest;
//!
//! let request = OptimizationRequest::demo();
//! let locations = request.locations();
//! let matrix = CostMatrixBuilder::new(MatrixConfig::default())
//!     .geodesic(&locations)
//!     .unwrap();
//! let plan = RouteAssigner::new().assign(&matrix, request.vehicle_count).unwrap();
//! assert_eq!(plan.num_routes(), 3);
//! assert_eq!(plan.num_served(), 10);
//! ```

pub mod combinatorial;
pub mod config;
pub mod constructive;
pub mod distance;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod providers;
pub mod service;

pub use error::{FleetError, Result};
