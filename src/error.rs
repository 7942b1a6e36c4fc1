//! Error types for fleetflow.
//!
//! Only errors that can reach a caller live in [`FleetError`]. Solver faults
//! on the combinatorial path never surface; they are folded into a
//! [`FallbackReason`](crate::models::FallbackReason) instead.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for fleetflow operations.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The request was rejected before any work was done.
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// A mandatory collaborator call failed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Reasons a request is rejected up front.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// A location has out-of-range or non-finite coordinates.
    #[error("location {index} has invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates {
        /// Location index (0 = depot).
        index: usize,
        /// Latitude as supplied.
        lat: f64,
        /// Longitude as supplied.
        lon: f64,
    },

    /// Vehicle count is zero.
    #[error("vehicle count must be greater than zero")]
    NoVehicles,

    /// No destinations were supplied.
    #[error("at least one destination is required")]
    NoDestinations,

    /// More vehicles than destinations.
    #[error("{vehicles} vehicles exceed {destinations} destinations")]
    TooManyVehicles {
        /// Requested vehicle count.
        vehicles: usize,
        /// Destination count.
        destinations: usize,
    },

    /// A cost matrix needs at least the depot and one destination.
    #[error("need at least 2 locations, got {0}")]
    TooFewLocations(usize),

    /// A matrix entry is negative or NaN.
    #[error("cost from {from} to {to} is not a valid cost: {value}")]
    InvalidCost {
        /// Origin index.
        from: usize,
        /// Destination index.
        to: usize,
        /// Offending value.
        value: f64,
    },

    /// A per-vehicle budget is negative or NaN.
    #[error("vehicle budget must be non-negative, got {0}")]
    InvalidBudget(f64),
}

/// Failures reported by external collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The provider could not be reached or refused the call.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with data that cannot be used.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// The call did not complete in time.
    #[error("provider call timed out")]
    Timeout,

    /// The provider had no answer for the query.
    #[error("no result for '{0}'")]
    NotFound(String),
}

/// Result type alias for fleetflow operations.
pub type Result<T> = std::result::Result<T, FleetError>;
