//! Optimization request type.

use serde::{Deserialize, Serialize};

use super::{Location, PreferenceWeights};
use crate::error::InputError;

/// Solver family requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Greedy span-balanced assignment.
    #[default]
    Classical,
    /// Exact binary formulation with classical fallback.
    Quantum,
}

/// A request to plan routes for a fleet.
///
/// # Examples
///
/// ```
/// use fleetflow::models::{Location, Method, OptimizationRequest};
///
/// let request = OptimizationRequest::new(
///     Location::depot(0.0, 0.0),
///     vec![Location::new(0, 0.0, 1.0), Location::new(0, 1.0, 0.0)],
///     2,
/// )
/// .with_method(Method::Quantum);
///
/// assert!(request.validate().is_ok());
/// let locations = request.locations();
/// assert_eq!(locations.len(), 3);
/// assert_eq!(locations[2].index(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    /// Shared start and end point.
    pub depot: Location,
    /// Delivery destinations in request order.
    pub destinations: Vec<Location>,
    /// Number of vehicles available.
    pub vehicle_count: usize,
    /// Solver family.
    #[serde(default)]
    pub method: Method,
    /// Optional cost-shaping preferences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<PreferenceWeights>,
}

impl OptimizationRequest {
    /// Creates a classical request without preferences.
    pub fn new(depot: Location, destinations: Vec<Location>, vehicle_count: usize) -> Self {
        Self {
            depot,
            destinations,
            vehicle_count,
            method: Method::default(),
            preferences: None,
        }
    }

    /// Sets the solver family.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets cost-shaping preferences.
    pub fn with_preferences(mut self, preferences: PreferenceWeights) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Checks vehicle count, destination count and every coordinate.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.vehicle_count == 0 {
            return Err(InputError::NoVehicles);
        }
        if self.destinations.is_empty() {
            return Err(InputError::NoDestinations);
        }
        if self.vehicle_count > self.destinations.len() {
            return Err(InputError::TooManyVehicles {
                vehicles: self.vehicle_count,
                destinations: self.destinations.len(),
            });
        }
        for location in self.locations() {
            location.validate()?;
        }
        Ok(())
    }

    /// Depot followed by destinations, renumbered `0..N`.
    pub fn locations(&self) -> Vec<Location> {
        std::iter::once(self.depot.clone().with_index(0))
            .chain(
                self.destinations
                    .iter()
                    .enumerate()
                    .map(|(i, d)| d.clone().with_index(i + 1)),
            )
            .collect()
    }

    /// The ten-city Andhra Pradesh demo: depot Amaravati, three vehicles.
    pub fn demo() -> Self {
        let cities = [
            ("Vijayawada", 16.5062, 80.6480),
            ("Guntur", 16.2991, 80.4575),
            ("Nellore", 14.4426, 79.9865),
            ("Kurnool", 15.8281, 78.0373),
            ("Anantapur", 14.6819, 77.6006),
            ("Kadapa", 14.4753, 78.8215),
            ("Tirupati", 13.6288, 79.4192),
            ("Visakhapatnam", 17.6868, 83.2185),
            ("Rajahmundry", 17.0005, 81.8040),
            ("Kakinada", 16.9604, 82.2389),
        ];
        let destinations = cities
            .iter()
            .enumerate()
            .map(|(i, &(name, lat, lon))| Location::new(i + 1, lat, lon).with_label(name))
            .collect();
        Self::new(
            Location::depot(16.5744, 80.6556).with_label("Amaravati"),
            destinations,
            3,
        )
    }
}
