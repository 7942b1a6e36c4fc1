//! Route type.

use serde::{Deserialize, Serialize};

/// Index of the depot in every location list and cost matrix.
pub const DEPOT: usize = 0;

/// An ordered sequence of destination visits assigned to a single vehicle.
///
/// The depot is implicit at both ends and is not stored in `stops`.
///
/// # Examples
///
/// ```
/// use fleetflow::models::Route;
///
/// let mut route = Route::new(0);
/// assert_eq!(route.nodes(), vec![0]);
///
/// route.push_stop(3);
/// route.push_stop(1);
/// assert_eq!(route.len(), 2);
/// assert_eq!(route.nodes(), vec![0, 3, 1, 0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    vehicle_id: usize,
    stops: Vec<usize>,
    cost: f64,
}

impl Route {
    /// Creates an empty route for the given vehicle.
    pub fn new(vehicle_id: usize) -> Self {
        Self {
            vehicle_id,
            stops: Vec::new(),
            cost: 0.0,
        }
    }

    /// Creates a route from an ordered list of destination indices.
    pub fn with_stops(vehicle_id: usize, stops: Vec<usize>) -> Self {
        Self {
            vehicle_id,
            stops,
            cost: 0.0,
        }
    }

    /// Appends a destination to the end of this route.
    pub fn push_stop(&mut self, index: usize) {
        self.stops.push(index);
    }

    /// Returns the vehicle assigned to this route.
    pub fn vehicle_id(&self) -> usize {
        self.vehicle_id
    }

    /// Destination indices in visit order (depot excluded).
    pub fn stops(&self) -> &[usize] {
        &self.stops
    }

    /// Number of destinations visited.
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Returns `true` if this route visits no destination.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Full node sequence including the depot at both ends.
    ///
    /// An empty route is the depot alone.
    pub fn nodes(&self) -> Vec<usize> {
        if self.stops.is_empty() {
            return vec![DEPOT];
        }
        let mut nodes = Vec::with_capacity(self.stops.len() + 2);
        nodes.push(DEPOT);
        nodes.extend_from_slice(&self.stops);
        nodes.push(DEPOT);
        nodes
    }

    /// Consecutive `(from, to)` pairs of [`Route::nodes`].
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.nodes().windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// Total cost of this route including the closing leg (set by the solver).
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Sets the total cost.
    pub fn set_cost(&mut self, cost: f64) {
        self.cost = cost;
    }
}
