//! Routing preference weights.

use serde::{Deserialize, Serialize};

/// What the base edge cost measures in preference mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeFor {
    /// Kilometres.
    #[default]
    Distance,
    /// Minutes at the assumed speed.
    Time,
}

/// Caller preferences that shape the synthetic edge cost.
///
/// Pure configuration: consumed by the cost matrix builder only and never
/// mutated after construction.
///
/// # Examples
///
/// ```
/// use fleetflow::models::{OptimizeFor, PreferenceWeights};
///
/// let prefs = PreferenceWeights::new()
///     .with_optimize_for(OptimizeFor::Time)
///     .with_avoid_tolls(true);
/// assert_eq!(prefs.optimize_for(), OptimizeFor::Time);
/// assert!(prefs.avoid_tolls());
/// assert!(!prefs.avoid_ferries());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreferenceWeights {
    optimize_for: OptimizeFor,
    optimize_for_fuel: bool,
    include_elevation: bool,
    avoid_tolls: bool,
    avoid_ferries: bool,
}

impl PreferenceWeights {
    /// Distance-based cost with no penalties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time-vs-distance priority.
    pub fn with_optimize_for(mut self, target: OptimizeFor) -> Self {
        self.optimize_for = target;
        self
    }

    /// Toggles the fuel penalty.
    pub fn with_fuel(mut self, enabled: bool) -> Self {
        self.optimize_for_fuel = enabled;
        self
    }

    /// Toggles the elevation-change penalty.
    pub fn with_elevation(mut self, enabled: bool) -> Self {
        self.include_elevation = enabled;
        self
    }

    /// Toggles the toll-avoidance penalty.
    pub fn with_avoid_tolls(mut self, enabled: bool) -> Self {
        self.avoid_tolls = enabled;
        self
    }

    /// Toggles the ferry-avoidance penalty.
    pub fn with_avoid_ferries(mut self, enabled: bool) -> Self {
        self.avoid_ferries = enabled;
        self
    }

    pub fn optimize_for(&self) -> OptimizeFor {
        self.optimize_for
    }

    pub fn optimize_for_fuel(&self) -> bool {
        self.optimize_for_fuel
    }

    pub fn include_elevation(&self) -> bool {
        self.include_elevation
    }

    pub fn avoid_tolls(&self) -> bool {
        self.avoid_tolls
    }

    pub fn avoid_ferries(&self) -> bool {
        self.avoid_ferries
    }
}
