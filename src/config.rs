//! Configuration for fleetflow.
//!
//! Loaded from TOML so speeds, limits and penalty constants can change without
//! code changes. Every section has defaults, so an empty file is valid.
//!
//! # Examples
//!
//! ```
//! use fleetflow::config::{CostMode, FleetConfig};
//! use std::time::Duration;
//!
//! let config = FleetConfig::from_toml_str(r#"
//!     [matrix]
//!     cost_mode = "traffic_aware"
//!     assumed_speed_kmh = 40.0
//!
//!     [combinatorial]
//!     variable_ceiling = 16
//!     timeout_ms = 5000
//! "#).unwrap();
//!
//! assert_eq!(config.matrix.cost_mode, CostMode::TrafficAware);
//! assert_eq!(config.combinatorial.variable_ceiling, 16);
//! assert_eq!(config.combinatorial.timeout(), Duration::from_secs(5));
//! assert_eq!(config.scheduler.period(), Duration::from_secs(10));
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FleetConfig {
    /// Cost matrix construction.
    pub matrix: MatrixConfig,
    /// Classical assigner.
    pub assigner: AssignerConfig,
    /// Combinatorial formulator.
    pub combinatorial: CombinatorialConfig,
    /// Re-optimization loop and subscriber delivery.
    pub scheduler: SchedulerConfig,
    /// Derived metrics.
    pub metrics: MetricsConfig,
}

impl FleetConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, contains invalid TOML, or
    /// fails [`FleetConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::from_toml_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML file without validating it.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string without validating it.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.matrix;
        if !(m.assumed_speed_kmh.is_finite() && m.assumed_speed_kmh > 0.0) {
            return Err(invalid("matrix.assumed_speed_kmh must be positive"));
        }
        if !(m.free_flow_speed_kmh.is_finite() && m.free_flow_speed_kmh > 0.0) {
            return Err(invalid("matrix.free_flow_speed_kmh must be positive"));
        }
        if m.max_concurrent_requests == 0 {
            return Err(invalid("matrix.max_concurrent_requests must be at least 1"));
        }
        if !(0.0..1.0).contains(&m.jitter.max_fraction) {
            return Err(invalid("matrix.jitter.max_fraction must be in [0, 1)"));
        }
        if let Some(budget) = self.assigner.vehicle_budget {
            if budget.is_nan() || budget < 0.0 {
                return Err(invalid("assigner.vehicle_budget must be non-negative"));
            }
        }
        if !(self.assigner.tie_tolerance >= 0.0) {
            return Err(invalid("assigner.tie_tolerance must be non-negative"));
        }
        if !(self.combinatorial.penalty_safety_factor >= 1.0) {
            return Err(invalid("combinatorial.penalty_safety_factor must be >= 1"));
        }
        if self.combinatorial.variable_ceiling == 0 || self.combinatorial.variable_ceiling > 63 {
            return Err(invalid("combinatorial.variable_ceiling must be in 1..=63"));
        }
        if self.scheduler.period_ms == 0 {
            return Err(invalid("scheduler.period_ms must be positive"));
        }
        if self.scheduler.subscriber_buffer == 0 {
            return Err(invalid("scheduler.subscriber_buffer must be at least 1"));
        }
        Ok(())
    }

    /// Sets the matrix cost mode.
    pub fn with_cost_mode(mut self, mode: CostMode) -> Self {
        self.matrix.cost_mode = mode;
        self
    }

    /// Sets a per-vehicle cost budget.
    pub fn with_vehicle_budget(mut self, budget: f64) -> Self {
        self.assigner.vehicle_budget = Some(budget);
        self
    }

    /// Sets the combinatorial variable ceiling.
    pub fn with_variable_ceiling(mut self, ceiling: usize) -> Self {
        self.combinatorial.variable_ceiling = ceiling;
        self
    }

    /// Sets the combinatorial solve timeout.
    pub fn with_solve_timeout(mut self, timeout: Duration) -> Self {
        self.combinatorial.timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the re-optimization period.
    pub fn with_scheduler_period(mut self, period: Duration) -> Self {
        self.scheduler.period_ms = duration_ms(period);
        self
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Which cost basis the matrix uses when the request has no preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMode {
    /// Great-circle kilometres.
    #[default]
    Geodesic,
    /// Directions-provider minutes with geodesic fallback per edge.
    TrafficAware,
}

/// Cost matrix construction settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MatrixConfig {
    /// Cost basis used without request preferences.
    pub cost_mode: CostMode,
    /// Speed used to turn distance into time for estimates.
    pub assumed_speed_kmh: f64,
    /// Speed used for the free-flow baseline of traffic impact reports.
    pub free_flow_speed_kmh: f64,
    /// Per-call deadline for directions requests.
    pub provider_timeout_ms: u64,
    /// Upper bound on in-flight directions requests.
    pub max_concurrent_requests: usize,
    /// Penalty constants for preference mode.
    pub penalties: PenaltyConfig,
    /// Multiplicative jitter for preference mode.
    pub jitter: JitterConfig,
}

impl MatrixConfig {
    /// Assumed speed in km per minute.
    pub fn assumed_speed_km_per_min(&self) -> f64 {
        self.assumed_speed_kmh / 60.0
    }

    /// Deadline for one directions call.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            cost_mode: CostMode::default(),
            assumed_speed_kmh: 50.0,
            free_flow_speed_kmh: 60.0,
            provider_timeout_ms: 10_000,
            max_concurrent_requests: 16,
            penalties: PenaltyConfig::default(),
            jitter: JitterConfig::default(),
        }
    }
}

/// Additive penalty constants applied in preference mode.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PenaltyConfig {
    /// Cost per metre of elevation change when elevation is included.
    pub elevation_per_m: f64,
    /// Fuel cost per kilometre when optimizing for fuel.
    pub fuel_per_km: f64,
    /// Fuel cost per metre of elevation change when optimizing for fuel.
    pub fuel_elevation_per_m: f64,
    /// Fixed cost per edge when avoiding tolls.
    pub toll: f64,
    /// Fixed cost per edge when avoiding ferries.
    pub ferry: f64,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            elevation_per_m: 0.5,
            fuel_per_km: 0.2,
            fuel_elevation_per_m: 0.1,
            toll: 50.0,
            ferry: 100.0,
        }
    }
}

/// Jitter settings. Disabled by default so matrices are reproducible.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct JitterConfig {
    /// Whether preference-mode costs are jittered at all.
    pub enabled: bool,
    /// Upper bound of the multiplicative increase, e.g. 0.2 for up to +20%.
    pub max_fraction: f64,
    /// Seed for reproducible jitter; thread RNG when absent.
    pub seed: Option<u64>,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_fraction: 0.2,
            seed: None,
        }
    }
}

/// Classical assigner settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AssignerConfig {
    /// Marginal costs closer than this are a tie and go to span balancing.
    pub tie_tolerance: f64,
    /// Per-vehicle budget on the closed route cost; unlimited when absent.
    pub vehicle_budget: Option<f64>,
}

impl Default for AssignerConfig {
    fn default() -> Self {
        Self {
            tie_tolerance: 1e-6,
            vehicle_budget: None,
        }
    }
}

/// Which binary formulation the combinatorial path uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantSelection {
    /// One-to-one when every destination can get its own vehicle, else full-tour.
    #[default]
    Auto,
    /// Always one destination per vehicle.
    OneToOne,
    /// Always directed edges per vehicle.
    FullTour,
}

/// Combinatorial formulator settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CombinatorialConfig {
    /// Admission gate on the number of binary variables.
    pub variable_ceiling: usize,
    /// Wall-clock limit for the exact solve.
    pub timeout_ms: u64,
    /// Multiplier on the sum of finite costs used as the penalty weight.
    pub penalty_safety_factor: f64,
    /// Formulation variant.
    pub variant: VariantSelection,
}

impl CombinatorialConfig {
    /// Wall-clock limit for the exact solve.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CombinatorialConfig {
    fn default() -> Self {
        Self {
            variable_ceiling: 20,
            timeout_ms: 30_000,
            penalty_safety_factor: 2.0,
            variant: VariantSelection::default(),
        }
    }
}

/// Re-optimization loop settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Time between re-optimizations.
    pub period_ms: u64,
    /// Per-subscriber event buffer; a full buffer counts as a failed send.
    pub subscriber_buffer: usize,
}

impl SchedulerConfig {
    /// Time between re-optimizations.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_ms: 10_000,
            subscriber_buffer: 64,
        }
    }
}

/// Derived metric settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MetricsConfig {
    /// Emissions saved per kilometre of optimized route.
    pub co2_kg_per_km: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { co2_kg_per_km: 0.15 }
    }
}
