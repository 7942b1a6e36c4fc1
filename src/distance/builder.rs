//! Cost matrix construction from locations.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::jitter::{JitterStrategy, NoJitter, RandomJitter, SeededJitter};
use super::matrix::{CostMatrix, EdgeRecord};
use crate::config::{CostMode, MatrixConfig};
use crate::error::{InputError, ProviderError};
use crate::models::{Location, OptimizeFor, PreferenceWeights};
use crate::providers::{Directions, DirectionsProvider};

/// How edge costs are computed.
#[derive(Debug, Clone, PartialEq)]
pub enum CostFunction {
    /// Great-circle kilometres; symmetric.
    Geodesic,
    /// Synthetic cost from distance or time plus preference penalties.
    Preference(PreferenceWeights),
    /// Minutes in traffic from a directions provider, per-edge geodesic
    /// fallback on failure.
    TrafficAware,
}

impl CostFunction {
    /// Picks the cost function for a request: preferences win, otherwise the
    /// configured mode.
    pub fn select(mode: CostMode, preferences: Option<&PreferenceWeights>) -> Self {
        match (preferences, mode) {
            (Some(p), _) => Self::Preference(p.clone()),
            (None, CostMode::Geodesic) => Self::Geodesic,
            (None, CostMode::TrafficAware) => Self::TrafficAware,
        }
    }
}

/// Builds N×N cost matrices.
///
/// Builders hold no mutable state; one instance may serve concurrent requests.
///
/// # Examples
///
/// ```
/// use fleetflow::config::MatrixConfig;
/// use fleetflow::distance::CostMatrixBuilder;
/// use fleetflow::models::Location;
///
/// let builder = CostMatrixBuilder::new(MatrixConfig::default());
/// let locations = vec![Location::depot(0.0, 0.0), Location::new(1, 0.0, 1.0)];
/// let m = builder.geodesic(&locations).unwrap();
/// assert_eq!(m.get(0, 0), 0.0);
/// assert_eq!(m.get(0, 1), m.get(1, 0));
/// ```
#[derive(Clone)]
pub struct CostMatrixBuilder {
    config: MatrixConfig,
    jitter: Arc<dyn JitterStrategy>,
}

impl std::fmt::Debug for CostMatrixBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostMatrixBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CostMatrixBuilder {
    /// Creates a builder; the jitter strategy follows `config.jitter`.
    pub fn new(config: MatrixConfig) -> Self {
        let j = &config.jitter;
        let jitter: Arc<dyn JitterStrategy> = match (j.enabled, j.seed) {
            (false, _) => Arc::new(NoJitter),
            (true, Some(seed)) => Arc::new(SeededJitter::new(seed, j.max_fraction)),
            (true, None) => Arc::new(RandomJitter::new(j.max_fraction)),
        };
        Self { config, jitter }
    }

    /// Replaces the jitter strategy.
    pub fn with_jitter(mut self, jitter: impl JitterStrategy + 'static) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    /// Matrix settings in use.
    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    /// Builds a matrix with the given cost function.
    ///
    /// `directions` is only consulted in [`CostFunction::TrafficAware`] mode.
    pub async fn build<D: DirectionsProvider>(
        &self,
        locations: &[Location],
        function: &CostFunction,
        directions: &D,
    ) -> Result<CostMatrix, InputError> {
        match function {
            CostFunction::Geodesic => self.geodesic(locations),
            CostFunction::Preference(weights) => self.preference_weighted(locations, weights),
            CostFunction::TrafficAware => self.traffic_aware(locations, directions).await,
        }
    }

    /// Great-circle kilometres between every pair.
    pub fn geodesic(&self, locations: &[Location]) -> Result<CostMatrix, InputError> {
        validate(locations)?;
        let n = locations.len();
        let mut m = CostMatrix::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let km = locations[i].distance_km_to(&locations[j]);
                m.set(i, j, km);
                m.set(j, i, km);
                m.set_edge(i, j, distance_only(km));
                m.set_edge(j, i, distance_only(km));
            }
        }
        debug!(event = "matrix_built", mode = "geodesic", size = n);
        Ok(m)
    }

    /// Synthetic preference-weighted cost.
    ///
    /// The base is kilometres, or minutes at the assumed speed when
    /// optimizing for time. Fuel, elevation, toll and ferry penalties are
    /// added, then the jitter factor is applied.
    pub fn preference_weighted(
        &self,
        locations: &[Location],
        weights: &PreferenceWeights,
    ) -> Result<CostMatrix, InputError> {
        validate(locations)?;
        let p = &self.config.penalties;
        let per_min = self.config.assumed_speed_km_per_min();
        let n = locations.len();
        let mut m = CostMatrix::new(n);

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let (a, b) = (&locations[i], &locations[j]);
                let km = a.distance_km_to(b);
                let climb = a.elevation_change_to(b);

                let mut cost = match weights.optimize_for() {
                    OptimizeFor::Distance => km,
                    OptimizeFor::Time => km / per_min,
                };
                if weights.optimize_for_fuel() {
                    cost += km * p.fuel_per_km + climb * p.fuel_elevation_per_m;
                }
                if weights.include_elevation() {
                    cost += climb * p.elevation_per_m;
                }
                if weights.avoid_tolls() {
                    cost += p.toll;
                }
                if weights.avoid_ferries() {
                    cost += p.ferry;
                }
                cost *= self.jitter.factor(i, j);

                m.set(i, j, cost);
                m.set_edge(i, j, distance_only(km));
            }
        }
        debug!(event = "matrix_built", mode = "preference", size = n);
        Ok(m)
    }

    /// Minutes in traffic for every ordered pair.
    ///
    /// All `N·(N−1)` provider calls are in flight concurrently, bounded by
    /// `max_concurrent_requests`, each with its own deadline. The matrix is
    /// returned only after every call has settled. A failed, timed-out or
    /// malformed call costs `geodesic_km / assumed_speed_km_per_min` and is
    /// tagged as an estimate.
    pub async fn traffic_aware<D: DirectionsProvider>(
        &self,
        locations: &[Location],
        provider: &D,
    ) -> Result<CostMatrix, InputError> {
        validate(locations)?;
        let n = locations.len();
        let deadline = self.config.provider_timeout();

        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .collect();

        let results: Vec<(usize, usize, Result<Directions, ProviderError>)> = stream::iter(pairs)
            .map(|(i, j)| {
                let origin = locations[i].coordinate();
                let destination = locations[j].coordinate();
                async move {
                    let outcome =
                        match tokio::time::timeout(deadline, provider.directions(origin, destination, &[]))
                            .await
                        {
                            Ok(res) => res,
                            Err(_) => Err(ProviderError::Timeout),
                        };
                    (i, j, outcome)
                }
            })
            .buffer_unordered(self.config.max_concurrent_requests.max(1))
            .collect()
            .await;

        let per_min = self.config.assumed_speed_km_per_min();
        let mut m = CostMatrix::new(n);
        let mut fallbacks = 0usize;

        for (i, j, outcome) in results {
            let directions = outcome.and_then(|d| {
                if d.is_well_formed() {
                    Ok(d)
                } else {
                    Err(ProviderError::Malformed(format!(
                        "distance={} duration={}",
                        d.distance_m, d.duration_in_traffic_s
                    )))
                }
            });
            match directions {
                Ok(d) => {
                    let minutes = d.duration_in_traffic_s / 60.0;
                    m.set(i, j, minutes);
                    m.set_edge(
                        i,
                        j,
                        EdgeRecord {
                            distance_km: Some(d.distance_m / 1000.0),
                            duration_minutes: Some(minutes),
                            geometry: d.geometry,
                            estimated: false,
                        },
                    );
                }
                Err(e) => {
                    let km = locations[i].distance_km_to(&locations[j]);
                    let minutes = km / per_min;
                    debug!(event = "edge_estimated", from = i, to = j, error = %e);
                    m.set(i, j, minutes);
                    m.set_edge(
                        i,
                        j,
                        EdgeRecord {
                            distance_km: Some(km),
                            duration_minutes: Some(minutes),
                            geometry: Vec::new(),
                            estimated: true,
                        },
                    );
                    fallbacks += 1;
                }
            }
        }

        if fallbacks > 0 {
            warn!(event = "traffic_fallback", estimated = fallbacks, total = n * (n - 1));
        }
        info!(event = "matrix_built", mode = "traffic_aware", size = n, estimated = fallbacks);
        Ok(m)
    }
}

fn distance_only(km: f64) -> EdgeRecord {
    EdgeRecord {
        distance_km: Some(km),
        ..EdgeRecord::default()
    }
}

fn validate(locations: &[Location]) -> Result<(), InputError> {
    if locations.len() < 2 {
        return Err(InputError::TooFewLocations(locations.len()));
    }
    locations.iter().try_for_each(Location::validate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JitterConfig;
    use crate::distance::geodesic_km;
    use crate::models::Coordinate;
    use crate::providers::Unavailable;
    use proptest::prelude::*;
    use std::time::Duration;

    fn locations() -> Vec<Location> {
        vec![
            Location::depot(0.0, 0.0),
            Location::new(1, 0.0, 1.0).with_elevation(100.0),
            Location::new(2, 1.0, 0.0),
        ]
    }

    /// Fixed 2 km/min road with one broken pair.
    struct Road {
        broken: (Coordinate, Coordinate),
    }

    impl DirectionsProvider for Road {
        async fn directions(
            &self,
            origin: Coordinate,
            destination: Coordinate,
            _waypoints: &[Coordinate],
        ) -> Result<Directions, ProviderError> {
            if (origin, destination) == self.broken {
                return Err(ProviderError::Unavailable("503".into()));
            }
            let km = geodesic_km(origin, destination);
            Ok(Directions {
                geometry: vec![origin, destination],
                distance_m: km * 1000.0,
                duration_in_traffic_s: km * 30.0,
            })
        }
    }

    struct Garbage;

    impl DirectionsProvider for Garbage {
        async fn directions(
            &self,
            _origin: Coordinate,
            _destination: Coordinate,
            _waypoints: &[Coordinate],
        ) -> Result<Directions, ProviderError> {
            Ok(Directions {
                geometry: vec![],
                distance_m: -5.0,
                duration_in_traffic_s: f64::NAN,
            })
        }
    }

    struct Stalled;

    impl DirectionsProvider for Stalled {
        async fn directions(
            &self,
            _origin: Coordinate,
            _destination: Coordinate,
            _waypoints: &[Coordinate],
        ) -> Result<Directions, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Timeout)
        }
    }

    #[test]
    fn test_geodesic_symmetric_zero_diagonal() {
        let b = CostMatrixBuilder::new(MatrixConfig::default());
        let m = b.geodesic(&locations()).unwrap();
        assert!(m.is_symmetric(0.0));
        for i in 0..3 {
            assert_eq!(m.get(i, i), 0.0);
            assert_eq!(m.edge(i, i), &EdgeRecord::default());
        }
        assert!((m.get(0, 1) - 111.195).abs() < 0.01);
        assert_eq!(m.edge(0, 1).distance_km, Some(m.get(0, 1)));
    }

    #[test]
    fn test_geodesic_idempotent() {
        let b = CostMatrixBuilder::new(MatrixConfig::default());
        let m1 = b.geodesic(&locations()).unwrap();
        let m2 = b.geodesic(&locations()).unwrap();
        let bits = |m: &CostMatrix| m.as_slice().iter().map(|c| c.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&m1), bits(&m2));
    }

    #[test]
    fn test_rejects_bad_input() {
        let b = CostMatrixBuilder::new(MatrixConfig::default());
        assert_eq!(
            b.geodesic(&[Location::depot(0.0, 0.0)]).unwrap_err(),
            InputError::TooFewLocations(1)
        );
        let bad = vec![Location::depot(0.0, 0.0), Location::new(1, 95.0, 0.0)];
        assert!(matches!(
            b.geodesic(&bad).unwrap_err(),
            InputError::InvalidCoordinates { index: 1, .. }
        ));
    }

    #[test]
    fn test_preference_penalties() {
        let b = CostMatrixBuilder::new(MatrixConfig::default());
        let locs = locations();
        let km = locs[0].distance_km_to(&locs[1]);

        let plain = b.preference_weighted(&locs, &PreferenceWeights::default()).unwrap();
        assert!((plain.get(0, 1) - km).abs() < 1e-9);

        let weights = PreferenceWeights::default()
            .with_elevation(true)
            .with_fuel(true)
            .with_avoid_tolls(true)
            .with_avoid_ferries(true);
        let m = b.preference_weighted(&locs, &weights).unwrap();
        let expected = km + (km * 0.2 + 100.0 * 0.1) + 100.0 * 0.5 + 50.0 + 100.0;
        assert!((m.get(0, 1) - expected).abs() < 1e-9);
        assert_eq!(m.get(1, 1), 0.0);
    }

    #[test]
    fn test_preference_time_base() {
        let b = CostMatrixBuilder::new(MatrixConfig::default());
        let locs = locations();
        let weights = PreferenceWeights::default().with_optimize_for(OptimizeFor::Time);
        let m = b.preference_weighted(&locs, &weights).unwrap();
        let km = locs[0].distance_km_to(&locs[2]);
        assert!((m.get(0, 2) - km / (50.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_seeded_jitter_reproducible() {
        let mut config = MatrixConfig::default();
        config.jitter = JitterConfig {
            enabled: true,
            max_fraction: 0.2,
            seed: Some(11),
        };
        let b = CostMatrixBuilder::new(config);
        let w = PreferenceWeights::default();
        let m1 = b.preference_weighted(&locations(), &w).unwrap();
        let m2 = b.preference_weighted(&locations(), &w).unwrap();
        assert_eq!(m1, m2);

        let plain = CostMatrixBuilder::new(MatrixConfig::default())
            .preference_weighted(&locations(), &w)
            .unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert!(m1.get(i, j) >= plain.get(i, j));
                assert!(m1.get(i, j) <= plain.get(i, j) * 1.2);
            }
        }
    }

    #[test]
    fn test_injected_jitter() {
        struct Double;
        impl JitterStrategy for Double {
            fn factor(&self, _from: usize, _to: usize) -> f64 {
                2.0
            }
        }
        let b = CostMatrixBuilder::new(MatrixConfig::default()).with_jitter(Double);
        let locs = locations();
        let m = b.preference_weighted(&locs, &PreferenceWeights::default()).unwrap();
        assert!((m.get(1, 2) - 2.0 * locs[1].distance_km_to(&locs[2])).abs() < 1e-9);
    }

    #[test]
    fn test_select_cost_function() {
        let prefs = PreferenceWeights::default();
        assert_eq!(
            CostFunction::select(CostMode::TrafficAware, Some(&prefs)),
            CostFunction::Preference(prefs)
        );
        assert_eq!(CostFunction::select(CostMode::Geodesic, None), CostFunction::Geodesic);
        assert_eq!(
            CostFunction::select(CostMode::TrafficAware, None),
            CostFunction::TrafficAware
        );
    }

    #[tokio::test]
    async fn test_traffic_one_failed_pair_falls_back() {
        let locs = locations();
        let provider = Road {
            broken: (locs[1].coordinate(), locs[2].coordinate()),
        };
        let b = CostMatrixBuilder::new(MatrixConfig::default());
        let m = b.traffic_aware(&locs, &provider).await.unwrap();

        let km12 = locs[1].distance_km_to(&locs[2]);
        assert!((m.get(1, 2) - km12 / (50.0 / 60.0)).abs() < 1e-9);
        assert!(m.edge(1, 2).estimated);
        assert!(m.edge(1, 2).geometry.is_empty());

        // the reverse edge came from the provider: 30 s per km
        assert!((m.get(2, 1) - km12 * 0.5).abs() < 1e-9);
        assert!(!m.edge(2, 1).estimated);
        assert_eq!(m.edge(2, 1).geometry.len(), 2);
        assert_eq!(m.estimated_edges(), 1);
        assert_eq!(m.get(1, 1), 0.0);
    }

    #[tokio::test]
    async fn test_traffic_malformed_and_unavailable_fall_back() {
        let locs = locations();
        let b = CostMatrixBuilder::new(MatrixConfig::default());
        let geo = b.geodesic(&locs).unwrap();
        for m in [
            b.traffic_aware(&locs, &Garbage).await.unwrap(),
            b.traffic_aware(&locs, &Unavailable).await.unwrap(),
        ] {
            assert_eq!(m.estimated_edges(), 6);
            for i in 0..3 {
                for j in 0..3 {
                    assert!((m.get(i, j) - geo.get(i, j) / (50.0 / 60.0)).abs() < 1e-9);
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_timeout_falls_back() {
        let mut config = MatrixConfig::default();
        config.provider_timeout_ms = 50;
        let b = CostMatrixBuilder::new(config);
        let m = b.traffic_aware(&locations(), &Stalled).await.unwrap();
        assert_eq!(m.estimated_edges(), 6);
        assert!(m.get(0, 1).is_finite());
    }

    #[tokio::test]
    async fn test_build_dispatches() {
        let b = CostMatrixBuilder::new(MatrixConfig::default());
        let m = b
            .build(&locations(), &CostFunction::Geodesic, &Unavailable)
            .await
            .unwrap();
        assert_eq!(m.estimated_edges(), 0);
        let m = b
            .build(&locations(), &CostFunction::TrafficAware, &Unavailable)
            .await
            .unwrap();
        assert_eq!(m.estimated_edges(), 6);
    }

    proptest! {
        #[test]
        fn prop_geodesic_symmetric(
            points in proptest::collection::vec((-80.0f64..80.0, -170.0f64..170.0), 2..8)
        ) {
            let locs: Vec<Location> = points
                .iter()
                .enumerate()
                .map(|(i, &(lat, lon))| Location::new(i, lat, lon))
                .collect();
            let m = CostMatrixBuilder::new(MatrixConfig::default()).geodesic(&locs).unwrap();
            prop_assert!(m.is_symmetric(0.0));
            for i in 0..locs.len() {
                prop_assert_eq!(m.get(i, i), 0.0);
            }
        }
    }
}
