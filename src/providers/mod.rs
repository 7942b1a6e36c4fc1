//! External collaborator interfaces.
//!
//! Geocoding, turn-by-turn directions and route geometry are network
//! concerns outside this crate. They are consumed through the traits below;
//! [`Unavailable`] fails every call so that every consumer takes its
//! fallback path (geodesic costs, straight-line paths).

use std::collections::HashMap;
use std::future::Future;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{InputError, ProviderError, Result};
use crate::models::{Coordinate, Location};

/// Directions between two points as reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directions {
    /// Road polyline from origin to destination.
    pub geometry: Vec<Coordinate>,
    /// Road distance in metres.
    pub distance_m: f64,
    /// Expected duration with current traffic, in seconds.
    pub duration_in_traffic_s: f64,
}

impl Directions {
    /// `true` when distance and duration are finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        self.distance_m.is_finite()
            && self.distance_m >= 0.0
            && self.duration_in_traffic_s.is_finite()
            && self.duration_in_traffic_s >= 0.0
    }
}

/// Geometry of a whole multi-stop route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathGeometry {
    /// Polyline through every stop in order.
    pub polyline: Vec<Coordinate>,
    /// Distance of each leg in metres, one per consecutive stop pair.
    pub leg_distances_m: Vec<f64>,
    /// Duration of each leg in seconds, one per consecutive stop pair.
    pub leg_durations_s: Vec<f64>,
}

/// Resolves place names to coordinates.
pub trait Geocoder: Send + Sync {
    /// Looks up a single place name.
    fn geocode(&self, name: &str) -> impl Future<Output = std::result::Result<Coordinate, ProviderError>> + Send;
}

/// Reports traffic-aware directions between two points.
pub trait DirectionsProvider: Send + Sync {
    /// Directions from `origin` to `destination` through optional waypoints.
    fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        waypoints: &[Coordinate],
    ) -> impl Future<Output = std::result::Result<Directions, ProviderError>> + Send;
}

/// Reports a drawable path through an ordered list of stops.
pub trait PathGeometryProvider: Send + Sync {
    /// Geometry for the stops in order, depot at both ends.
    fn path(
        &self,
        stops: &[Coordinate],
    ) -> impl Future<Output = std::result::Result<PathGeometry, ProviderError>> + Send;
}

/// A collaborator that is never reachable.
///
/// # Examples
///
/// ```
/// use fleetflow::models::Coordinate;
/// use fleetflow::providers::{DirectionsProvider, Unavailable};
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let origin = Coordinate::new(0.0, 0.0);
/// let res = rt.block_on(Unavailable.directions(origin, origin, &[]));
/// assert!(res.is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl Geocoder for Unavailable {
    async fn geocode(&self, name: &str) -> std::result::Result<Coordinate, ProviderError> {
        Err(ProviderError::Unavailable(format!("no geocoder configured for '{name}'")))
    }
}

impl DirectionsProvider for Unavailable {
    async fn directions(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
        _waypoints: &[Coordinate],
    ) -> std::result::Result<Directions, ProviderError> {
        Err(ProviderError::Unavailable("no directions provider configured".into()))
    }
}

impl PathGeometryProvider for Unavailable {
    async fn path(&self, _stops: &[Coordinate]) -> std::result::Result<PathGeometry, ProviderError> {
        Err(ProviderError::Unavailable("no geometry provider configured".into()))
    }
}

/// Geocoder backed by a fixed name table. Lookups ignore case and
/// surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    places: HashMap<String, Coordinate>,
}

impl StaticGeocoder {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a place.
    pub fn with_place(mut self, name: &str, coordinate: Coordinate) -> Self {
        self.places.insert(normalize(name), coordinate);
        self
    }

    /// Number of known places.
    pub fn len(&self) -> usize {
        self.places.len()
    }

    /// Returns `true` if no place is known.
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl Geocoder for StaticGeocoder {
    async fn geocode(&self, name: &str) -> std::result::Result<Coordinate, ProviderError> {
        self.places
            .get(&normalize(name))
            .copied()
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Geocodes a depot and its destinations into indexed, labelled locations.
///
/// Every lookup is mandatory: the first failure rejects the whole request.
/// The depot gets index 0 and destinations `1..` in input order.
///
/// # Errors
///
/// Returns [`InputError::NoDestinations`] for an empty list, the provider's
/// error for a failed lookup, or [`InputError::InvalidCoordinates`] if the
/// geocoder returned an impossible coordinate.
pub async fn resolve_locations<G: Geocoder>(
    geocoder: &G,
    depot: &str,
    destinations: &[String],
) -> Result<Vec<Location>> {
    if destinations.is_empty() {
        return Err(InputError::NoDestinations.into());
    }

    let names: Vec<&str> = std::iter::once(depot)
        .chain(destinations.iter().map(String::as_str))
        .collect();

    let coords = try_join_all(names.iter().map(|name| async move {
        geocoder.geocode(name).await.map_err(|e| {
            warn!(event = "geocode_failed", place = %name, error = %e);
            e
        })
    }))
    .await?;

    let locations: Vec<Location> = names
        .iter()
        .zip(coords)
        .enumerate()
        .map(|(i, (name, c))| Location::new(i, c.lat, c.lon).with_label(*name))
        .collect();

    for loc in &locations {
        loc.validate()?;
    }
    debug!(event = "locations_resolved", count = locations.len());
    Ok(locations)
}
