//! Coordinate and location types.

use serde::{Deserialize, Serialize};

use crate::distance::geodesic_km;
use crate::error::InputError;

/// A point on the earth's surface in decimal degrees.
///
/// # Examples
///
/// ```
/// use fleetflow::models::Coordinate;
///
/// let c = Coordinate::new(16.5744, 80.6556);
/// assert!(c.is_valid());
/// assert!(!Coordinate::new(91.0, 0.0).is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns `true` if both components are finite and in range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to another coordinate in kilometres.
    pub fn distance_km_to(&self, other: &Coordinate) -> f64 {
        geodesic_km(*self, *other)
    }
}

/// A depot or delivery destination.
///
/// Index 0 is the depot by convention; destinations are numbered `1..N`
/// in request order. Locations are immutable once built.
///
/// # Examples
///
/// ```
/// use fleetflow::models::Location;
///
/// let depot = Location::depot(16.5744, 80.6556).with_label("Amaravati");
/// assert_eq!(depot.index(), 0);
/// assert_eq!(depot.label(), Some("Amaravati"));
///
/// let stop = Location::new(1, 16.5062, 80.6480).with_elevation(23.0);
/// assert_eq!(stop.elevation(), Some(23.0));
/// assert!(depot.distance_km_to(&stop) > 7.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    index: usize,
    lat: f64,
    lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    elevation: Option<f64>,
}

impl Location {
    /// Creates a location with the given index.
    pub fn new(index: usize, lat: f64, lon: f64) -> Self {
        Self {
            index,
            lat,
            lon,
            label: None,
            elevation: None,
        }
    }

    /// Creates a depot (index 0).
    pub fn depot(lat: f64, lon: f64) -> Self {
        Self::new(0, lat, lon)
    }

    /// Sets a human-readable label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the elevation in metres.
    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    /// Returns a copy renumbered to `index`.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Location index (0 = depot).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Coordinates of this location.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    /// Label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Elevation in metres, if known.
    pub fn elevation(&self) -> Option<f64> {
        self.elevation
    }

    /// Absolute elevation difference in metres; unknown elevations count as 0.
    pub fn elevation_change_to(&self, other: &Location) -> f64 {
        (self.elevation.unwrap_or(0.0) - other.elevation.unwrap_or(0.0)).abs()
    }

    /// Great-circle distance to another location in kilometres.
    pub fn distance_km_to(&self, other: &Location) -> f64 {
        geodesic_km(self.coordinate(), other.coordinate())
    }

    /// Rejects out-of-range or non-finite coordinates.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.coordinate().is_valid() {
            Ok(())
        } else {
            Err(InputError::InvalidCoordinates {
                index: self.index,
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(90.1, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_location_depot() {
        let d = Location::depot(1.0, 2.0);
        assert_eq!(d.index(), 0);
        assert_eq!(d.lat(), 1.0);
        assert_eq!(d.lon(), 2.0);
        assert!(d.label().is_none());
        assert!(d.elevation().is_none());
    }

    #[test]
    fn test_location_validate() {
        assert!(Location::new(3, 10.0, 20.0).validate().is_ok());
        let err = Location::new(3, 100.0, 20.0).validate().unwrap_err();
        assert_eq!(
            err,
            InputError::InvalidCoordinates {
                index: 3,
                lat: 100.0,
                lon: 20.0
            }
        );
    }

    #[test]
    fn test_elevation_change() {
        let a = Location::new(1, 0.0, 0.0).with_elevation(100.0);
        let b = Location::new(2, 0.0, 0.0).with_elevation(40.0);
        let c = Location::new(3, 0.0, 0.0);
        assert_eq!(a.elevation_change_to(&b), 60.0);
        assert_eq!(b.elevation_change_to(&a), 60.0);
        assert_eq!(a.elevation_change_to(&c), 100.0);
    }

    #[test]
    fn test_location_distance_symmetric() {
        let a = Location::new(0, 16.5744, 80.6556);
        let b = Location::new(1, 17.6868, 83.2185);
        assert!((a.distance_km_to(&b) - b.distance_km_to(&a)).abs() < 1e-9);
    }

    #[test]
    fn test_location_json_defaults_index() {
        let loc: Location = serde_json::from_str(r#"{"lat": 1.5, "lon": 2.5}"#).unwrap();
        assert_eq!(loc.index(), 0);
        assert_eq!(loc.coordinate(), Coordinate::new(1.5, 2.5));
        let json = serde_json::to_string(&loc.with_label("x")).unwrap();
        assert!(json.contains("\"label\":\"x\""));
        assert!(!json.contains("elevation"));
    }
}
