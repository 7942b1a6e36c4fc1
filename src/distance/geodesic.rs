//! Great-circle distance on a spherical earth.

use crate::models::Coordinate;

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates in kilometres.
///
/// Symmetric and zero for identical points.
///
/// # Examples
///
/// ```
/// use fleetflow::distance::geodesic_km;
/// use fleetflow::models::Coordinate;
///
/// let d = geodesic_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0));
/// assert!((d - 111.19).abs() < 0.01);
/// ```
pub fn geodesic_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}
