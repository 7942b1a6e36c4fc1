//! Congestion report for a single route.

use crate::models::{TrafficImpact, TrafficStatus};

/// Delay above which congestion counts as heavy, in minutes.
pub const LIGHT_CONGESTION_LIMIT_MIN: i64 = 10;

/// Compares a realised duration against free-flow driving of the same
/// distance.
///
/// `delay_min` is the rounded difference in minutes; `delay_percent` is that
/// delay relative to the free-flow duration. Returns `None` for a zero
/// distance, where there is nothing to compare.
///
/// # Examples
///
/// ```
/// use fleetflow::evaluation::traffic_impact;
/// use fleetflow::models::TrafficStatus;
///
/// // 60 km at 60 km/h is 60 free-flow minutes; 75 realised minutes
/// let impact = traffic_impact(60.0, 75.0, 60.0).unwrap();
/// assert_eq!(impact.status, TrafficStatus::HeavyCongestion);
/// assert_eq!(impact.delay_min, 15);
/// assert_eq!(impact.delay_percent, 25);
/// ```
pub fn traffic_impact(
    distance_km: f64,
    duration_minutes: f64,
    free_flow_speed_kmh: f64,
) -> Option<TrafficImpact> {
    if !(distance_km > 0.0) || !(free_flow_speed_kmh > 0.0) || !duration_minutes.is_finite() {
        return None;
    }
    let free_flow_minutes = distance_km / free_flow_speed_kmh * 60.0;
    let delay_min = (duration_minutes - free_flow_minutes).round() as i64;
    let delay_percent = (delay_min as f64 / free_flow_minutes * 100.0).round() as i64;

    let status = match delay_min {
        d if d <= 0 => TrafficStatus::NoDelay,
        d if d <= LIGHT_CONGESTION_LIMIT_MIN => TrafficStatus::LightCongestion,
        _ => TrafficStatus::HeavyCongestion,
    };
    Some(TrafficImpact {
        status,
        delay_min,
        delay_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_delay() {
        let impact = traffic_impact(50.0, 50.0, 60.0).unwrap();
        assert_eq!(impact.delay_min, 0);
        assert_eq!(impact.status, TrafficStatus::NoDelay);
        assert_eq!(impact.delay_percent, 0);
    }

    #[test]
    fn test_faster_than_free_flow() {
        let impact = traffic_impact(60.0, 45.0, 60.0).unwrap();
        assert_eq!(impact.delay_min, -15);
        assert_eq!(impact.status, TrafficStatus::NoDelay);
        assert_eq!(impact.delay_percent, -25);
    }

    #[test]
    fn test_light_congestion_boundary() {
        let impact = traffic_impact(60.0, 70.0, 60.0).unwrap();
        assert_eq!(impact.delay_min, 10);
        assert_eq!(impact.status, TrafficStatus::LightCongestion);
        let impact = traffic_impact(60.0, 71.0, 60.0).unwrap();
        assert_eq!(impact.status, TrafficStatus::HeavyCongestion);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(traffic_impact(0.0, 10.0, 60.0).is_none());
        assert!(traffic_impact(10.0, 10.0, 0.0).is_none());
        assert!(traffic_impact(10.0, f64::NAN, 60.0).is_none());
    }
}
