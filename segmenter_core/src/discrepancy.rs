//! Great-circle geometry used to score how far an observed position strayed
//! from where a vessel was expected to be.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Timestamp};

/// Mean Earth radius, nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// A bare point on the sphere. Degrees in, degrees stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A positional reading pulled off a message: where a vessel was, and how
/// fast/which way it said it was moving at the time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionalFix {
    pub timestamp: Timestamp,
    pub lat: f64,
    pub lon: f64,
    pub speed: Option<f64>,
    pub course: Option<f64>,
}

impl PositionalFix {
    pub fn point(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }

    /// Extracts a fix from a message, or `None` if the message carries no
    /// timestamp or no full position.
    pub fn from_message(msg: &Message) -> Option<Self> {
        match (msg.timestamp, msg.lat, msg.lon) {
            (Some(timestamp), Some(lat), Some(lon)) => Some(Self {
                timestamp,
                lat,
                lon,
                speed: msg.speed,
                course: msg.course,
            }),
            _ => None,
        }
    }
}

/// Elapsed time between two instants, in hours. Negative if `b` precedes `a`.
pub fn hours(a: Timestamp, b: Timestamp) -> f64 {
    (b - a) as f64 / 3600.0
}

/// Haversine great-circle distance, nautical miles.
pub fn distance_nm(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().clamp(0.0, 1.0).asin();
    EARTH_RADIUS_NM * c
}

/// Initial great-circle bearing from `a` to `b`, degrees in `[0, 360)`.
pub fn bearing_deg(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Dead-reckons a point forward along a great circle: start at `p`, hold
/// `course_deg`/`speed_kn` constant for `hours`.
pub fn project(p: LatLon, course_deg: f64, speed_kn: f64, hours: f64) -> LatLon {
    let distance = speed_kn * hours;
    let angular = distance / EARTH_RADIUS_NM;
    let bearing = course_deg.to_radians();
    let lat1 = p.lat.to_radians();
    let lon1 = p.lon.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    LatLon::new(lat2.to_degrees(), ((lon2.to_degrees() + 540.0) % 360.0) - 180.0)
}

/// Distance between where `prev` predicted the vessel would be and where
/// `obs` actually found it. Falls back to plain distance when `prev` carries
/// no usable course/speed to dead-reckon from.
pub fn discrepancy_nm(prev: &PositionalFix, obs: &PositionalFix) -> f64 {
    let dt = hours(prev.timestamp, obs.timestamp);
    match (prev.course, prev.speed) {
        (Some(course), Some(speed)) if course.is_finite() && speed.is_finite() => {
            let predicted = project(prev.point(), course, speed, dt);
            distance_nm(predicted, obs.point())
        }
        _ => distance_nm(prev.point(), obs.point()),
    }
}

/// The largest discrepancy tolerated after `dt_hours` have passed: a fixed
/// floor, a term proportional to elapsed time, and a slack term that grows
/// with the square root of elapsed time (forecast uncertainty compounds
/// sub-linearly, not linearly).
pub fn max_allowed_discrepancy_nm(buffer_nm: f64, penalty_speed: f64, dt_hours: f64) -> f64 {
    let dt = dt_hours.max(0.0);
    buffer_nm + penalty_speed * dt + penalty_speed * dt.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_same_point_is_zero() {
        let p = LatLon::new(10.0, -20.0);
        assert!(distance_nm(p, p) < 1e-9);
    }

    #[test]
    fn equator_one_degree_is_about_sixty_nm() {
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(0.0, 1.0);
        let d = distance_nm(a, b);
        assert!((d - 60.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn project_east_for_one_hour_matches_distance() {
        let start = LatLon::new(0.0, 0.0);
        let end = project(start, 90.0, 10.0, 1.0);
        let d = distance_nm(start, end);
        assert!((d - 10.0).abs() < 0.1, "got {d}");
    }

    #[test]
    fn discrepancy_falls_back_without_course_or_speed() {
        let prev = PositionalFix {
            timestamp: 0,
            lat: 0.0,
            lon: 0.0,
            speed: None,
            course: None,
        };
        let obs = PositionalFix {
            timestamp: 3600,
            lat: 1.0,
            lon: 0.0,
            speed: None,
            course: None,
        };
        let d = discrepancy_nm(&prev, &obs);
        assert!((d - distance_nm(prev.point(), obs.point())).abs() < 1e-9);
    }

    #[test]
    fn max_allowed_discrepancy_grows_with_time() {
        let short = max_allowed_discrepancy_nm(1.0, 12.0, 0.1);
        let long = max_allowed_discrepancy_nm(1.0, 12.0, 2.0);
        assert!(long > short);
    }
}
