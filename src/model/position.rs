//! Positions on the water and great-circle navigation between them.

use std::fmt;

use geo::{Bearing, Distance, Haversine, Point};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

const METERS_PER_NM: f64 = 1852.0;

/// A latitude/longitude pair in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle (haversine) distance to `other` in nautical miles.
    pub fn distance_nm(&self, other: &Position) -> f64 {
        Haversine.distance(self.point(), other.point()) / METERS_PER_NM
    }

    /// Initial great-circle bearing to `other`, in degrees true `[0, 360)`.
    pub fn bearing_to(&self, other: &Position) -> f64 {
        normalize_degrees(Haversine.bearing(self.point(), other.point()))
    }

    fn point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(
            f,
            "{:.6}°{ns}, {:.6}°{ew}",
            self.lat.abs(),
            self.lon.abs()
        )
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// The vessel's own navigation state, as last reported by the chartplotter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationFix {
    pub position: Position,

    /// Heading in degrees true.
    pub heading_deg: f64,

    /// Speed over ground in knots.
    pub speed_kn: f64,

    pub fixed_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude_is_sixty_miles() {
        let a = Position::new(40.0, 29.0);
        let b = Position::new(41.0, 29.0);
        let d = a.distance_nm(&b);
        assert!((d - 60.04).abs() < 0.1, "got {d}");
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = Position::new(40.8515, 29.1202);
        assert!(p.distance_nm(&p).abs() < 1e-9);
    }

    #[test]
    fn cardinal_bearings() {
        let origin = Position::new(0.0, 0.0);
        assert!((origin.bearing_to(&Position::new(1.0, 0.0)) - 0.0).abs() < 1e-6);
        assert!((origin.bearing_to(&Position::new(0.0, 1.0)) - 90.0).abs() < 1e-6);
        assert!((origin.bearing_to(&Position::new(-1.0, 0.0)) - 180.0).abs() < 1e-6);
        assert!((origin.bearing_to(&Position::new(0.0, -1.0)) - 270.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_wraps_negative_angles() {
        assert!((normalize_degrees(-90.0) - 270.0).abs() < 1e-9);
        assert!((normalize_degrees(450.0) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn display_uses_hemisphere_letters() {
        let p = Position::new(-33.5, -70.25);
        assert_eq!(p.to_string(), "33.500000°S, 70.250000°W");
    }
}
