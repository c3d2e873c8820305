//! Geographic coordinates and the great-circle distance between them.

use serde::{Deserialize, Serialize};

/// Spherical Earth radius used for every station distance, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1),
/// both in decimal degrees.
///
/// # Examples
///
/// ```
/// use qclcd_weather::LatLon;
///
/// let poughkeepsie = LatLon(41.70, -73.92);
/// assert_eq!(poughkeepsie.latitude(), 41.70);
/// assert_eq!(poughkeepsie.longitude(), -73.92);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn latitude(self) -> f64 {
        self.0
    }

    pub fn longitude(self) -> f64 {
        self.1
    }

    /// Haversine distance to `other` in kilometres, on a sphere of radius
    /// [`EARTH_RADIUS_KM`]. Always `>= 0`.
    ///
    /// ```
    /// use qclcd_weather::LatLon;
    ///
    /// let a = LatLon(0.0, 0.0);
    /// let b = LatLon(0.0, 1.0);
    /// assert!((a.distance_km(b) - 111.125).abs() < 0.01);
    /// ```
    pub fn distance_km(self, other: LatLon) -> f64 {
        let lat1 = self.0.to_radians();
        let lat2 = other.0.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.1 - self.1).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        // Rounding can push `a` a hair past 1.0 for antipodal points.
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_KM * c
    }
}
