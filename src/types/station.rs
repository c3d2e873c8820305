//! Weather stations as listed in a monthly QCLCD station file, and the
//! distance-ranked form returned by station queries.

use crate::types::location::LatLon;
use serde::{Deserialize, Serialize};

/// A single weather station from one month's station list.
///
/// Stations are not stable across months: the same WBAN may move, appear or
/// vanish from one archive to the next, so a `Station` is only meaningful
/// together with the month it was loaded for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Weather-Bureau-Army-Navy identifier (e.g. "14757").
    pub wban: String,
    /// World Meteorological Organization identifier, if listed.
    pub wmo: Option<String>,
    /// Call sign (often the ICAO airport code), if listed.
    pub call_sign: Option<String>,
    pub name: String,
    /// Two letter state code, if listed.
    pub state: Option<String>,
    pub location: LatLon,
    /// Ground height in feet, if listed.
    pub ground_height: Option<f64>,
}

/// A station together with its great-circle distance from a query location.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedStation {
    pub station: Station,
    /// Distance from the query location in kilometres, always `>= 0`.
    pub distance_km: f64,
}

impl RankedStation {
    pub fn wban(&self) -> &str {
        &self.station.wban
    }

    /// One line summary: WBAN, distance in km and station name.
    ///
    /// ```
    /// use qclcd_weather::{LatLon, RankedStation, Station};
    ///
    /// let ranked = RankedStation {
    ///     station: Station {
    ///         wban: "14757".into(),
    ///         wmo: None,
    ///         call_sign: Some("POU".into()),
    ///         name: "POUGHKEEPSIE".into(),
    ///         state: Some("NY".into()),
    ///         location: LatLon(41.627, -73.884),
    ///         ground_height: None,
    ///     },
    ///     distance_km: 8.75,
    /// };
    /// assert_eq!(ranked.summary(), "14757, 008.75, POUGHKEEPSIE");
    /// ```
    pub fn summary(&self) -> String {
        format!(
            "{}, {:06.2}, {}",
            self.station.wban, self.distance_km, self.station.name
        )
    }
}
