//! Observation granularities available in a QCLCD archive.

use std::fmt;

/// The granularity of observation rows to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    /// One row per observation report, several per hour at some stations.
    Hourly,
    /// One summary row per station and day.
    Daily,
}

impl Frequency {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
        }
    }

    /// Header names of the columns that together form a row's timestamp.
    pub(crate) fn timestamp_columns(&self) -> &'static [&'static str] {
        match self {
            Frequency::Hourly => &["Date", "Time"],
            Frequency::Daily => &["YearMonthDay"],
        }
    }

    /// Numeric fields loaded when a query does not name its own.
    pub fn default_fields(&self) -> &'static [&'static str] {
        match self {
            Frequency::Hourly => &[
                "DryBulbFarenheit",
                "DewPointFarenheit",
                "RelativeHumidity",
                "WindSpeed",
                "StationPressure",
                "HourlyPrecip",
            ],
            Frequency::Daily => &[
                "Tmax",
                "Tmin",
                "Tavg",
                "DewPoint",
                "WetBulb",
                "PrecipTotal",
                "StnPressure",
                "AvgSpeed",
            ],
        }
    }
}

/// ```
/// use qclcd_weather::Frequency;
///
/// assert_eq!(Frequency::Hourly.to_string(), "hourly");
/// assert_eq!(format!("{}", Frequency::Daily), "daily");
/// ```
impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}
