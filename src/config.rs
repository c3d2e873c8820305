//! Client configuration.

use crate::geo::zip_source::ZipSource;
use crate::utils::get_cache_dir;
use bon::Builder;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://www.ncdc.noaa.gov/orders/qclcd/";
pub const GEO_SNAPSHOT_FILE: &str = "zip_index.bin";

/// Where archives are cached, where they come from and how the zip index is built.
///
/// ```
/// use qclcd_weather::WeatherConfig;
/// use std::time::Duration;
///
/// let config = WeatherConfig::builder()
///     .data_dir("/tmp/qclcd")
///     .fetch_timeout(Duration::from_secs(60))
///     .build();
/// assert_eq!(config.finalization_day, 7);
/// assert_eq!(config.zip_sources().len(), 3);
/// assert!(config.snapshot_path().unwrap().ends_with("zip_index.bin"));
/// ```
#[derive(Debug, Clone, Builder)]
pub struct WeatherConfig {
    /// Holds the monthly archives, the zip sources and the index snapshot.
    #[builder(into)]
    pub data_dir: PathBuf,
    /// Prefix of every archive URL, ending in `/`.
    #[builder(into, default = DEFAULT_ARCHIVE_BASE_URL.to_string())]
    pub archive_base_url: String,
    /// Zip code sources, highest precedence first. Defaults to the three
    /// standard files inside `data_dir`.
    pub zip_sources: Option<Vec<ZipSource>>,
    #[builder(default = Duration::from_secs(300))]
    pub fetch_timeout: Duration,
    /// Day of the following month by which a month's archive is final, in
    /// `1..=28`. Other values are rejected when the client is built.
    #[builder(default = 7)]
    pub finalization_day: u32,
    /// Persist the built zip index and reuse it while no source changes.
    #[builder(default = true)]
    pub geo_snapshot: bool,
}

impl WeatherConfig {
    /// Default settings rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self::builder().data_dir(data_dir).build()
    }

    /// Default settings in the user's cache directory.
    pub fn default_location() -> io::Result<Self> {
        Ok(Self::in_dir(get_cache_dir()?))
    }

    pub fn zip_sources(&self) -> Vec<ZipSource> {
        self.zip_sources
            .clone()
            .unwrap_or_else(|| ZipSource::defaults_in(&self.data_dir))
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.geo_snapshot
            .then(|| self.data_dir.join(GEO_SNAPSHOT_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn defaults() {
        let config = WeatherConfig::in_dir("/data");
        assert_eq!(config.archive_base_url, DEFAULT_ARCHIVE_BASE_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(300));
        assert_eq!(config.finalization_day, 7);
        assert_eq!(
            config.snapshot_path(),
            Some(PathBuf::from("/data/zip_index.bin"))
        );
        assert_eq!(config.zip_sources(), ZipSource::defaults_in(Path::new("/data")));
    }

    #[test]
    fn explicit_sources_and_no_snapshot() {
        let config = WeatherConfig::builder()
            .data_dir("/data")
            .zip_sources(vec![ZipSource::primary_table("/elsewhere/zips.csv")])
            .geo_snapshot(false)
            .build();
        assert_eq!(config.zip_sources().len(), 1);
        assert_eq!(config.snapshot_path(), None);
    }
}
