//! The main entry point: resolve zip codes, pick nearby QCLCD stations and
//! turn their observations into gap-filled weather tables.

use crate::archive::cache::ArchiveCache;
use crate::config::WeatherConfig;
use crate::error::WeatherError;
use crate::geo::geo_index::GeoIndex;
use crate::stacking::stacked_table::{ConstantValue, StackedTable};
use crate::stacking::stacker::{combine, combine_summary, stack, StationStack, SummaryField};
use crate::stacking::error::StackingError;
use crate::stations::catalog::{locate, rank_stations, StationCatalog, StationSelection};
use crate::types::frequency::Frequency;
use crate::types::location::LatLon;
use crate::types::month::{Month, MonthSchedule};
use crate::types::observation::ObservationTable;
use crate::types::station::RankedStation;
use crate::utils::ensure_dir_exists;
use crate::weather_data::observation_loader::{ObservationLoader, ObservationQuery, RowFilter};
use bon::bon;
use chrono::{NaiveDate, NaiveTime};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Stations kept per zip code when neither a limit nor a distance is given.
pub const DEFAULT_STATION_LIMIT: usize = 3;

/// Name of the constant column holding the zip code of a combined table.
pub const ZIP_COLUMN: &str = "zip5";

/// The client for resolving zip codes to weather data.
///
/// A `ZipWeather` owns the archive cache, the station catalog and the
/// observation loader, and lazily builds (or loads) its [`GeoIndex`] the first
/// time a zip code has to be resolved. Concurrent first uses share a single
/// build.
///
/// Create one with [`ZipWeather::new()`] for the default data directory,
/// [`ZipWeather::with_data_dir()`] for a custom one, or
/// [`ZipWeather::with_config()`] for full control.
///
/// # Examples
///
/// ```no_run
/// # use qclcd_weather::{ZipWeather, WeatherError, Month};
/// # async fn run() -> Result<(), WeatherError> {
/// let client = ZipWeather::new().await?;
/// let march = Month::new(2013, 3).unwrap();
///
/// for station in client.stations().zip(12601).month(march).call().await? {
///     println!("{}", station.summary());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ZipWeather {
    config: WeatherConfig,
    geo: OnceCell<Arc<GeoIndex>>,
    catalog: StationCatalog,
    loader: ObservationLoader,
}

#[bon]
impl ZipWeather {
    /// Creates a client from a full [`WeatherConfig`].
    ///
    /// The data directory is created if it does not exist yet. Nothing is
    /// downloaded or parsed until the first query.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::CacheDirCreation`] if the data directory cannot be
    /// created, or [`WeatherError::Archive`] if the HTTP client cannot be built
    /// or `finalization_day` is outside `1..=28`.
    pub async fn with_config(config: WeatherConfig) -> Result<Self, WeatherError> {
        ensure_dir_exists(&config.data_dir)
            .await
            .map_err(|e| WeatherError::CacheDirCreation(config.data_dir.clone(), e))?;
        let archives = Arc::new(ArchiveCache::new(
            &config.data_dir,
            &config.archive_base_url,
            config.finalization_day,
            config.fetch_timeout,
        )?);
        Ok(Self {
            geo: OnceCell::new(),
            catalog: StationCatalog::new(Arc::clone(&archives)),
            loader: ObservationLoader::new(archives),
            config,
        })
    }

    /// Creates a client with default settings rooted at `data_dir`.
    ///
    /// The zip code sources are expected inside `data_dir`; archives are
    /// cached there as well.
    pub async fn with_data_dir(data_dir: PathBuf) -> Result<Self, WeatherError> {
        Self::with_config(WeatherConfig::in_dir(data_dir)).await
    }

    /// Creates a client using `qclcd_weather_cache` in the user's cache
    /// directory (e.g. `~/.cache/qclcd_weather_cache` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::CacheDirResolution`] if there is no user cache
    /// directory, and the errors of [`ZipWeather::with_config()`].
    pub async fn new() -> Result<Self, WeatherError> {
        let config = WeatherConfig::default_location().map_err(WeatherError::CacheDirResolution)?;
        Self::with_config(config).await
    }

    /// Uses `index` instead of building one from the configured sources.
    pub fn with_geo_index(mut self, index: GeoIndex) -> Self {
        self.geo = OnceCell::new_with(Some(Arc::new(index)));
        self
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    /// The zip code index, built or loaded on first use.
    pub async fn geo_index(&self) -> Result<Arc<GeoIndex>, WeatherError> {
        let index = self
            .geo
            .get_or_try_init(|| async {
                GeoIndex::load(self.config.zip_sources(), self.config.snapshot_path())
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(index))
    }

    /// Coordinates of a zip code.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::GeoIndex`] with
    /// [`GeoIndexError::UnknownZip`](crate::GeoIndexError::UnknownZip) when no
    /// source knows the zip code, or when building the index fails.
    pub async fn resolve(&self, zip: u32) -> Result<LatLon, WeatherError> {
        Ok(self.geo_index().await?.resolve(zip)?)
    }

    /// Ranks the stations of `month` by distance from a zip code and keeps the
    /// closest ones.
    ///
    /// # Arguments
    ///
    /// * `.zip(u32)`: **Required.** The five digit zip code.
    /// * `.month(Month)`: **Required.** Station lists differ per month.
    /// * `.station_limit(usize)`: Optional. Keep this many closest stations.
    ///   `0` switches to distance mode. Defaults to `3` when no distance is given.
    /// * `.preferred_distance_km(f64)`: Optional. With a limit of `0` (or no
    ///   limit), keep every station within this distance, or the single
    ///   closest one when none is that close.
    ///
    /// # Errors
    ///
    /// * [`StationCatalogError::UnknownLocation`](crate::StationCatalogError::UnknownLocation)
    ///   for unknown zip codes.
    /// * [`StationCatalogError::InvalidSelection`](crate::StationCatalogError::InvalidSelection)
    ///   for a limit of `0` without a usable distance.
    /// * Archive errors when the month cannot be fetched or read.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use qclcd_weather::{ZipWeather, WeatherError, Month};
    /// # async fn run() -> Result<(), WeatherError> {
    /// let client = ZipWeather::new().await?;
    /// let march = Month::new(2013, 3).unwrap();
    ///
    /// let within_40_km = client
    ///     .stations()
    ///     .zip(12601)
    ///     .month(march)
    ///     .station_limit(0)
    ///     .preferred_distance_km(40.0)
    ///     .call()
    ///     .await?;
    /// assert!(!within_40_km.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn stations(
        &self,
        zip: u32,
        month: Month,
        station_limit: Option<usize>,
        preferred_distance_km: Option<f64>,
    ) -> Result<Vec<RankedStation>, WeatherError> {
        let selection = selection(station_limit, preferred_distance_km)?;
        let geo = self.geo_index().await?;
        Ok(self.catalog.stations(&geo, zip, month, selection).await?)
    }

    /// Loads one month of observations for the stations selected around each
    /// of `zips`.
    ///
    /// The month's station list is read once and ranked separately for every
    /// zip code, then the observation file is read once for the union of all
    /// selected stations.
    ///
    /// # Arguments
    ///
    /// * `.zips(&[u32])`: **Required.** Zip codes to select stations for.
    /// * `.month(Month)`: **Required.**
    /// * `.frequency(Frequency)`: Optional. Defaults to [`Frequency::Daily`].
    /// * `.station_limit(usize)` / `.preferred_distance_km(f64)`: Optional, as
    ///   for [`ZipWeather::stations()`].
    /// * `.fields(Vec<String>)`: Optional. Numeric columns to load; defaults to
    ///   [`Frequency::default_fields()`].
    ///
    /// # Errors
    ///
    /// Fails for an unknown zip code, an invalid selection, or a month whose
    /// archive cannot be fetched or read.
    #[builder]
    pub async fn weather_month(
        &self,
        zips: &[u32],
        month: Month,
        frequency: Option<Frequency>,
        station_limit: Option<usize>,
        preferred_distance_km: Option<f64>,
        fields: Option<Vec<String>>,
    ) -> Result<MonthWeather, WeatherError> {
        let selection = selection(station_limit, preferred_distance_km)?;
        self.load_month(
            zips,
            month,
            frequency.unwrap_or(Frequency::Daily),
            selection,
            fields,
        )
        .await
    }

    /// One combined table for one zip code over a date range.
    ///
    /// Every month between `start` and `end` is combined with nearest-station
    /// fallback, using that month's station ranking. The months are
    /// concatenated and trimmed to `start..=end`.
    ///
    /// # Arguments
    ///
    /// * `.zip(u32)`: **Required.**
    /// * `.start(NaiveDate)` / `.end(NaiveDate)`: **Required.** Inclusive bounds.
    /// * `.frequency`, `.station_limit`, `.preferred_distance_km`, `.fields`:
    ///   Optional, as for [`ZipWeather::weather_month()`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use qclcd_weather::{ZipWeather, WeatherError};
    /// # use chrono::NaiveDate;
    /// # async fn run() -> Result<(), WeatherError> {
    /// let client = ZipWeather::new().await?;
    /// let table = client
    ///     .weather_range()
    ///     .zip(12601)
    ///     .start(NaiveDate::from_ymd_opt(2013, 2, 20).unwrap())
    ///     .end(NaiveDate::from_ymd_opt(2013, 3, 10).unwrap())
    ///     .station_limit(5)
    ///     .call()
    ///     .await?;
    /// println!("{} days, {} without Tavg", table.len(), table.missing_count("Tavg"));
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn weather_range(
        &self,
        zip: u32,
        start: NaiveDate,
        end: NaiveDate,
        frequency: Option<Frequency>,
        station_limit: Option<usize>,
        preferred_distance_km: Option<f64>,
        fields: Option<Vec<String>>,
    ) -> Result<StackedTable, WeatherError> {
        let frequency = frequency.unwrap_or(Frequency::Daily);
        let selection = selection(station_limit, preferred_distance_km)?;

        let mut tables = Vec::new();
        for month in Month::range(Month::of(start), Month::of(end)) {
            let weather = self
                .load_month(&[zip], month, frequency, selection, fields.clone())
                .await?;
            tables.push(weather.combine_for(zip)?);
        }
        if tables.is_empty() {
            let fields = query_fields(frequency, fields);
            return Ok(StackedTable::empty(fields)?.with_constant(ZIP_COLUMN, zip));
        }

        let first = start.and_time(NaiveTime::MIN);
        let last = end.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN));
        Ok(StackedTable::concat(tables)?.trim(first, last)?)
    }

    /// Runs [`ZipWeather::weather_month()`] for every month of a schedule.
    ///
    /// Months are processed in order and independently: a month that fails
    /// (for example because its archive cannot be fetched) is reported in its
    /// own slot and does not stop the others. Months without active zip codes
    /// are skipped.
    #[builder]
    pub async fn weather_schedule(
        &self,
        schedule: &MonthSchedule,
        frequency: Option<Frequency>,
        station_limit: Option<usize>,
        preferred_distance_km: Option<f64>,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<(Month, Result<MonthWeather, WeatherError>)>, WeatherError> {
        let frequency = frequency.unwrap_or(Frequency::Daily);
        let selection = selection(station_limit, preferred_distance_km)?;

        let mut results = Vec::with_capacity(schedule.len());
        for (month, zips) in schedule.iter() {
            if zips.is_empty() {
                debug!("No zip codes active in {}, skipping", month);
                continue;
            }
            let result = self
                .load_month(zips, month, frequency, selection, fields.clone())
                .await;
            if let Err(e) = &result {
                warn!("Failed to load weather for {}: {}", month, e);
            }
            results.push((month, result));
        }
        Ok(results)
    }

    async fn load_month(
        &self,
        zips: &[u32],
        month: Month,
        frequency: Frequency,
        selection: StationSelection,
        fields: Option<Vec<String>>,
    ) -> Result<MonthWeather, WeatherError> {
        let geo = self.geo_index().await?;
        let origins = zips
            .iter()
            .map(|&zip| locate(&geo, zip).map(|origin| (zip, origin)))
            .collect::<Result<Vec<_>, _>>()?;

        let stations = self.catalog.load(month).await?;
        let stations_by_zip: Vec<(u32, Vec<RankedStation>)> = origins
            .into_iter()
            .map(|(zip, origin)| (zip, selection.apply(rank_stations(origin, stations.clone()))))
            .collect();

        let wbans: BTreeSet<&str> = stations_by_zip
            .iter()
            .flat_map(|(_, ranked)| ranked.iter().map(RankedStation::wban))
            .collect();
        let query = ObservationQuery::builder()
            .frequency(frequency)
            .maybe_fields(fields)
            .filter(RowFilter::stations(wbans))
            .build();
        let observations = self.loader.load(month, &query).await?;
        debug!(
            "{} {} rows for {} zip codes in {}",
            observations.len(),
            frequency,
            zips.len(),
            month
        );

        Ok(MonthWeather {
            month,
            frequency,
            stations_by_zip,
            observations,
        })
    }
}

fn selection(
    station_limit: Option<usize>,
    preferred_distance_km: Option<f64>,
) -> Result<StationSelection, WeatherError> {
    let limit = match (station_limit, preferred_distance_km) {
        (Some(limit), _) => limit,
        (None, Some(_)) => 0,
        (None, None) => DEFAULT_STATION_LIMIT,
    };
    Ok(StationSelection::from_params(limit, preferred_distance_km)?)
}

fn query_fields(frequency: Frequency, fields: Option<Vec<String>>) -> Vec<String> {
    ObservationQuery::builder()
        .frequency(frequency)
        .maybe_fields(fields)
        .build()
        .field_names()
}

/// One month of observations with the station ranking of each zip code.
#[derive(Debug, Clone)]
pub struct MonthWeather {
    pub month: Month,
    pub frequency: Frequency,
    stations_by_zip: Vec<(u32, Vec<RankedStation>)>,
    observations: ObservationTable,
}

impl MonthWeather {
    pub fn zips(&self) -> impl Iterator<Item = u32> + '_ {
        self.stations_by_zip.iter().map(|(zip, _)| *zip)
    }

    /// Selected stations of `zip`, closest first. Empty for zips not in this month.
    pub fn stations_for(&self, zip: u32) -> &[RankedStation] {
        self.stations_by_zip
            .iter()
            .find(|(z, _)| *z == zip)
            .map(|(_, ranked)| ranked.as_slice())
            .unwrap_or_default()
    }

    /// All loaded rows, for the union of every zip's stations.
    pub fn observations(&self) -> &ObservationTable {
        &self.observations
    }

    /// The rows reported by the stations of `zip`, in file order.
    pub fn observations_for(&self, zip: u32) -> ObservationTable {
        let wbans: BTreeSet<&str> = self.stations_for(zip).iter().map(RankedStation::wban).collect();
        let mut table = ObservationTable::new(self.observations.fields().to_vec());
        for row in self.observations.rows() {
            if wbans.contains(row.station.as_str()) {
                table.push(row.clone());
            }
        }
        table
    }

    /// One series per station.
    pub fn stack(&self) -> StationStack {
        stack(&self.observations)
    }

    /// Nearest-station fallback over the stations of `zip`, in their ranking
    /// order, with the zip code as a constant column.
    pub fn combine_for(&self, zip: u32) -> Result<StackedTable, StackingError> {
        let order: Vec<&str> = self.stations_for(zip).iter().map(RankedStation::wban).collect();
        combine(
            &self.stack(),
            &order,
            vec![(ZIP_COLUMN.to_string(), ConstantValue::from(zip))],
        )
    }

    /// Summary means over every station of `zip`.
    pub fn summarize(
        &self,
        zip: u32,
        summaries: &[SummaryField],
        remove_blanks: bool,
    ) -> Result<StackedTable, StackingError> {
        let stations: Vec<&str> = self.stations_for(zip).iter().map(RankedStation::wban).collect();
        let table = combine_summary(
            &self.observations,
            &stations,
            summaries,
            self.frequency,
            remove_blanks,
        )?;
        Ok(table.with_constant(ZIP_COLUMN, zip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::error::ArchiveError;
    use crate::geo::error::GeoIndexError;
    use crate::stations::error::StationCatalogError;
    use crate::test_fixtures::{write_month_archive, write_zip_sources};
    use chrono::NaiveDateTime;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn march() -> Month {
        Month::new(2013, 3).unwrap()
    }

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2013, 3, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn wbans(ranked: &[RankedStation]) -> Vec<&str> {
        ranked.iter().map(RankedStation::wban).collect()
    }

    async fn offline_client(dir: &Path) -> ZipWeather {
        write_zip_sources(dir);
        write_month_archive(dir, march());
        let config = WeatherConfig::builder()
            .data_dir(dir)
            .archive_base_url("http://127.0.0.1:9/")
            .fetch_timeout(Duration::from_secs(5))
            .build();
        ZipWeather::with_config(config).await.unwrap()
    }

    #[tokio::test]
    async fn resolves_zip_codes_and_writes_snapshot() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(dir.path()).await;

        assert_eq!(client.resolve(12601).await.unwrap(), LatLon(41.7004, -73.921));
        assert!(dir.path().join("zip_index.bin").exists());

        let err = client.resolve(99999).await.unwrap_err();
        assert!(matches!(err, WeatherError::GeoIndex(GeoIndexError::UnknownZip(99999))));
        assert!(err.is_unknown_location());
    }

    #[tokio::test]
    async fn client_rejects_impossible_finalization_day() {
        let dir = TempDir::new().unwrap();
        let config = WeatherConfig::builder()
            .data_dir(dir.path())
            .finalization_day(31)
            .build();
        let err = ZipWeather::with_config(config).await.err().unwrap();
        assert!(matches!(
            err,
            WeatherError::Archive(ArchiveError::InvalidFinalizationDay(31))
        ));
    }

    #[tokio::test]
    async fn injected_index_is_used_as_is() {
        let dir = TempDir::new().unwrap();
        let index = GeoIndex::from_ranked_entries(vec![vec![(12345, LatLon(1.0, 2.0))]]);
        let client = ZipWeather::with_data_dir(dir.path().to_path_buf())
            .await
            .unwrap()
            .with_geo_index(index);

        assert_eq!(client.resolve(12345).await.unwrap(), LatLon(1.0, 2.0));
        assert!(client.resolve(12601).await.is_err());
        assert!(!dir.path().join("zip_index.bin").exists());
    }

    #[tokio::test]
    async fn station_queries_in_both_modes() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(dir.path()).await;

        let default = client.stations().zip(12601).month(march()).call().await.unwrap();
        assert_eq!(wbans(&default), ["14757", "04789", "94789"]);

        let within_40 = client
            .stations()
            .zip(12601)
            .month(march())
            .preferred_distance_km(40.0)
            .call()
            .await
            .unwrap();
        assert_eq!(wbans(&within_40), ["14757", "04789"]);
        assert!(within_40.iter().all(|s| s.distance_km <= 40.0));

        let err = client
            .stations()
            .zip(12601)
            .month(march())
            .station_limit(0)
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WeatherError::StationCatalog(StationCatalogError::InvalidSelection(_))
        ));

        let err = client.stations().zip(99999).month(march()).call().await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::StationCatalog(StationCatalogError::UnknownLocation(99999))
        ));
    }

    #[tokio::test]
    async fn month_weather_keeps_zips_apart() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(dir.path()).await;

        let weather = client
            .weather_month()
            .zips(&[12601, 94611])
            .month(march())
            .preferred_distance_km(40.0)
            .fields(vec!["Tavg".to_string()])
            .call()
            .await
            .unwrap();

        assert_eq!(weather.zips().collect::<Vec<_>>(), [12601, 94611]);
        assert_eq!(wbans(weather.stations_for(94611)), ["23230"]);
        assert_eq!(weather.observations().len(), 6);
        assert_eq!(weather.observations_for(12601).len(), 5);
        assert_eq!(weather.observations_for(94611).len(), 1);
        assert!(weather.stations_for(10001).is_empty());

        let poughkeepsie = weather.combine_for(12601).unwrap();
        assert_eq!(poughkeepsie.timestamps(), [day(1), day(2), day(3)]);
        assert_eq!(
            poughkeepsie.column("Tavg").unwrap(),
            vec![Some(38.0), Some(37.0), Some(40.0)]
        );
        assert_eq!(poughkeepsie.constants()[0].1, ConstantValue::Int(12601));

        let oakland = weather.combine_for(94611).unwrap();
        assert_eq!(oakland.column("Tavg").unwrap(), vec![Some(55.0)]);
    }

    #[tokio::test]
    async fn more_stations_fill_hourly_gaps() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(dir.path()).await;
        let temperature = [SummaryField::new("temperature", ["DryBulbFarenheit"])];

        let mut missing = Vec::new();
        for limit in [1, 2] {
            let weather = client
                .weather_month()
                .zips(&[12601])
                .month(march())
                .frequency(Frequency::Hourly)
                .station_limit(limit)
                .fields(vec!["DryBulbFarenheit".to_string()])
                .call()
                .await
                .unwrap();
            let summary = weather.summarize(12601, &temperature, false).unwrap();
            missing.push(summary.missing_count("temperature"));
        }
        assert_eq!(missing, [1, 0]);
    }

    #[tokio::test]
    async fn range_is_trimmed_to_requested_days() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(dir.path()).await;

        let table = client
            .weather_range()
            .zip(12601)
            .start(NaiveDate::from_ymd_opt(2013, 3, 2).unwrap())
            .end(NaiveDate::from_ymd_opt(2013, 3, 3).unwrap())
            .fields(vec!["Tavg".to_string(), "PrecipTotal".to_string()])
            .call()
            .await
            .unwrap();

        assert_eq!(table.timestamps(), [day(2), day(3)]);
        assert_eq!(table.value(0, "Tavg"), Some(37.0));
        assert_eq!(table.constants()[0].0, ZIP_COLUMN);
    }

    #[tokio::test]
    async fn failing_month_does_not_stop_the_schedule() {
        let dir = TempDir::new().unwrap();
        let client = offline_client(dir.path()).await;
        let schedule = MonthSchedule::from_ranges(&[(
            12601,
            NaiveDate::from_ymd_opt(2013, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2013, 4, 30).unwrap(),
        )]);

        let results = client
            .weather_schedule()
            .schedule(&schedule)
            .fields(vec!["Tavg".to_string()])
            .call()
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, march());
        assert!(results[0].1.is_ok());
        let april = results[1].1.as_ref().unwrap_err();
        assert!(april.is_retrieval_error(), "{april:?}");
    }

    // The scenarios below download real QCLCD archives.

    async fn network_client() -> (TempDir, ZipWeather) {
        let dir = TempDir::new().unwrap();
        let client = ZipWeather::with_data_dir(dir.path().to_path_buf())
            .await
            .unwrap();
        (dir, client)
    }

    #[tokio::test]
    #[ignore = "downloads QCLCD archives and needs the zip sources in the data dir"]
    async fn poughkeepsie_march_2013_five_stations() {
        let (_dir, client) = network_client().await;
        for (frequency, rows) in [(Frequency::Daily, 124), (Frequency::Hourly, 12427)] {
            let weather = client
                .weather_month()
                .zips(&[12601])
                .month(march())
                .frequency(frequency)
                .station_limit(5)
                .call()
                .await
                .unwrap();
            assert_eq!(weather.stations_for(12601).len(), 5);
            assert_eq!(weather.observations_for(12601).len(), rows);
        }
    }

    #[tokio::test]
    #[ignore = "downloads QCLCD archives and needs the zip sources in the data dir"]
    async fn distance_mode_march_2013() {
        let (_dir, client) = network_client().await;
        let weather = client
            .weather_month()
            .zips(&[12601, 94611])
            .month(march())
            .station_limit(0)
            .preferred_distance_km(40.0)
            .call()
            .await
            .unwrap();
        let poughkeepsie = weather.observations_for(12601).len();
        let oakland = weather.observations_for(94611).len();
        assert_eq!(poughkeepsie, 93);
        assert_eq!(poughkeepsie + oakland, 279);
    }

    #[tokio::test]
    #[ignore = "downloads QCLCD archives and needs the zip sources in the data dir"]
    async fn palo_alto_hourly_fallback_fills_gaps() {
        let (_dir, client) = network_client().await;
        let temperature = [SummaryField::new("temperature", ["DryBulbFarenheit"])];
        let mut missing = Vec::new();
        for limit in [1, 3] {
            let weather = client
                .weather_month()
                .zips(&[94301])
                .month(march())
                .frequency(Frequency::Hourly)
                .station_limit(limit)
                .call()
                .await
                .unwrap();
            let summary = weather.summarize(94301, &temperature, false).unwrap();
            missing.push(summary.missing_count("temperature"));
        }
        assert!(missing[0] > 0);
        assert_eq!(missing[1], 0);
    }
}
