//! Per-month station lists, ranked by great-circle distance from a location.

use crate::archive::cache::ArchiveCache;
use crate::archive::error::ArchiveError;
use crate::archive::reader::{delimited_reader, field, field_lossy, numeric, with_inner_file, InnerFile};
use crate::geo::geo_index::GeoIndex;
use crate::stations::error::StationCatalogError;
use crate::types::location::LatLon;
use crate::types::month::Month;
use crate::types::station::{RankedStation, Station};
use log::warn;
use ordered_float::OrderedFloat;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

const WBAN_COLUMN: usize = 0;
const WMO_COLUMN: usize = 1;
const CALL_SIGN_COLUMN: usize = 2;
const NAME_COLUMN: usize = 6;
const STATE_COLUMN: usize = 7;
const LATITUDE_COLUMN: usize = 9;
const LONGITUDE_COLUMN: usize = 10;
const GROUND_HEIGHT_COLUMN: usize = 11;

/// How many of the ranked stations a query keeps.
///
/// Both policies truncate the same distance-sorted ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StationSelection {
    /// The `n` closest stations, however far away they are.
    Count(usize),
    /// Every station within the distance (km, inclusive). When none
    /// qualifies, the single closest station is kept instead.
    WithinKm(f64),
}

impl Default for StationSelection {
    fn default() -> Self {
        StationSelection::Count(3)
    }
}

impl StationSelection {
    /// Maps the classic `(n, preferred distance)` pair onto a policy: `n > 0`
    /// selects count mode and ignores the distance, `n == 0` selects
    /// distance mode and then requires a non-negative distance.
    ///
    /// ```
    /// use qclcd_weather::StationSelection;
    ///
    /// assert_eq!(StationSelection::from_params(5, Some(30.0)).unwrap(), StationSelection::Count(5));
    /// assert_eq!(StationSelection::from_params(0, Some(40.0)).unwrap(), StationSelection::WithinKm(40.0));
    /// assert!(StationSelection::from_params(0, None).is_err());
    /// ```
    pub fn from_params(
        n: usize,
        preferred_distance_km: Option<f64>,
    ) -> Result<Self, StationCatalogError> {
        match (n, preferred_distance_km) {
            (n, _) if n > 0 => Ok(StationSelection::Count(n)),
            (_, Some(km)) if km >= 0.0 => Ok(StationSelection::WithinKm(km)),
            (_, Some(km)) => Err(StationCatalogError::InvalidSelection(format!(
                "preferred distance must be a non-negative number of km, got {km}"
            ))),
            (_, None) => Err(StationCatalogError::InvalidSelection(
                "a station count of 0 requires a preferred distance".to_string(),
            )),
        }
    }

    /// Truncates a ranking that is already sorted by ascending distance.
    pub fn apply(&self, ranked: Vec<RankedStation>) -> Vec<RankedStation> {
        match *self {
            StationSelection::Count(n) => ranked.into_iter().take(n).collect(),
            StationSelection::WithinKm(km) => {
                let within = ranked.iter().take_while(|s| s.distance_km <= km).count();
                if within > 0 {
                    ranked.into_iter().take(within).collect()
                } else {
                    // Nothing close enough: fall back to the nearest station.
                    ranked.into_iter().take(1).collect()
                }
            }
        }
    }
}

/// Pairs every station with its distance from `origin` and sorts ascending.
/// Ties keep the stations' file order.
pub fn rank_stations(origin: LatLon, stations: Vec<Station>) -> Vec<RankedStation> {
    let mut ranked: Vec<RankedStation> = stations
        .into_iter()
        .map(|station| RankedStation {
            distance_km: origin.distance_km(station.location),
            station,
        })
        .collect();
    ranked.sort_by_key(|s| OrderedFloat(s.distance_km));
    ranked
}

/// Loads the station list of a month's archive and ranks it for a location.
///
/// Nothing is cached between calls: every request re-reads the month's
/// station file, since station lists genuinely differ from month to month.
pub struct StationCatalog {
    archives: Arc<ArchiveCache>,
}

impl StationCatalog {
    pub fn new(archives: Arc<ArchiveCache>) -> Self {
        Self { archives }
    }

    /// All stations listed for `month`, in file order.
    pub async fn load(&self, month: Month) -> Result<Vec<Station>, StationCatalogError> {
        let archive = self.archives.archive_path(month).await?;
        let stations =
            tokio::task::spawn_blocking(move || read_station_file(&archive, month))
                .await
                .map_err(ArchiveError::from)??;
        Ok(stations)
    }

    /// Every station of `month`, sorted by distance from `origin`.
    pub async fn ranked(
        &self,
        origin: LatLon,
        month: Month,
    ) -> Result<Vec<RankedStation>, StationCatalogError> {
        Ok(rank_stations(origin, self.load(month).await?))
    }

    /// The stations selected for `zip` in `month`. An empty catalog yields an
    /// empty list, not an error.
    pub async fn stations(
        &self,
        geo: &GeoIndex,
        zip: u32,
        month: Month,
        selection: StationSelection,
    ) -> Result<Vec<RankedStation>, StationCatalogError> {
        let origin = locate(geo, zip)?;
        Ok(selection.apply(self.ranked(origin, month).await?))
    }
}

/// Resolves `zip`, reporting a miss as [`StationCatalogError::UnknownLocation`].
pub(crate) fn locate(geo: &GeoIndex, zip: u32) -> Result<LatLon, StationCatalogError> {
    geo.resolve(zip)
        .map_err(|_| StationCatalogError::UnknownLocation(zip))
}

fn read_station_file(archive: &Path, month: Month) -> Result<Vec<Station>, ArchiveError> {
    let inner = InnerFile::Station.name(month);
    with_inner_file(archive, &inner, |reader| parse_stations(reader, archive, &inner))
}

/// Parses a pipe delimited station list with one header row. Rows without a
/// WBAN or usable coordinates are skipped.
pub(crate) fn parse_stations<R: Read>(
    reader: R,
    archive: &Path,
    inner: &str,
) -> Result<Vec<Station>, ArchiveError> {
    let mut stations = Vec::new();
    let mut skipped = 0usize;

    for record in delimited_reader(reader, InnerFile::Station.delimiter())
        .byte_records()
        .skip(1)
    {
        let record = record.map_err(|source| ArchiveError::Csv {
            archive: archive.to_path_buf(),
            inner: inner.to_string(),
            source,
        })?;

        let wban = field_lossy(&record, WBAN_COLUMN);
        let latitude = numeric(field(&record, LATITUDE_COLUMN));
        let longitude = numeric(field(&record, LONGITUDE_COLUMN));
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            skipped += 1;
            continue;
        };
        if wban.is_empty() {
            skipped += 1;
            continue;
        }

        let optional = |index| Some(field_lossy(&record, index)).filter(|s| !s.is_empty());
        stations.push(Station {
            wban,
            wmo: optional(WMO_COLUMN),
            call_sign: optional(CALL_SIGN_COLUMN),
            name: field_lossy(&record, NAME_COLUMN),
            state: optional(STATE_COLUMN),
            location: LatLon(latitude, longitude),
            ground_height: numeric(field(&record, GROUND_HEIGHT_COLUMN)),
        });
    }

    if skipped > 0 {
        warn!("Skipped {} station rows without WBAN or coordinates in {}", skipped, inner);
    }
    Ok(stations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{write_month_archive, write_zip, STATIONS};
    use std::time::Duration;
    use tempfile::TempDir;

    const POUGHKEEPSIE: LatLon = LatLon(41.7004, -73.921);

    fn station(wban: &str, lat: f64, lon: f64) -> Station {
        Station {
            wban: wban.to_string(),
            wmo: None,
            call_sign: None,
            name: wban.to_string(),
            state: None,
            location: LatLon(lat, lon),
            ground_height: None,
        }
    }

    fn ranked(distances: &[f64]) -> Vec<RankedStation> {
        distances
            .iter()
            .enumerate()
            .map(|(i, d)| RankedStation {
                station: station(&i.to_string(), 0.0, 0.0),
                distance_km: *d,
            })
            .collect()
    }

    fn fixture_stations() -> Vec<Station> {
        let archive = Path::new("QCLCD201303.zip");
        parse_stations(STATIONS.as_bytes(), archive, "201303station.txt").unwrap()
    }

    fn wbans(ranked: &[RankedStation]) -> Vec<&str> {
        ranked.iter().map(RankedStation::wban).collect()
    }

    #[test]
    fn parses_fixture_station_file() {
        let stations = fixture_stations();
        let ids: Vec<&str> = stations.iter().map(|s| s.wban.as_str()).collect();
        // 99999 has no coordinates.
        assert_eq!(ids, ["94789", "14757", "04789", "23230"]);

        let pou = &stations[1];
        assert_eq!(pou.name, "POUGHKEEPSIE");
        assert_eq!(pou.call_sign.as_deref(), Some("POU"));
        assert_eq!(pou.state.as_deref(), Some("NY"));
        assert_eq!(pou.location, LatLon(41.627, -73.884));
        assert_eq!(pou.ground_height, Some(154.0));
        assert_eq!(stations[2].wmo, None);
    }

    #[test]
    fn ranking_is_sorted_by_distance() {
        let stations = fixture_stations();
        let ranked = rank_stations(POUGHKEEPSIE, stations);

        assert_eq!(wbans(&ranked), ["14757", "04789", "94789", "23230"]);
        assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
        assert!(ranked.iter().all(|s| s.distance_km >= 0.0));
    }

    #[test]
    fn ranking_ties_keep_file_order() {
        let stations = vec![
            station("b", 1.0, 0.0),
            station("a", -1.0, 0.0),
            station("c", 0.0, 0.5),
        ];
        let ranked = rank_stations(LatLon(0.0, 0.0), stations);
        assert_eq!(wbans(&ranked), ["c", "b", "a"]);
    }

    #[test]
    fn count_mode_takes_the_closest_n() {
        let kept = StationSelection::Count(2).apply(ranked(&[1.0, 5.0, 500.0]));
        assert_eq!(wbans(&kept), ["0", "1"]);

        let all = StationSelection::Count(5).apply(ranked(&[1.0, 5.0]));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn distance_mode_is_inclusive() {
        let kept = StationSelection::WithinKm(5.0).apply(ranked(&[1.0, 5.0, 5.1]));
        assert_eq!(wbans(&kept), ["0", "1"]);
    }

    #[test]
    fn distance_mode_falls_back_to_the_nearest_station() {
        let kept = StationSelection::WithinKm(10.0).apply(ranked(&[12.0, 20.0]));
        assert_eq!(wbans(&kept), ["0"]);
    }

    #[test]
    fn empty_catalog_selects_nothing() {
        assert!(StationSelection::WithinKm(10.0).apply(vec![]).is_empty());
        assert!(StationSelection::Count(3).apply(vec![]).is_empty());
    }

    #[test]
    fn from_params_rejects_negative_distance() {
        assert!(matches!(
            StationSelection::from_params(0, Some(-1.0)),
            Err(StationCatalogError::InvalidSelection(_))
        ));
        assert!(StationSelection::from_params(0, Some(f64::NAN)).is_err());
    }

    fn catalog(dir: &Path) -> StationCatalog {
        let archives =
            ArchiveCache::new(dir, "http://127.0.0.1:9/", 7, Duration::from_secs(5)).unwrap();
        StationCatalog::new(Arc::new(archives))
    }

    #[tokio::test]
    async fn stations_for_zip_in_both_modes() {
        let dir = TempDir::new().unwrap();
        let month = Month::new(2013, 3).unwrap();
        write_month_archive(dir.path(), month);
        let geo = GeoIndex::from_ranked_entries(vec![vec![(12601, POUGHKEEPSIE)]]);
        let catalog = catalog(dir.path());

        let closest = catalog
            .stations(&geo, 12601, month, StationSelection::Count(3))
            .await
            .unwrap();
        assert_eq!(wbans(&closest), ["14757", "04789", "94789"]);

        let within_10 = catalog
            .stations(&geo, 12601, month, StationSelection::WithinKm(10.0))
            .await
            .unwrap();
        assert_eq!(wbans(&within_10), ["14757"]);

        let within_1 = catalog
            .stations(&geo, 12601, month, StationSelection::WithinKm(1.0))
            .await
            .unwrap();
        assert_eq!(wbans(&within_1), ["14757"]);
        assert!(within_1[0].distance_km > 1.0);
    }

    #[tokio::test]
    async fn unknown_zip_is_an_unknown_location() {
        let dir = TempDir::new().unwrap();
        let month = Month::new(2013, 3).unwrap();
        write_month_archive(dir.path(), month);
        let geo = GeoIndex::default();

        let err = catalog(dir.path())
            .stations(&geo, 999, month, StationSelection::Count(5))
            .await
            .unwrap_err();
        assert!(matches!(err, StationCatalogError::UnknownLocation(999)));
    }

    #[tokio::test]
    async fn empty_station_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let month = Month::new(2013, 3).unwrap();
        let header = STATIONS.lines().next().unwrap();
        write_zip(
            &dir.path().join("QCLCD201303.zip"),
            &[("201303station.txt", header)],
        );
        let geo = GeoIndex::from_ranked_entries(vec![vec![(12601, POUGHKEEPSIE)]]);

        let stations = catalog(dir.path())
            .stations(&geo, 12601, month, StationSelection::WithinKm(40.0))
            .await
            .unwrap();
        assert!(stations.is_empty());
    }

    #[tokio::test]
    async fn archive_without_station_file_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        let month = Month::new(2013, 3).unwrap();
        write_zip(&dir.path().join("QCLCD201303.zip"), &[("201303daily.txt", "")]);

        let err = catalog(dir.path()).load(month).await.unwrap_err();
        match err {
            StationCatalogError::Archive(e) => assert!(e.is_format_error()),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
