//! The authoritative zip code → coordinate lookup, folded from ranked sources.

use crate::geo::error::GeoIndexError;
use crate::geo::zip_source::ZipSource;
use crate::types::location::LatLon;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Maps each known zip code to exactly one coordinate.
///
/// Sources are consulted in precedence order. The first source is read
/// unconditionally; every later source only fills zip codes that are still
/// absent, so a value once present is never overridden.
///
/// ```
/// use qclcd_weather::{GeoIndex, LatLon};
///
/// let index = GeoIndex::from_ranked_entries(vec![
///     vec![(12601, LatLon(41.70, -73.92))],
///     vec![(12601, LatLon(0.0, 0.0)), (94611, LatLon(37.82, -122.21))],
/// ]);
/// assert_eq!(index.resolve(12601).unwrap(), LatLon(41.70, -73.92));
/// assert_eq!(index.resolve(94611).unwrap(), LatLon(37.82, -122.21));
/// assert!(index.resolve(99999).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoIndex {
    coordinates: HashMap<u32, LatLon>,
}

impl GeoIndex {
    /// Folds per-source entry lists, highest precedence first, into one index.
    pub fn from_ranked_entries<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = (u32, LatLon)>,
    {
        let mut coordinates = HashMap::new();
        for (rank, entries) in sources.into_iter().enumerate() {
            for (zip, location) in entries {
                if rank == 0 {
                    coordinates.insert(zip, location);
                } else {
                    coordinates.entry(zip).or_insert(location);
                }
            }
        }
        Self { coordinates }
    }

    /// Reads and folds every source. Blocking; parses each file in full.
    pub fn build(sources: &[ZipSource]) -> Result<Self, GeoIndexError> {
        let start = std::time::Instant::now();
        let entries = sources
            .iter()
            .map(ZipSource::read_entries)
            .collect::<Result<Vec<_>, _>>()?;
        let index = Self::from_ranked_entries(entries);
        info!(
            "Zip to lat/lon lookup initialized with {} entries from {} sources in {:?}",
            index.len(),
            sources.len(),
            start.elapsed()
        );
        Ok(index)
    }

    /// Builds the index on a blocking thread, reusing the bincode snapshot at
    /// `snapshot` when it was built from the same sources and is newer than
    /// every one of them, and refreshing it otherwise. Failing to write the
    /// snapshot is logged and does not fail the load.
    pub async fn load(
        sources: Vec<ZipSource>,
        snapshot: Option<PathBuf>,
    ) -> Result<Self, GeoIndexError> {
        tokio::task::spawn_blocking(move || {
            let Some(snapshot) = snapshot else {
                return Self::build(&sources);
            };
            if snapshot_is_current(&snapshot, &sources) {
                match Self::read_snapshot(&snapshot, &sources) {
                    Ok(Some(index)) => {
                        debug!("Loaded zip index snapshot {}", snapshot.display());
                        return Ok(index);
                    }
                    Ok(None) => debug!(
                        "Zip index snapshot {} was built from other sources",
                        snapshot.display()
                    ),
                    Err(e) => warn!("Ignoring unreadable zip index snapshot: {}", e),
                }
            }
            let index = Self::build(&sources)?;
            if let Err(e) = index.write_snapshot(&snapshot, &sources) {
                warn!("Zip index snapshot not saved: {}", e);
            }
            Ok(index)
        })
        .await?
    }

    pub fn resolve(&self, zip: u32) -> Result<LatLon, GeoIndexError> {
        self.coordinates
            .get(&zip)
            .copied()
            .ok_or(GeoIndexError::UnknownZip(zip))
    }

    pub fn contains(&self, zip: u32) -> bool {
        self.coordinates.contains_key(&zip)
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// The snapshotted index, or `None` when it was built from other sources.
    fn read_snapshot(path: &Path, sources: &[ZipSource]) -> Result<Option<Self>, GeoIndexError> {
        let bytes =
            std::fs::read(path).map_err(|e| GeoIndexError::SnapshotRead(path.to_path_buf(), e))?;
        let (snapshot, _) = bincode::serde::decode_from_slice::<Snapshot, _>(&bytes, BINCODE_CONFIG)
            .map_err(|e| GeoIndexError::SnapshotDecode(path.to_path_buf(), Box::new(e)))?;
        Ok((snapshot.sources == sources).then_some(snapshot.index))
    }

    fn write_snapshot(&self, path: &Path, sources: &[ZipSource]) -> Result<(), GeoIndexError> {
        let snapshot = SnapshotRef {
            sources,
            index: self,
        };
        let bytes = bincode::serde::encode_to_vec(&snapshot, BINCODE_CONFIG)
            .map_err(|e| GeoIndexError::SnapshotEncode(Box::new(e)))?;

        let write_error = |e: std::io::Error| GeoIndexError::SnapshotWrite(path.to_path_buf(), e);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
        file.write_all(&bytes).map_err(write_error)?;
        file.persist(path).map_err(|e| write_error(e.error))?;
        debug!(
            "Wrote zip index snapshot ({} bytes) to {}",
            bytes.len(),
            path.display()
        );
        Ok(())
    }
}

/// The index together with the sources it was built from.
#[derive(Deserialize)]
struct Snapshot {
    sources: Vec<ZipSource>,
    index: GeoIndex,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    sources: &'a [ZipSource],
    index: &'a GeoIndex,
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// True when the snapshot exists and no source is missing or newer than it.
fn snapshot_is_current(snapshot: &Path, sources: &[ZipSource]) -> bool {
    let Some(snapshot_time) = modified(snapshot) else {
        return false;
    };
    sources
        .iter()
        .all(|source| modified(&source.path).is_some_and(|t| t <= snapshot_time))
}
