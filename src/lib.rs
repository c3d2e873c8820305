mod archive;
mod config;
mod error;
mod geo;
mod stacking;
mod stations;
mod types;
mod utils;
mod weather_data;
mod zip_weather;

#[cfg(test)]
mod test_fixtures;

pub use config::*;
pub use error::WeatherError;
pub use zip_weather::*;

pub use archive::cache::{ArchiveCache, ArchiveEntry};
pub use archive::error::ArchiveError;
pub use archive::reader::InnerFile;

pub use geo::error::GeoIndexError;
pub use geo::geo_index::GeoIndex;
pub use geo::zip_source::{RowErrors, ZipSource};

pub use stations::catalog::{rank_stations, StationCatalog, StationSelection};
pub use stations::error::StationCatalogError;

pub use weather_data::observation_loader::{ObservationLoader, ObservationQuery, RowFilter};

pub use stacking::aligner::{align, try_align};
pub use stacking::error::{AlignmentError, Side, StackingError};
pub use stacking::stacked_table::{ConstantValue, StackedTable, TIMESTAMP_COLUMN};
pub use stacking::stacker::{
    combine, combine_all, combine_summary, stack, StationSeries, StationStack, SummaryField,
};

pub use types::frequency::Frequency;
pub use types::location::{LatLon, EARTH_RADIUS_KM};
pub use types::month::{Month, MonthSchedule};
pub use types::observation::{ObservationRow, ObservationTable};
pub use types::station::{RankedStation, Station};
