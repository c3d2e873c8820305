use crate::archive::error::ArchiveError;
use crate::geo::error::GeoIndexError;
use crate::stacking::error::{AlignmentError, StackingError};
use crate::stations::error::StationCatalogError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error(transparent)]
    GeoIndex(#[from] GeoIndexError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    StationCatalog(#[from] StationCatalogError),

    #[error(transparent)]
    Stacking(#[from] StackingError),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error("Failed to create data directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine data directory")]
    CacheDirResolution(#[source] std::io::Error),
}

impl WeatherError {
    /// The requested zip code has no coordinates in any geocoding source.
    pub fn is_unknown_location(&self) -> bool {
        matches!(
            self,
            WeatherError::GeoIndex(GeoIndexError::UnknownZip(_))
                | WeatherError::StationCatalog(StationCatalogError::UnknownLocation(_))
        )
    }

    /// A monthly archive could not be fetched.
    pub fn is_retrieval_error(&self) -> bool {
        match self {
            WeatherError::Archive(e) | WeatherError::StationCatalog(StationCatalogError::Archive(e)) => {
                e.is_retrieval_error()
            }
            _ => false,
        }
    }
}
