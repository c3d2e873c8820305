use crate::archive::error::ArchiveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StationCatalogError {
    #[error("No coordinates known for zip code {0:05}")]
    UnknownLocation(u32),

    #[error("Invalid station selection: {0}")]
    InvalidSelection(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
