use crate::archive::reader::InnerFileError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoIndexError {
    #[error("Zip code {0:05} was not found in any geocoding source")]
    UnknownZip(u32),

    #[error("Failed to open zip source '{0}'")]
    SourceOpen(PathBuf, #[source] std::io::Error),

    #[error("Zip source '{0}' is not a readable zip archive")]
    SourceUnreadable(PathBuf, #[source] zip::result::ZipError),

    #[error("Zip source '{archive}' has no inner file '{inner}'")]
    MissingInnerFile { archive: PathBuf, inner: String },

    #[error("Failed to read rows from zip source '{0}'")]
    Csv(PathBuf, #[source] csv::Error),

    #[error("Malformed row at line {line} of zip source '{path}': {message}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("Failed to read index snapshot '{0}'")]
    SnapshotRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write index snapshot '{0}'")]
    SnapshotWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode index snapshot '{0}'")]
    SnapshotDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode index snapshot")]
    SnapshotEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl From<InnerFileError> for GeoIndexError {
    fn from(err: InnerFileError) -> Self {
        match err {
            InnerFileError::Open(path, source) => GeoIndexError::SourceOpen(path, source),
            InnerFileError::Unreadable(path, source) => GeoIndexError::SourceUnreadable(path, source),
            InnerFileError::Missing { archive, inner } => {
                GeoIndexError::MissingInnerFile { archive, inner }
            }
        }
    }
}
