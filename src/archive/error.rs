use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {url}")]
    Retrieval {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    // Stream errors, timeouts mid-body and temp file persistence
    #[error("Archive download from {url} did not complete")]
    Transfer {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Download from {url} is not a zip archive")]
    NotAnArchive {
        url: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Finalization day {0} is outside 1..=28")]
    InvalidFinalizationDay(u32),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read metadata for cached archive '{0}'")]
    CacheMetadataRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to open archive '{0}'")]
    ArchiveOpen(PathBuf, #[source] std::io::Error),

    #[error("Archive '{archive}' is not a readable zip file")]
    Unreadable {
        archive: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Archive '{archive}' has no inner file '{inner}'")]
    MissingInnerFile { archive: PathBuf, inner: String },

    #[error("Failed to read rows of '{inner}' in '{archive}'")]
    Csv {
        archive: PathBuf,
        inner: String,
        #[source]
        source: csv::Error,
    },

    #[error("Column '{column}' not found in header of '{inner}'")]
    MissingColumn { inner: String, column: String },

    #[error("Malformed row at line {line} of '{inner}': {message}")]
    MalformedRow {
        inner: String,
        line: u64,
        message: String,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ArchiveError {
    /// The archive could not be fetched. Fatal to that month's processing.
    pub fn is_retrieval_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::Retrieval { .. }
                | ArchiveError::HttpStatus { .. }
                | ArchiveError::Transfer { .. }
                | ArchiveError::NotAnArchive { .. }
        )
    }

    /// The archive exists locally but an expected file is absent or malformed.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::Unreadable { .. }
                | ArchiveError::MissingInnerFile { .. }
                | ArchiveError::Csv { .. }
                | ArchiveError::MissingColumn { .. }
                | ArchiveError::MalformedRow { .. }
        )
    }
}
