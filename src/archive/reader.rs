//! Streaming access to delimited text files, either on disk or inside a zip archive.

use crate::archive::error::ArchiveError;
use crate::types::frequency::Frequency;
use crate::types::month::Month;
use csv::{ByteRecord, ReaderBuilder};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// The three files every monthly QCLCD archive contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InnerFile {
    /// Pipe delimited station list.
    Station,
    Daily,
    Hourly,
}

impl InnerFile {
    /// File name inside the archive for `month`, e.g. `201303station.txt`.
    pub fn name(self, month: Month) -> String {
        let suffix = match self {
            InnerFile::Station => "station.txt",
            InnerFile::Daily => "daily.txt",
            InnerFile::Hourly => "hourly.txt",
        };
        format!("{}{}", month.prefix(), suffix)
    }

    pub fn delimiter(self) -> u8 {
        match self {
            InnerFile::Station => b'|',
            InnerFile::Daily | InnerFile::Hourly => b',',
        }
    }
}

impl From<Frequency> for InnerFile {
    fn from(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Hourly => InnerFile::Hourly,
            Frequency::Daily => InnerFile::Daily,
        }
    }
}

/// Failure to reach a named file inside an archive.
#[derive(Debug, Error)]
pub enum InnerFileError {
    #[error("Failed to open '{0}'")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("'{0}' is not a readable zip archive")]
    Unreadable(PathBuf, #[source] ZipError),

    #[error("'{archive}' has no inner file '{inner}'")]
    Missing { archive: PathBuf, inner: String },
}

impl From<InnerFileError> for ArchiveError {
    fn from(err: InnerFileError) -> Self {
        match err {
            InnerFileError::Open(path, source) => ArchiveError::ArchiveOpen(path, source),
            InnerFileError::Unreadable(archive, source) => {
                ArchiveError::Unreadable { archive, source }
            }
            InnerFileError::Missing { archive, inner } => {
                ArchiveError::MissingInnerFile { archive, inner }
            }
        }
    }
}

/// Opens `inner` inside the zip at `archive` and hands a reader over it to `read`.
pub(crate) fn with_inner_file<T, E>(
    archive: &Path,
    inner: &str,
    read: impl FnOnce(&mut dyn Read) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<InnerFileError>,
{
    let file =
        File::open(archive).map_err(|e| InnerFileError::Open(archive.to_path_buf(), e))?;
    let mut zip = ZipArchive::new(BufReader::new(file))
        .map_err(|e| InnerFileError::Unreadable(archive.to_path_buf(), e))?;
    let mut entry = match zip.by_name(inner) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(InnerFileError::Missing {
                archive: archive.to_path_buf(),
                inner: inner.to_string(),
            }
            .into())
        }
        Err(e) => return Err(InnerFileError::Unreadable(archive.to_path_buf(), e).into()),
    };
    read(&mut entry)
}

/// A header-agnostic reader; callers decide how many leading rows to skip.
pub(crate) fn delimited_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
}

/// Trimmed text of field `index`; `None` when absent or not valid UTF-8.
pub(crate) fn field(record: &ByteRecord, index: usize) -> Option<&str> {
    record
        .get(index)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .map(str::trim)
}

/// Trimmed text of field `index` with invalid UTF-8 replaced. Empty when absent.
pub(crate) fn field_lossy(record: &ByteRecord, index: usize) -> String {
    record
        .get(index)
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .unwrap_or_default()
}

/// Parses a numeric reading. Blank, flag-only ("M", "T", "*") and
/// non-finite fields are missing.
pub(crate) fn numeric(text: Option<&str>) -> Option<f64> {
    text.and_then(|s| s.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// 1-based line of a record, for error messages.
pub(crate) fn line_of(record: &ByteRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::write_zip;
    use tempfile::TempDir;

    #[test]
    fn inner_file_names_use_month_prefix() {
        let month = Month::new(2013, 3).unwrap();
        assert_eq!(InnerFile::Station.name(month), "201303station.txt");
        assert_eq!(InnerFile::Daily.name(month), "201303daily.txt");
        assert_eq!(InnerFile::from(Frequency::Hourly).name(month), "201303hourly.txt");
    }

    #[test]
    fn numeric_treats_blanks_and_flags_as_missing() {
        assert_eq!(numeric(Some("42.5")), Some(42.5));
        assert_eq!(numeric(Some("-3")), Some(-3.0));
        assert_eq!(numeric(Some("")), None);
        assert_eq!(numeric(Some("M")), None);
        assert_eq!(numeric(Some("T")), None);
        assert_eq!(numeric(Some("NaN")), None);
        assert_eq!(numeric(None), None);
    }

    #[test]
    fn reads_trimmed_fields_from_inner_file() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.zip");
        write_zip(&archive, &[("rows.txt", "a\tb\n 1 \t 2\n")]);

        let rows: Vec<(String, String)> = with_inner_file(&archive, "rows.txt", |r| {
            let mut out = Vec::new();
            for record in delimited_reader(r, b'\t').byte_records().skip(1) {
                let record = record.map_err(|e| InnerFileError::Open(archive.clone(), e.into()))?;
                out.push((field_lossy(&record, 0), field(&record, 1).unwrap().to_string()));
            }
            Ok::<_, InnerFileError>(out)
        })
        .unwrap();

        assert_eq!(rows, vec![("1".to_string(), "2".to_string())]);
    }

    #[test]
    fn missing_inner_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.zip");
        write_zip(&archive, &[("other.txt", "x\n")]);

        let err = with_inner_file(&archive, "rows.txt", |_| Ok::<_, ArchiveError>(())).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingInnerFile { ref inner, .. } if inner == "rows.txt"));
        assert!(err.is_format_error());
    }

    #[test]
    fn non_zip_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("a.zip");
        std::fs::write(&archive, b"definitely not a zip").unwrap();

        let err = with_inner_file(&archive, "rows.txt", |_| Ok::<_, ArchiveError>(())).unwrap_err();
        assert!(matches!(err, ArchiveError::Unreadable { .. }));
    }
}
