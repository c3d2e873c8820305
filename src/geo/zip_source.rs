//! Descriptions of the delimited zip code → coordinate sources the index is built from.

use crate::archive::reader::{delimited_reader, field, line_of, with_inner_file};
use crate::geo::error::GeoIndexError;
use crate::types::location::LatLon;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

pub const PRIMARY_TABLE_FILE: &str = "Erle_zipcodes.csv";
pub const GAZETTEER_ARCHIVE: &str = "2015_Gaz_zcta_national.zip";
pub const GAZETTEER_INNER_FILE: &str = "2015_Gaz_zcta_national.txt";
pub const ZIPCODE_DATABASE_ARCHIVE: &str = "free-zipcode-database-Primary.zip";
pub const ZIPCODE_DATABASE_INNER_FILE: &str = "free-zipcode-database-Primary.csv";

/// What to do with a row whose zip or coordinates do not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowErrors {
    /// Abort the build with [`GeoIndexError::MalformedRow`].
    Fail,
    /// Treat the row as carrying no data for its zip.
    Skip,
}

/// One delimited source with a single header row and fixed column positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipSource {
    pub path: PathBuf,
    /// File to read inside the zip archive at `path`; `None` reads `path` itself.
    pub inner_file: Option<String>,
    pub delimiter: u8,
    pub zip_column: usize,
    pub latitude_column: usize,
    pub longitude_column: usize,
    pub row_errors: RowErrors,
}

impl ZipSource {
    /// Comma separated primary table: zip in column 0, coordinates in 3 and 4.
    pub fn primary_table(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner_file: None,
            delimiter: b',',
            zip_column: 0,
            latitude_column: 3,
            longitude_column: 4,
            row_errors: RowErrors::Fail,
        }
    }

    /// Tab separated census gazetteer inside a zip: zip in column 0, coordinates in 5 and 6.
    pub fn gazetteer(archive: impl Into<PathBuf>, inner_file: &str) -> Self {
        Self {
            path: archive.into(),
            inner_file: Some(inner_file.to_string()),
            delimiter: b'\t',
            zip_column: 0,
            latitude_column: 5,
            longitude_column: 6,
            row_errors: RowErrors::Fail,
        }
    }

    /// Comma separated secondary database inside a zip: zip in column 0,
    /// coordinates in 5 and 6. Rows without numeric coordinates are skipped.
    pub fn zipcode_database(archive: impl Into<PathBuf>, inner_file: &str) -> Self {
        Self {
            path: archive.into(),
            inner_file: Some(inner_file.to_string()),
            delimiter: b',',
            zip_column: 0,
            latitude_column: 5,
            longitude_column: 6,
            row_errors: RowErrors::Skip,
        }
    }

    /// The three standard sources located in `dir`, highest precedence first.
    pub fn defaults_in(dir: &Path) -> Vec<ZipSource> {
        vec![
            ZipSource::primary_table(dir.join(PRIMARY_TABLE_FILE)),
            ZipSource::gazetteer(dir.join(GAZETTEER_ARCHIVE), GAZETTEER_INNER_FILE),
            ZipSource::zipcode_database(
                dir.join(ZIPCODE_DATABASE_ARCHIVE),
                ZIPCODE_DATABASE_INNER_FILE,
            ),
        ]
    }

    /// Reads every usable `(zip, coordinate)` pair, in file order.
    pub fn read_entries(&self) -> Result<Vec<(u32, LatLon)>, GeoIndexError> {
        match &self.inner_file {
            Some(inner) => with_inner_file(&self.path, inner, |reader| self.parse(reader)),
            None => {
                let file = File::open(&self.path)
                    .map_err(|e| GeoIndexError::SourceOpen(self.path.clone(), e))?;
                self.parse(BufReader::new(file))
            }
        }
    }

    fn parse<R: Read>(&self, reader: R) -> Result<Vec<(u32, LatLon)>, GeoIndexError> {
        let mut entries = Vec::new();
        let mut skipped = 0usize;

        for record in delimited_reader(reader, self.delimiter)
            .byte_records()
            .skip(1)
        {
            let record = record.map_err(|e| GeoIndexError::Csv(self.path.clone(), e))?;
            if record.iter().all(|f| f.iter().all(u8::is_ascii_whitespace)) {
                continue;
            }

            let zip = field(&record, self.zip_column).and_then(|z| z.parse::<u32>().ok());
            let latitude = field(&record, self.latitude_column).and_then(|v| v.parse::<f64>().ok());
            let longitude =
                field(&record, self.longitude_column).and_then(|v| v.parse::<f64>().ok());

            match (zip, latitude, longitude) {
                (Some(zip), Some(lat), Some(lon)) => entries.push((zip, LatLon(lat, lon))),
                _ => match self.row_errors {
                    RowErrors::Skip => skipped += 1,
                    RowErrors::Fail => {
                        return Err(GeoIndexError::MalformedRow {
                            path: self.path.clone(),
                            line: line_of(&record),
                            message: format!(
                                "expected zip and numeric coordinates in columns {}, {} and {}",
                                self.zip_column, self.latitude_column, self.longitude_column
                            ),
                        })
                    }
                },
            }
        }

        if skipped > 0 {
            debug!(
                "Skipped {} rows without coordinates in {}",
                skipped,
                self.path.display()
            );
        }
        Ok(entries)
    }
}
