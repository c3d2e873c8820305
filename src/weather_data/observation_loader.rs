//! Loads daily or hourly observation rows from a month's archive.

use crate::archive::cache::ArchiveCache;
use crate::archive::error::ArchiveError;
use crate::archive::reader::{delimited_reader, field, line_of, numeric, with_inner_file, InnerFile};
use crate::types::frequency::Frequency;
use crate::types::month::Month;
use crate::types::observation::{ObservationRow, ObservationTable};
use bon::Builder;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use csv::ByteRecord;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

pub const STATION_COLUMN: &str = "WBAN";

/// Keeps only rows whose `column` holds one of `values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub values: HashSet<String>,
}

impl RowFilter {
    pub fn new<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Rows reported by any of the given stations.
    pub fn stations<I, S>(wbans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(STATION_COLUMN, wbans)
    }
}

/// Which rows and columns of a month's observation file to load.
///
/// ```
/// use qclcd_weather::{Frequency, ObservationQuery, RowFilter};
///
/// let query = ObservationQuery::builder()
///     .frequency(Frequency::Hourly)
///     .fields(vec!["DryBulbFarenheit".to_string()])
///     .filter(RowFilter::stations(["14757"]))
///     .build();
/// assert_eq!(query.field_names(), ["DryBulbFarenheit"]);
///
/// let daily = ObservationQuery::builder().build();
/// assert_eq!(daily.frequency, Frequency::Daily);
/// assert_eq!(daily.field_names().len(), Frequency::Daily.default_fields().len());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ObservationQuery {
    #[builder(default = Frequency::Daily)]
    pub frequency: Frequency,
    /// Numeric columns to project, in output order. `None` loads the
    /// frequency's default fields.
    pub fields: Option<Vec<String>>,
    pub filter: Option<RowFilter>,
}

impl ObservationQuery {
    pub fn field_names(&self) -> Vec<String> {
        match &self.fields {
            Some(fields) => fields.clone(),
            None => self
                .frequency
                .default_fields()
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

pub struct ObservationLoader {
    archives: Arc<ArchiveCache>,
}

impl ObservationLoader {
    pub fn new(archives: Arc<ArchiveCache>) -> Self {
        Self { archives }
    }

    /// Reads the daily or hourly file of `month` and returns the matching rows,
    /// in file order.
    pub async fn load(
        &self,
        month: Month,
        query: &ObservationQuery,
    ) -> Result<ObservationTable, ArchiveError> {
        let archive = self.archives.archive_path(month).await?;
        let query = query.clone();
        tokio::task::spawn_blocking(move || {
            let inner = InnerFile::from(query.frequency).name(month);
            let table = with_inner_file(&archive, &inner, |reader| {
                parse_observations(reader, &archive, &inner, &query)
            })?;
            debug!(
                "Loaded {} {} rows from {}",
                table.len(),
                query.frequency,
                inner
            );
            Ok(table)
        })
        .await?
    }

    /// Rows of a single station.
    pub async fn load_station(
        &self,
        month: Month,
        frequency: Frequency,
        wban: &str,
        fields: Option<Vec<String>>,
    ) -> Result<ObservationTable, ArchiveError> {
        let query = ObservationQuery::builder()
            .frequency(frequency)
            .maybe_fields(fields)
            .filter(RowFilter::stations([wban]))
            .build();
        self.load(month, &query).await
    }
}

/// Column positions resolved from a file's header row.
struct Columns {
    station: usize,
    timestamp: Vec<usize>,
    fields: Vec<usize>,
    filter: Option<usize>,
}

impl Columns {
    fn resolve(
        header: &ByteRecord,
        inner: &str,
        query: &ObservationQuery,
        fields: &[String],
    ) -> Result<Self, ArchiveError> {
        let positions: HashMap<&str, usize> = (0..header.len())
            .filter_map(|i| field(header, i).map(|name| (name, i)))
            .collect();
        let find = |column: &str| -> Result<usize, ArchiveError> {
            positions
                .get(column)
                .copied()
                .ok_or_else(|| ArchiveError::MissingColumn {
                    inner: inner.to_string(),
                    column: column.to_string(),
                })
        };

        Ok(Self {
            station: find(STATION_COLUMN)?,
            timestamp: query
                .frequency
                .timestamp_columns()
                .iter()
                .map(|c| find(*c))
                .collect::<Result<_, _>>()?,
            fields: fields
                .iter()
                .map(|f| find(f.as_str()))
                .collect::<Result<_, _>>()?,
            filter: query
                .filter
                .as_ref()
                .map(|f| find(f.column.as_str()))
                .transpose()?,
        })
    }
}

/// Parses an observation file with one header row. Columns are located by
/// header name; blank and flagged readings become `None`.
pub(crate) fn parse_observations<R: Read>(
    reader: R,
    archive: &Path,
    inner: &str,
    query: &ObservationQuery,
) -> Result<ObservationTable, ArchiveError> {
    let csv_error = |source: csv::Error| ArchiveError::Csv {
        archive: archive.to_path_buf(),
        inner: inner.to_string(),
        source,
    };
    let fields = query.field_names();
    let mut records = delimited_reader(reader, InnerFile::from(query.frequency).delimiter())
        .into_byte_records();

    let Some(header) = records.next().transpose().map_err(csv_error)? else {
        return Ok(ObservationTable::new(fields));
    };
    let columns = Columns::resolve(&header, inner, query, &fields)?;
    let mut table = ObservationTable::new(fields);

    for record in records {
        let record = record.map_err(csv_error)?;
        if record.iter().all(|f| f.iter().all(u8::is_ascii_whitespace)) {
            continue;
        }
        if let (Some(filter), Some(column)) = (&query.filter, columns.filter) {
            if !field(&record, column).is_some_and(|v| filter.values.contains(v)) {
                continue;
            }
        }

        let timestamp = parse_timestamp(&record, query.frequency, &columns.timestamp).map_err(
            |message| ArchiveError::MalformedRow {
                inner: inner.to_string(),
                line: line_of(&record),
                message,
            },
        )?;

        table.push(ObservationRow {
            station: field(&record, columns.station).unwrap_or_default().to_string(),
            timestamp,
            values: columns
                .fields
                .iter()
                .map(|&i| numeric(field(&record, i)))
                .collect(),
        });
    }
    Ok(table)
}

fn parse_timestamp(
    record: &ByteRecord,
    frequency: Frequency,
    columns: &[usize],
) -> Result<NaiveDateTime, String> {
    let text = |i: usize| columns.get(i).and_then(|&c| field(record, c)).unwrap_or("");
    let date = NaiveDate::parse_from_str(text(0), "%Y%m%d")
        .map_err(|e| format!("invalid date '{}': {}", text(0), e))?;
    match frequency {
        Frequency::Daily => Ok(date.and_time(NaiveTime::MIN)),
        Frequency::Hourly => parse_time(date, text(1)),
    }
}

/// Combines a date with an `HHMM` report time. `2400` is midnight of the
/// following day.
fn parse_time(date: NaiveDate, hhmm: &str) -> Result<NaiveDateTime, String> {
    let invalid = || format!("invalid time '{hhmm}'");
    if hhmm.is_empty() || hhmm.len() > 4 || !hhmm.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: u32 = hhmm.parse().map_err(|_| invalid())?;
    let (hour, minute) = (value / 100, value % 100);
    if hour == 24 && minute == 0 {
        return date
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(NaiveTime::MIN))
            .ok_or_else(invalid);
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
        .map(|time| date.and_time(time))
        .ok_or_else(invalid)
}
