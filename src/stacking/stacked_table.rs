//! The merged, one-row-per-timestamp result of stacking.

use crate::stacking::aligner::try_align;
use crate::stacking::error::StackingError;
use crate::stacking::stacker::StationSeries;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use std::fmt;

/// A value repeated on every row of a [`StackedTable`], such as the zip code
/// the table was built for.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for ConstantValue {
    fn from(value: i64) -> Self {
        ConstantValue::Int(value)
    }
}

impl From<u32> for ConstantValue {
    fn from(value: u32) -> Self {
        ConstantValue::Int(i64::from(value))
    }
}

impl From<f64> for ConstantValue {
    fn from(value: f64) -> Self {
        ConstantValue::Float(value)
    }
}

impl From<&str> for ConstantValue {
    fn from(value: &str) -> Self {
        ConstantValue::Text(value.to_string())
    }
}

impl From<String> for ConstantValue {
    fn from(value: String) -> Self {
        ConstantValue::Text(value)
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Int(v) => write!(f, "{v}"),
            ConstantValue::Float(v) => write!(f, "{v}"),
            ConstantValue::Text(v) => write!(f, "{v}"),
        }
    }
}

pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Rows indexed by strictly ascending timestamps, one column per field.
///
/// Backed by a polars `DataFrame` holding a millisecond `timestamp` column
/// followed by one `Float64` column per field. Holds at most one value per
/// field and timestamp; missing readings are null. Constant columns are kept
/// apart from the fields and never take part in fallback.
#[derive(Debug, Clone)]
pub struct StackedTable {
    frame: DataFrame,
    fields: Vec<String>,
    constants: Vec<(String, ConstantValue)>,
}

impl PartialEq for StackedTable {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.constants == other.constants
            && self.frame.equals_missing(&other.frame)
    }
}

impl StackedTable {
    pub fn empty(fields: Vec<String>) -> Result<Self, StackingError> {
        Self::from_rows(fields, Vec::new())
    }

    /// Builds a table from `(timestamp, row)` pairs that are already sorted and
    /// free of duplicates.
    pub(crate) fn from_rows(
        fields: Vec<String>,
        rows: impl IntoIterator<Item = (NaiveDateTime, Vec<Option<f64>>)>,
    ) -> Result<Self, StackingError> {
        let rows: Vec<(NaiveDateTime, Vec<Option<f64>>)> = rows.into_iter().collect();
        debug_assert!(rows.windows(2).all(|w| w[0].0 < w[1].0));

        let mut columns = Vec::with_capacity(1 + fields.len());
        columns.push(timestamp_column(rows.iter().map(|(t, _)| *t))?);
        for (i, field) in fields.iter().enumerate() {
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|(_, row)| row.get(i).copied().flatten())
                .collect();
            columns.push(Column::new(field.as_str().into(), values));
        }
        Self::from_frame(DataFrame::new(columns)?, fields)
    }

    /// Wraps a frame that has a `timestamp` column and the given fields.
    /// Field columns are cast to `Float64` and the rest are dropped.
    pub(crate) fn from_frame(frame: DataFrame, fields: Vec<String>) -> Result<Self, StackingError> {
        let selection: Vec<Expr> = std::iter::once(
            col(TIMESTAMP_COLUMN).cast(DataType::Datetime(TimeUnit::Milliseconds, None)),
        )
        .chain(fields.iter().map(|f| col(f.as_str()).cast(DataType::Float64)))
        .collect();
        let frame = frame.lazy().select(selection).collect()?;
        Ok(Self {
            frame,
            fields,
            constants: Vec::new(),
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.millis()
            .unwrap_or_default()
            .into_iter()
            .filter_map(from_millis)
            .collect()
    }

    pub fn constants(&self) -> &[(String, ConstantValue)] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    /// The field values of row `index`, or `None` past the end.
    pub fn row(&self, index: usize) -> Option<Vec<Option<f64>>> {
        (index < self.len()).then(|| {
            self.fields
                .iter()
                .map(|field| self.value(index, field))
                .collect()
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = (NaiveDateTime, Vec<Option<f64>>)> {
        let columns: Vec<Vec<Option<f64>>> = self
            .fields
            .iter()
            .map(|field| self.column(field).unwrap_or_default())
            .collect();
        self.timestamps()
            .into_iter()
            .enumerate()
            .map(move |(i, timestamp)| {
                let row = columns.iter().map(|c| c.get(i).copied().flatten()).collect();
                (timestamp, row)
            })
    }

    /// The value of `field` at row `index`; `None` when missing or unknown.
    pub fn value(&self, index: usize, field: &str) -> Option<f64> {
        if index >= self.len() {
            return None;
        }
        self.field_index(field)?;
        let series = self.frame.column(field).ok()?.as_materialized_series();
        series.f64().ok()?.get(index)
    }

    pub fn column(&self, field: &str) -> Option<Vec<Option<f64>>> {
        self.field_index(field)?;
        let series = self.frame.column(field).ok()?.as_materialized_series();
        Some(series.f64().ok()?.into_iter().collect())
    }

    /// Number of rows where `field` has no value.
    pub fn missing_count(&self, field: &str) -> usize {
        if self.field_index(field).is_none() {
            return 0;
        }
        self.frame
            .column(field)
            .map(|c| c.null_count())
            .unwrap_or(0)
    }

    pub fn has_missing(&self, field: &str) -> bool {
        self.missing_count(field) > 0
    }

    /// Appends a constant column, replacing one of the same name.
    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<ConstantValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.constants.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.constants.push((name, value)),
        }
        self
    }

    pub(crate) fn with_constants(
        self,
        constants: impl IntoIterator<Item = (String, ConstantValue)>,
    ) -> Self {
        constants
            .into_iter()
            .fold(self, |table, (name, value)| table.with_constant(name, value))
    }

    /// The table's fields as the series of one pseudo-station, so a combined
    /// table can be stacked again.
    pub fn as_series(&self, station: impl Into<String>) -> StationSeries {
        let mut series = StationSeries::new(station, self.fields.clone());
        for (timestamp, row) in self.rows() {
            series.insert(timestamp, row);
        }
        series
    }

    /// Reindexes onto an external ascending timestamp sequence. Timestamps
    /// without a weather row get all fields missing.
    pub fn align_to(&self, external: &[NaiveDateTime]) -> Result<StackedTable, StackingError> {
        let own = self.timestamps();
        let (ie, it) = try_align(external, &own)?;
        let rows: Vec<Vec<Option<f64>>> = self.rows().map(|(_, row)| row).collect();
        let mut aligned = vec![vec![None; self.fields.len()]; external.len()];
        for (e, t) in ie.into_iter().zip(it) {
            aligned[e].clone_from(&rows[t]);
        }
        Ok(
            Self::from_rows(self.fields.clone(), external.iter().copied().zip(aligned))?
                .with_constants(self.constants.clone()),
        )
    }

    /// Rows with `start <= timestamp <= end`.
    pub fn trim(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<StackedTable, StackingError> {
        let frame = self
            .frame
            .clone()
            .lazy()
            .filter(
                col(TIMESTAMP_COLUMN)
                    .gt_eq(lit(start))
                    .and(col(TIMESTAMP_COLUMN).lt_eq(lit(end))),
            )
            .collect()?;
        Ok(Self {
            frame,
            fields: self.fields.clone(),
            constants: self.constants.clone(),
        })
    }

    /// Joins tables with identical fields into one. Where timestamps repeat,
    /// the earlier table's row is kept. Constants come from the first table.
    pub fn concat(tables: Vec<StackedTable>) -> Result<StackedTable, StackingError> {
        let mut tables = tables.into_iter();
        let Some(first) = tables.next() else {
            return StackedTable::empty(Vec::new());
        };
        let mut frame = first.frame;
        for table in tables {
            if table.fields != first.fields {
                return Err(StackingError::FieldMismatch {
                    expected: first.fields,
                    found: table.fields,
                });
            }
            frame.vstack_mut(&table.frame)?;
        }

        let firsts: Vec<Expr> = first.fields.iter().map(|f| col(f.as_str()).first()).collect();
        let frame = frame
            .lazy()
            .group_by_stable([col(TIMESTAMP_COLUMN)])
            .agg(firsts)
            .sort([TIMESTAMP_COLUMN], SortMultipleOptions::default())
            .collect()?;
        Ok(Self {
            frame,
            fields: first.fields,
            constants: first.constants,
        })
    }

    /// Converts to a polars `DataFrame`: a millisecond `timestamp` column,
    /// one `Float64` column per field, then the constant columns.
    pub fn to_dataframe(&self) -> Result<DataFrame, StackingError> {
        let height = self.len();
        let mut columns = self.frame.get_columns().to_vec();
        for (name, value) in &self.constants {
            let column = match value {
                ConstantValue::Int(v) => Column::new(name.as_str().into(), vec![*v; height]),
                ConstantValue::Float(v) => Column::new(name.as_str().into(), vec![*v; height]),
                ConstantValue::Text(v) => {
                    Column::new(name.as_str().into(), vec![v.as_str(); height])
                }
            };
            columns.push(column);
        }
        Ok(DataFrame::new(columns)?)
    }

    fn millis(&self) -> PolarsResult<Vec<i64>> {
        let millis = self
            .frame
            .column(TIMESTAMP_COLUMN)?
            .as_materialized_series()
            .cast(&DataType::Int64)?;
        Ok(millis.i64()?.into_iter().flatten().collect())
    }
}

/// A `timestamp` column in milliseconds.
pub(crate) fn timestamp_column(
    timestamps: impl IntoIterator<Item = NaiveDateTime>,
) -> PolarsResult<Column> {
    let millis: Vec<i64> = timestamps
        .into_iter()
        .map(|t| t.and_utc().timestamp_millis())
        .collect();
    let series = Series::new(TIMESTAMP_COLUMN.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok(Column::from(series))
}

fn from_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|t| t.naive_utc())
}
