//! Merges observations of several ranked stations into one table per zip code.
//!
//! Raw rows are first pivoted into one [`StationSeries`] per station. A
//! [`StationStack`] is then combined either with nearest-station fallback
//! ([`combine`]) or into averaged summary fields ([`combine_summary`]).

use crate::stacking::aligner::align;
use crate::stacking::error::StackingError;
use crate::stacking::stacked_table::{
    timestamp_column, ConstantValue, StackedTable, TIMESTAMP_COLUMN,
};
use crate::types::frequency::Frequency;
use crate::types::observation::ObservationTable;
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// The observations of one station, keyed by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSeries {
    pub station: String,
    fields: Vec<String>,
    rows: BTreeMap<NaiveDateTime, Vec<Option<f64>>>,
}

impl StationSeries {
    pub fn new(station: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            station: station.into(),
            fields,
            rows: BTreeMap::new(),
        }
    }

    /// Adds a row. A second row at the same timestamp only fills the fields
    /// the first one left missing.
    pub fn insert(&mut self, timestamp: NaiveDateTime, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.fields.len());
        match self.rows.get_mut(&timestamp) {
            Some(existing) => fill_missing(existing, &values),
            None => {
                self.rows.insert(timestamp, values);
            }
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn get(&self, timestamp: &NaiveDateTime) -> Option<&[Option<f64>]> {
        self.rows.get(timestamp).map(Vec::as_slice)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = &NaiveDateTime> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-station series sharing one set of fields, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationStack {
    fields: Vec<String>,
    series: Vec<StationSeries>,
}

impl StationStack {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            series: Vec::new(),
        }
    }

    /// Adds a series, merging it into an existing one for the same station.
    pub fn push(&mut self, series: StationSeries) {
        debug_assert_eq!(series.fields, self.fields);
        match self.series.iter_mut().find(|s| s.station == series.station) {
            Some(existing) => {
                for (timestamp, values) in series.rows {
                    existing.insert(timestamp, values);
                }
            }
            None => self.series.push(series),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn series(&self) -> &[StationSeries] {
        &self.series
    }

    pub fn station(&self, station: &str) -> Option<&StationSeries> {
        self.series.iter().find(|s| s.station == station)
    }

    pub fn stations(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.station.as_str()).collect()
    }
}

/// Pivots raw rows into one series per station.
pub fn stack(table: &ObservationTable) -> StationStack {
    let fields = table.fields().to_vec();
    let mut series: Vec<StationSeries> = Vec::new();
    let mut positions: BTreeMap<&str, usize> = BTreeMap::new();

    for row in table.rows() {
        let index = *positions.entry(row.station.as_str()).or_insert_with(|| {
            series.push(StationSeries::new(row.station.clone(), fields.clone()));
            series.len() - 1
        });
        series[index].insert(row.timestamp, row.values.clone());
    }
    StationStack { fields, series }
}

/// Cross-station fallback.
///
/// Builds one row per timestamp present at any of the `order`ed stations. For
/// each field the value comes from the first station in `order` that has it at
/// that timestamp; when none does, it stays missing. Stations in `order` that
/// are not in the stack are ignored, and so are stack stations missing from
/// `order`. `constants` are appended to every row afterwards.
pub fn combine<S: AsRef<str>>(
    stack: &StationStack,
    order: &[S],
    constants: Vec<(String, ConstantValue)>,
) -> Result<StackedTable, StackingError> {
    let candidates: Vec<&StationSeries> = order
        .iter()
        .filter_map(|station| stack.station(station.as_ref()))
        .collect();

    let timestamps: Vec<NaiveDateTime> = candidates
        .iter()
        .flat_map(|s| s.timestamps().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let width = stack.fields.len();
    let mut rows: Vec<Vec<Option<f64>>> = vec![vec![None; width]; timestamps.len()];
    for series in candidates {
        let own: Vec<NaiveDateTime> = series.timestamps().copied().collect();
        let values: Vec<&Vec<Option<f64>>> = series.rows.values().collect();
        let (at, from) = align(&timestamps, &own);
        for (row, source) in at.into_iter().zip(from) {
            fill_missing(&mut rows[row], values[source]);
        }
    }

    Ok(StackedTable::from_rows(stack.fields.clone(), timestamps.into_iter().zip(rows))?
        .with_constants(constants))
}

/// [`combine`] using the stack's own station order.
pub fn combine_all(
    stack: &StationStack,
    constants: Vec<(String, ConstantValue)>,
) -> Result<StackedTable, StackingError> {
    let order = stack.stations();
    combine(stack, &order, constants)
}

/// A derived field: the mean of every available reading of its source fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryField {
    pub name: String,
    pub sources: Vec<String>,
}

impl SummaryField {
    pub fn new<I, S>(name: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// Mean of the named field alone, under the same name.
    pub fn mean_of(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(field.clone(), [field])
    }
}

/// Averages readings of the given `stations` into summary fields.
///
/// Every report falls into a bucket: its hour for hourly data, its day for
/// daily data. Each summary is the arithmetic mean of all non-missing source
/// readings from all the stations in that bucket, so a station lacking a
/// reading does not blank the bucket when another station has one. With
/// `remove_blanks`, buckets where any summary has no contributing reading are
/// dropped; otherwise they are kept with the summary missing.
pub fn combine_summary<S: AsRef<str>>(
    table: &ObservationTable,
    stations: &[S],
    summaries: &[SummaryField],
    frequency: Frequency,
    remove_blanks: bool,
) -> Result<StackedTable, StackingError> {
    let sources: BTreeSet<&str> = summaries
        .iter()
        .flat_map(|summary| summary.sources.iter().map(String::as_str))
        .collect();
    let positions: Vec<(&str, usize)> = sources
        .into_iter()
        .map(|field| {
            table
                .field_index(field)
                .map(|i| (field, i))
                .ok_or_else(|| StackingError::UnknownField(field.to_string()))
        })
        .collect::<Result<_, _>>()?;
    let stations: BTreeSet<&str> = stations.iter().map(AsRef::as_ref).collect();
    let rows: Vec<_> = table
        .rows()
        .iter()
        .filter(|row| stations.contains(row.station.as_str()))
        .collect();

    let mut columns = vec![timestamp_column(rows.iter().map(|row| row.timestamp))?];
    for (field, i) in &positions {
        let values: Vec<Option<f64>> = rows.iter().map(|row| row.values[*i]).collect();
        columns.push(Column::new((*field).into(), values));
    }

    let means: Vec<Expr> = summaries.iter().map(summary_mean).collect();
    let mut summary = DataFrame::new(columns)?
        .lazy()
        .group_by([col(TIMESTAMP_COLUMN)
            .dt()
            .truncate(lit(bucket_width(frequency)))
            .alias(TIMESTAMP_COLUMN)])
        .agg(means)
        .sort([TIMESTAMP_COLUMN], SortMultipleOptions::default());
    if remove_blanks {
        if let Some(complete) = summaries
            .iter()
            .map(|s| col(s.name.as_str()).is_not_null())
            .reduce(|a, b| a.and(b))
        {
            summary = summary.filter(complete);
        }
    }

    let names = summaries.iter().map(|s| s.name.clone()).collect();
    StackedTable::from_frame(summary.collect()?, names)
}

/// Mean of every non-null reading of the summary's sources within a group.
fn summary_mean(summary: &SummaryField) -> Expr {
    let expr = match summary.sources.as_slice() {
        [only] => col(only.as_str()).mean(),
        sources => {
            let total = sources
                .iter()
                .map(|f| col(f.as_str()).sum())
                .reduce(|a, b| a + b)
                .unwrap_or_else(|| lit(0.0));
            let count = sources
                .iter()
                .map(|f| col(f.as_str()).count().cast(DataType::Float64))
                .reduce(|a, b| a + b)
                .unwrap_or_else(|| lit(0.0));
            when(count.clone().gt(lit(0.0)))
                .then(total / count)
                .otherwise(lit(NULL).cast(DataType::Float64))
        }
    };
    expr.alias(summary.name.as_str())
}

fn bucket_width(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Hourly => "1h",
        Frequency::Daily => "1d",
    }
}

fn fill_missing(target: &mut [Option<f64>], source: &[Option<f64>]) {
    for (slot, value) in target.iter_mut().zip(source) {
        if slot.is_none() {
            *slot = *value;
        }
    }
}
