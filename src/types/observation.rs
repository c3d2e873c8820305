//! Raw observation rows as loaded from a monthly daily or hourly file.

use chrono::NaiveDateTime;
use std::collections::HashSet;

/// One observation report for one station.
///
/// `values` is parallel to the field names of the owning [`ObservationTable`];
/// a `None` is an explicit missing reading, never a zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub station: String,
    pub timestamp: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

/// Observation rows for one or more stations, sharing one ordered set of fields.
///
/// Rows keep the order they were read in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    fields: Vec<String>,
    rows: Vec<ObservationRow>,
}

impl ObservationTable {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
        }
    }

    /// Appends a row. Its value count must match the table's fields.
    pub fn push(&mut self, row: ObservationRow) {
        debug_assert_eq!(row.values.len(), self.fields.len());
        self.rows.push(row);
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    pub fn rows(&self) -> &[ObservationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct station identifiers, in order of first appearance.
    pub fn stations(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|row| row.station.as_str())
            .filter(|station| seen.insert(*station))
            .collect()
    }

    /// Rows belonging to `station`.
    pub fn for_station<'a>(&'a self, station: &'a str) -> impl Iterator<Item = &'a ObservationRow> {
        self.rows.iter().filter(move |row| row.station == station)
    }
}
