use polars::error::PolarsError;
use std::fmt;
use thiserror::Error;

/// Which input of an alignment violated the ordering precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("The {side} sequence is not sorted ascending at position {index}")]
    Unsorted { side: Side, index: usize },
}

#[derive(Debug, Error)]
pub enum StackingError {
    #[error("Field '{0}' is not present in the observation table")]
    UnknownField(String),

    #[error("Cannot concatenate tables with different fields: {expected:?} and {found:?}")]
    FieldMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error("Failed building DataFrame")]
    DataFrame(#[from] PolarsError),
}
