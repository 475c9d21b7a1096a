//! Typed errors for the load and export boundaries

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while building the record store from the input file.
///
/// Any of these is fatal: no partial dashboard is built.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Required column '{0}' is missing from the input file")]
    MissingColumn(String),

    #[error("Column '{column}' has an empty value at row {row}")]
    NullValue { column: String, row: usize },

    #[error("Column '{column}' has an invalid value at row {row}: {value}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Failed to read input file: {0}")]
    Polars(#[from] PolarsError),
}

/// Errors raised while serializing rendered charts into one document.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export: no rendered charts")]
    NoCharts,

    #[error("Chart {index} ('{title}') is not a valid rendered image")]
    InvalidChart { index: usize, title: String },

    #[error("Failed to encode page image: {0}")]
    Io(#[from] std::io::Error),
}
