//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP error
    #[error("HTTP error fetching {url}: status {status}")]
    Http {
        /// URL that was requested
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Required column is absent from the table
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Column cannot be read as numbers
    #[error("Column {column} is not numeric (dtype {dtype})")]
    NonNumeric {
        /// Column name
        column: String,
        /// Polars dtype of the column
        dtype: String,
    },

    /// Column is not a boolean flag
    #[error("Column {column} is not boolean (dtype {dtype})")]
    NotBoolean {
        /// Column name
        column: String,
        /// Polars dtype of the column
        dtype: String,
    },

    /// Survey weight is null or negative
    #[error("Invalid survey weight at row {row}: {value:?}")]
    InvalidWeight {
        /// Zero-based row index
        row: usize,
        /// Offending value (None when null)
        value: Option<f64>,
    },

    /// Invalid data source string
    #[error("Invalid data source: {0}")]
    InvalidSource(String),

    /// Cache error
    #[error("Cache error: {0}")]
    Cache(String),
}
