//! Error types for regression.

use thiserror::Error;

/// Result type for regression operations.
pub type Result<T> = std::result::Result<T, RegressionError>;

/// Errors that can occur while building or fitting a model.
#[derive(Debug, Error)]
pub enum RegressionError {
    /// Column is missing from the input table
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Model column is not numeric (e.g. a boolean flag)
    #[error("Column {column} has dtype {dtype}; cast flags to numbers (0/1) before fitting")]
    NonNumericRegressor {
        /// Column name
        column: String,
        /// Polars dtype of the column
        dtype: String,
    },

    /// Null or NaN values in model data
    #[error("Column {column} has {count} missing value(s)")]
    MissingValues {
        /// Column name
        column: String,
        /// Number of null/NaN entries
        count: usize,
    },

    /// Negative weight
    #[error("Invalid weight at row {row}: {value}")]
    InvalidWeight {
        /// Zero-based row index
        row: usize,
        /// Offending value
        value: f64,
    },

    /// Insufficient data for estimation
    #[error("Insufficient data: need more than {required} observations, got {actual}")]
    InsufficientData {
        /// Number of parameters to estimate
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// XᵀWX is not positive definite (perfect collinearity or zero weights)
    #[error("Singular design matrix: {0}")]
    Singular(String),

    /// No regressors were given
    #[error("Model has no regressors")]
    NoRegressors,

    /// Invalid distribution parameters
    #[error("Distribution error: {0}")]
    Distribution(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
