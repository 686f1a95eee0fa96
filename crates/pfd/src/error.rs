//! Error types for the case-study pipeline.

use pfd_data::DataError;
use pfd_output::{ExportError, ReportError};
use pfd_regress::RegressionError;
use thiserror::Error;

/// Errors raised while configuring or running a study.
#[derive(Debug, Error)]
pub enum StudyError {
    /// Loading or shaping the survey table failed
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Fitting a model failed
    #[error("Regression error: {0}")]
    Regression(#[from] RegressionError),

    /// Exporting results failed
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Building a report failed
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Reading a configuration file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No rows remain after filtering
    #[error("No observations for years {0:?}")]
    NoObservations(Vec<i64>),
}

/// Result type for study operations.
pub type Result<T> = std::result::Result<T, StudyError>;
