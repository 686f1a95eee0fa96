//! CSV and JSON export of fitted models.
//!
//! Coefficients flatten to one row per (model, term) with the estimate,
//! its standard error, test statistic and confidence bounds; model-level
//! statistics flatten to one row per model.

use pfd_regress::{RegressionError, WlsResults};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output was not valid UTF-8.
    #[error("Invalid UTF-8 in CSV output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Statistics could not be computed.
    #[error("Regression error: {0}")]
    Regression(#[from] RegressionError),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Infer the format from a file extension (`.csv` or `.json`).
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::PrettyJson),
            _ => Err(ExportError::InvalidFormat(format!(
                "cannot infer export format from {}",
                path.display()
            ))),
        }
    }
}

/// One estimated coefficient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoefficientRow {
    /// Model label, e.g. `(1)`.
    pub model: String,
    /// Regressor name.
    pub term: String,
    /// Point estimate.
    pub estimate: f64,
    /// Standard error.
    pub std_error: f64,
    /// t statistic.
    pub t_value: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Lower confidence bound.
    pub ci_lower: f64,
    /// Upper confidence bound.
    pub ci_upper: f64,
}

impl CoefficientRow {
    /// Rows for every coefficient of `results`, with `1 - alpha` intervals.
    pub fn from_results(
        model: &str,
        results: &WlsResults,
        alpha: f64,
    ) -> Result<Vec<Self>, RegressionError> {
        let intervals = results.conf_int(alpha)?;
        Ok(results
            .terms()
            .into_iter()
            .zip(intervals)
            .map(|(term, (ci_lower, ci_upper))| Self {
                model: model.to_string(),
                term: term.name,
                estimate: term.estimate,
                std_error: term.std_error,
                t_value: term.t_value,
                p_value: term.p_value,
                ci_lower,
                ci_upper,
            })
            .collect())
    }
}

/// Model-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelStatistics {
    /// Model label.
    pub model: String,
    /// Dependent variable.
    pub outcome: String,
    /// Covariance estimator.
    pub cov_type: String,
    /// Observations.
    pub nobs: usize,
    /// Model degrees of freedom.
    pub df_model: f64,
    /// Residual degrees of freedom.
    pub df_resid: f64,
    /// R².
    pub rsquared: f64,
    /// Adjusted R².
    pub rsquared_adj: f64,
    /// Residual standard error.
    pub resid_std_err: f64,
    /// F statistic.
    pub fvalue: f64,
    /// p-value of the F statistic.
    pub f_pvalue: f64,
    /// Log-likelihood.
    pub llf: f64,
    /// AIC.
    pub aic: f64,
    /// BIC.
    pub bic: f64,
}

impl ModelStatistics {
    /// Collect the statistics of a fitted model.
    pub fn from_results(model: &str, results: &WlsResults) -> Self {
        Self {
            model: model.to_string(),
            outcome: results.outcome.clone(),
            cov_type: results.cov_type.to_string(),
            nobs: results.nobs,
            df_model: results.df_model,
            df_resid: results.df_resid,
            rsquared: results.rsquared,
            rsquared_adj: results.rsquared_adj,
            resid_std_err: results.resid_std_err,
            fvalue: results.fvalue,
            f_pvalue: results.f_pvalue,
            llf: results.llf,
            aic: results.aic,
            bic: results.bic,
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn to_csv<T: Serialize>(records: &[T]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, ExportError> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

impl Exporter for [CoefficientRow] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(self),
            ExportFormat::Json => to_json(self, false),
            ExportFormat::PrettyJson => to_json(self, true),
        }
    }
}

impl Exporter for Vec<CoefficientRow> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        self.as_slice().export_to_string(format)
    }
}

impl Exporter for ModelStatistics {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(std::slice::from_ref(self)),
            ExportFormat::Json => to_json(self, false),
            ExportFormat::PrettyJson => to_json(self, true),
        }
    }
}

impl Exporter for Vec<ModelStatistics> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(self),
            ExportFormat::Json => to_json(self, false),
            ExportFormat::PrettyJson => to_json(self, true),
        }
    }
}
