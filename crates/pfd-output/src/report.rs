//! JSON reports of a case-study run.

use crate::export::{CoefficientRow, ModelStatistics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required field was not set on the builder.
    #[error("Missing report field: {0}")]
    MissingField(&'static str),
}

/// Record of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report title.
    pub title: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Where the survey data came from.
    pub source: String,

    /// Rows in the loaded table.
    pub rows_loaded: usize,

    /// Rows used in estimation.
    pub rows_analyzed: usize,

    /// Per-model statistics.
    pub models: Vec<ModelStatistics>,

    /// Coefficients of every model.
    pub coefficients: Vec<CoefficientRow>,

    /// Free-form extra contents.
    pub contents: serde_json::Value,
}

impl Report {
    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    title: Option<String>,
    source: Option<String>,
    rows_loaded: usize,
    rows_analyzed: usize,
    models: Vec<ModelStatistics>,
    coefficients: Vec<CoefficientRow>,
    contents: Option<serde_json::Value>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the data source.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the loaded and analysed row counts.
    pub const fn rows(mut self, loaded: usize, analyzed: usize) -> Self {
        self.rows_loaded = loaded;
        self.rows_analyzed = analyzed;
        self
    }

    /// Add a model's statistics.
    pub fn model(mut self, model: ModelStatistics) -> Self {
        self.models.push(model);
        self
    }

    /// Add coefficient rows.
    pub fn coefficients(mut self, rows: impl IntoIterator<Item = CoefficientRow>) -> Self {
        self.coefficients.extend(rows);
        self
    }

    /// Set the report contents.
    pub fn contents(mut self, contents: serde_json::Value) -> Self {
        self.contents = Some(contents);
        self
    }

    /// Build the report, stamped with the current time.
    ///
    /// # Errors
    /// `MissingField` when no source was set.
    pub fn build(self) -> Result<Report, ReportError> {
        Ok(Report {
            title: self
                .title
                .unwrap_or_else(|| "Difference-in-differences study".to_string()),
            timestamp: Utc::now(),
            source: self.source.ok_or(ReportError::MissingField("source"))?,
            rows_loaded: self.rows_loaded,
            rows_analyzed: self.rows_analyzed,
            models: self.models,
            coefficients: self.coefficients,
            contents: self.contents.unwrap_or(serde_json::Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_builder() {
        let report = ReportBuilder::new()
            .title("PFD")
            .source("spm_state.csv.gz")
            .rows(100, 40)
            .contents(serde_json::json!({"estimate": -0.1}))
            .build()
            .unwrap();

        assert_eq!(report.title, "PFD");
        assert_eq!(report.rows_loaded, 100);
        assert_eq!(report.rows_analyzed, 40);
        assert!(report.models.is_empty());
    }

    #[test]
    fn test_report_requires_source() {
        assert!(matches!(
            ReportBuilder::new().build(),
            Err(ReportError::MissingField("source"))
        ));
    }

    #[test]
    fn test_report_json() {
        let json = ReportBuilder::new()
            .source("local.csv")
            .build()
            .unwrap()
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["source"], "local.csv");
        assert!(value["timestamp"].is_string());
        assert_eq!(value["contents"], serde_json::Value::Null);
    }
}
