//! Difference-in-differences study of the Permanent Fund Dividend.
//!
//! The treated group is residents of one state (Alaska, FIPS 2), the post
//! period starts in the policy year (1982), and the sample is restricted to
//! the years around the introduction. Two nested WLS models are fitted on the
//! survey weights:
//!
//! 1. `poor ~ alaska_post + alaska + post + const`
//! 2. the same plus demographic controls (`female`, `age`, `age2`)
//!
//! The coefficient on the interaction `alaska_post` is the DD estimate.

use crate::error::{Result, StudyError};
use pfd_data::{DataSource, DesignSpec, SurveyFrame, add_constant, columns};
use pfd_output::{CoefficientRow, ModelStatistics, RegressionTable, Report, ReportBuilder};
use pfd_regress::{CovarianceType, DesignMatrix, Wls, WlsResults};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Configuration of a study. Every field has a default, so a JSON file only
/// needs the values that differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Survey file location.
    pub source: DataSource,
    /// FIPS code of the treated state.
    pub treated_fips: i64,
    /// Name of the treatment flag column.
    pub treated_name: String,
    /// First policy year.
    pub policy_year: i64,
    /// Years kept for estimation.
    pub years: Vec<i64>,
    /// Outcome column.
    pub outcome: String,
    /// Survey weight column.
    pub weight: String,
    /// Control covariates added in the second model.
    pub controls: Vec<String>,
    /// Covariance estimator for standard errors.
    pub cov_type: CovarianceType,
}

impl Default for StudyConfig {
    fn default() -> Self {
        let spec = DesignSpec::default();
        Self {
            source: DataSource::default(),
            treated_fips: spec.treated_fips,
            treated_name: spec.treated_name,
            policy_year: spec.policy_year,
            years: vec![1981, 1982],
            outcome: columns::POOR.to_string(),
            weight: columns::WEIGHT.to_string(),
            controls: vec![
                columns::FEMALE.to_string(),
                columns::AGE.to_string(),
                columns::AGE2.to_string(),
            ],
            cov_type: CovarianceType::NonRobust,
        }
    }
}

impl StudyConfig {
    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(StudyError::InvalidConfig(
                "at least one year is required".to_string(),
            ));
        }
        if self.treated_name.is_empty() {
            return Err(StudyError::InvalidConfig(
                "treated_name must not be empty".to_string(),
            ));
        }
        if self.controls.iter().any(|c| c == columns::CONSTANT) {
            return Err(StudyError::InvalidConfig(
                "the constant is always included; remove it from controls".to_string(),
            ));
        }

        // Derived design columns must not overwrite data or model columns.
        let reserved = self.reserved_columns();
        let interaction = self.design_spec().interaction_name();
        for name in [&self.treated_name, &interaction] {
            if reserved.contains(&name.as_str()) {
                return Err(StudyError::InvalidConfig(format!(
                    "derived column `{}` would replace an existing column",
                    name
                )));
            }
        }
        Ok(())
    }

    fn reserved_columns(&self) -> Vec<&str> {
        let mut reserved: Vec<&str> = columns::REQUIRED.to_vec();
        reserved.extend([columns::AGE2, columns::POST, columns::CONSTANT]);
        reserved.push(&self.outcome);
        reserved.push(&self.weight);
        reserved.extend(self.controls.iter().map(String::as_str));
        reserved
    }

    /// Column derivation settings.
    pub fn design_spec(&self) -> DesignSpec {
        DesignSpec {
            treated_fips: self.treated_fips,
            treated_name: self.treated_name.clone(),
            policy_year: self.policy_year,
        }
    }
}

/// One model of the study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    /// Column label, e.g. `(1)`.
    pub label: String,
    /// Regressors in order, constant last.
    pub regressors: Vec<String>,
}

/// Both fitted models of a study.
#[derive(Debug, Clone)]
pub struct StudyResults {
    /// Model (1): treatment, post and interaction.
    pub baseline: WlsResults,
    /// Model (2): model (1) plus controls.
    pub with_controls: WlsResults,
    /// Rows used in estimation.
    pub rows: usize,
    /// Name of the interaction regressor.
    pub interaction: String,
    /// DD estimate from the baseline model.
    pub dd_estimate: f64,
}

impl StudyResults {
    /// Models in column order.
    pub fn models(&self) -> [&WlsResults; 2] {
        [&self.baseline, &self.with_controls]
    }

    /// DD estimate once controls are added.
    pub fn dd_estimate_with_controls(&self) -> Option<f64> {
        self.with_controls.param(&self.interaction)
    }

    /// Side-by-side table of both models.
    pub fn table(&self) -> RegressionTable<'_> {
        RegressionTable::new(self.models())
    }

    /// Coefficient rows of both models with 95% intervals.
    pub fn coefficient_rows(&self) -> Result<Vec<CoefficientRow>> {
        let mut rows = CoefficientRow::from_results("(1)", &self.baseline, 0.05)?;
        rows.extend(CoefficientRow::from_results(
            "(2)",
            &self.with_controls,
            0.05,
        )?);
        Ok(rows)
    }

    /// JSON report of the run.
    pub fn report(&self, source: &DataSource, rows_loaded: usize) -> Result<Report> {
        let report = ReportBuilder::new()
            .title("Permanent Fund Dividend and SPM poverty")
            .source(source.to_string())
            .rows(rows_loaded, self.rows)
            .model(ModelStatistics::from_results("(1)", &self.baseline))
            .model(ModelStatistics::from_results("(2)", &self.with_controls))
            .coefficients(self.coefficient_rows()?)
            .contents(serde_json::json!({
                "interaction": self.interaction,
                "dd_estimate": self.dd_estimate,
                "dd_estimate_with_controls": self.dd_estimate_with_controls(),
            }))
            .build()?;
        Ok(report)
    }
}

/// Runs the two-model difference-in-differences study.
#[derive(Debug, Clone)]
pub struct DiffInDiff {
    config: StudyConfig,
}

impl DiffInDiff {
    /// Create a study from its configuration.
    pub const fn new(config: StudyConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub const fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Regressor sets of both models, in column order.
    pub fn specifications(&self) -> Vec<Specification> {
        let spec = self.config.design_spec();
        let core = vec![
            spec.interaction_name(),
            spec.treated_name.clone(),
            columns::POST.to_string(),
        ];

        let mut baseline = core.clone();
        baseline.push(columns::CONSTANT.to_string());

        let mut with_controls = core;
        with_controls.extend(self.config.controls.iter().cloned());
        with_controls.push(columns::CONSTANT.to_string());

        vec![
            Specification {
                label: "(1)".to_string(),
                regressors: baseline,
            },
            Specification {
                label: "(2)".to_string(),
                regressors: with_controls,
            },
        ]
    }

    /// Derive the design columns, keep the study years, cast flags to 0/1 and
    /// append the constant.
    pub fn prepare(&self, survey: &SurveyFrame) -> Result<DataFrame> {
        let sample = survey
            .derive(&self.config.design_spec())?
            .filter_years(&self.config.years)?;

        if sample.is_empty() {
            return Err(StudyError::NoObservations(self.config.years.clone()));
        }

        let numeric = add_constant(&sample.to_numeric()?)?;
        debug!(rows = numeric.height(), "prepared estimation sample");
        Ok(numeric)
    }

    /// Fit one specification on a prepared sample.
    pub fn fit(&self, sample: &DataFrame, spec: &Specification) -> Result<WlsResults> {
        let regressors: Vec<&str> = spec.regressors.iter().map(String::as_str).collect();
        let design =
            DesignMatrix::from_frame(sample, &self.config.outcome, &regressors, &self.config.weight)?;
        Ok(Wls::new(design).fit_with(self.config.cov_type)?)
    }

    /// Run the study on a loaded survey.
    pub fn run(&self, survey: &SurveyFrame) -> Result<StudyResults> {
        self.config.validate()?;
        let sample = self.prepare(survey)?;

        let specs = self.specifications();
        let baseline = self.fit(&sample, &specs[0])?;
        let with_controls = self.fit(&sample, &specs[1])?;

        let interaction = self.config.design_spec().interaction_name();
        let dd_estimate = baseline
            .param(&interaction)
            .ok_or_else(|| StudyError::InvalidConfig(format!("{} not estimated", interaction)))?;

        info!(
            rows = sample.height(),
            dd_estimate,
            "difference-in-differences study complete"
        );

        Ok(StudyResults {
            baseline,
            with_controls,
            rows: sample.height(),
            interaction,
            dd_estimate,
        })
    }
}
