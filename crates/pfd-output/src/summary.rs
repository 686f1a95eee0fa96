//! Single-model regression summary.

use pfd_regress::{CovarianceType, RegressionError, WlsResults};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition number above which a multicollinearity note is printed.
const CONDITION_WARNING: f64 = 1000.0;

const WIDTH: usize = 78;

/// One coefficient line of the summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRow {
    /// Regressor name.
    pub term: String,
    /// Estimate.
    pub coef: f64,
    /// Standard error.
    pub std_err: f64,
    /// t statistic.
    pub t: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Lower confidence bound.
    pub lower: f64,
    /// Upper confidence bound.
    pub upper: f64,
}

/// Regression summary for one fitted model: header statistics, the
/// coefficient table and explanatory notes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSummary {
    /// Dependent variable.
    pub outcome: String,
    /// Covariance estimator.
    pub cov_type: CovarianceType,
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
    /// Condition number of the whitened design.
    pub condition_number: f64,
    /// Confidence level of the interval columns, e.g. 0.95.
    pub confidence: f64,
    /// Coefficient rows.
    pub rows: Vec<SummaryRow>,
}

impl ModelSummary {
    /// Summarise with 95% confidence intervals.
    pub fn new(results: &WlsResults) -> Result<Self, RegressionError> {
        Self::with_alpha(results, 0.05)
    }

    /// Summarise with `1 - alpha` confidence intervals.
    pub fn with_alpha(results: &WlsResults, alpha: f64) -> Result<Self, RegressionError> {
        let intervals = results.conf_int(alpha)?;
        let rows = results
            .terms()
            .into_iter()
            .zip(intervals)
            .map(|(term, (lower, upper))| SummaryRow {
                term: term.name,
                coef: term.estimate,
                std_err: term.std_error,
                t: term.t_value,
                p_value: term.p_value,
                lower,
                upper,
            })
            .collect();

        Ok(Self {
            outcome: results.outcome.clone(),
            cov_type: results.cov_type,
            nobs: results.nobs,
            df_model: results.df_model,
            df_resid: results.df_resid,
            rsquared: results.rsquared,
            rsquared_adj: results.rsquared_adj,
            fvalue: results.fvalue,
            f_pvalue: results.f_pvalue,
            llf: results.llf,
            aic: results.aic,
            bic: results.bic,
            condition_number: results.condition_number,
            confidence: 1.0 - alpha,
            rows,
        })
    }

    fn notes(&self) -> Vec<String> {
        let mut notes = vec![match self.cov_type {
            CovarianceType::NonRobust => "Standard Errors assume that the covariance matrix \
                                          of the errors is correctly specified."
                .to_string(),
            robust => format!("Standard Errors are heteroscedasticity robust ({})", robust),
        }];
        if self.condition_number > CONDITION_WARNING {
            notes.push(format!(
                "The condition number is large, {:.3e}. This might indicate strong \
                 multicollinearity or other numerical problems.",
                self.condition_number
            ));
        }
        notes
    }
}

fn header_pair(left: (&str, String), right: (&str, String)) -> String {
    let half = WIDTH / 2;
    let left_pad = half.saturating_sub(left.0.len() + 1);
    let right_pad = (WIDTH - half).saturating_sub(right.0.len() + 1);
    format!(
        "{} {:>lw$} {} {:>rw$}",
        left.0,
        left.1,
        right.0,
        right.1,
        lw = left_pad.saturating_sub(1),
        rw = right_pad.saturating_sub(1)
    )
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:^w$}", "WLS Regression Results", w = WIDTH)?;
        writeln!(f, "{}", "=".repeat(WIDTH))?;

        let lines = [
            (
                ("Dep. Variable:", self.outcome.clone()),
                ("R-squared:", format!("{:.3}", self.rsquared)),
            ),
            (
                ("Model:", "WLS".to_string()),
                ("Adj. R-squared:", format!("{:.3}", self.rsquared_adj)),
            ),
            (
                ("Method:", "Least Squares".to_string()),
                ("F-statistic:", format!("{:.4}", self.fvalue)),
            ),
            (
                ("Covariance Type:", self.cov_type.to_string()),
                ("Prob (F-statistic):", format!("{:.3e}", self.f_pvalue)),
            ),
            (
                ("No. Observations:", self.nobs.to_string()),
                ("Log-Likelihood:", format!("{:.2}", self.llf)),
            ),
            (
                ("Df Residuals:", format!("{:.0}", self.df_resid)),
                ("AIC:", format!("{:.1}", self.aic)),
            ),
            (
                ("Df Model:", format!("{:.0}", self.df_model)),
                ("BIC:", format!("{:.1}", self.bic)),
            ),
        ];
        for (left, right) in lines {
            writeln!(f, "{}", header_pair(left, right))?;
        }
        writeln!(f, "{}", "=".repeat(WIDTH))?;

        let term_width = self
            .rows
            .iter()
            .map(|r| r.term.chars().count())
            .max()
            .unwrap_or(0)
            .max(12);
        let tail = (1.0 - self.confidence) / 2.0;
        writeln!(
            f,
            "{:tw$} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "",
            "coef",
            "std err",
            "t",
            "P>|t|",
            format!("[{}", format_bound(tail)),
            format!("{}]", format_bound(1.0 - tail)),
            tw = term_width
        )?;
        writeln!(f, "{}", "-".repeat(WIDTH))?;
        for row in &self.rows {
            writeln!(
                f,
                "{:tw$} {:>10.4} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
                row.term,
                row.coef,
                row.std_err,
                row.t,
                row.p_value,
                row.lower,
                row.upper,
                tw = term_width
            )?;
        }
        writeln!(f, "{}", "=".repeat(WIDTH))?;

        writeln!(f, "Notes:")?;
        for (i, note) in self.notes().iter().enumerate() {
            writeln!(f, "[{}] {}", i + 1, note)?;
        }
        Ok(())
    }
}

fn format_bound(q: f64) -> String {
    let s = format!("{:.3}", q);
    s.trim_end_matches('0').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use pfd_regress::{DesignMatrix, Wls};

    fn results(cov_type: CovarianceType) -> WlsResults {
        let design = DesignMatrix::new(
            "poor",
            array![1.0, 3.0, 2.0, 5.0, 4.0],
            vec!["x".to_string(), "const".to_string()],
            array![[1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [4.0, 1.0], [5.0, 1.0]],
            array![1.0, 1.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        Wls::new(design).fit_with(cov_type).unwrap()
    }

    #[test]
    fn test_summary_rows() {
        let summary = ModelSummary::new(&results(CovarianceType::NonRobust)).unwrap();
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rows[0].term, "x");
        assert_relative_eq!(summary.rows[0].coef, 0.8, epsilon = 1e-10);
        assert!(summary.rows[0].lower < 0.8 && summary.rows[0].upper > 0.8);
        assert_relative_eq!(summary.confidence, 0.95);
    }

    #[test]
    fn test_summary_display() {
        let text = ModelSummary::new(&results(CovarianceType::NonRobust))
            .unwrap()
            .to_string();
        assert!(text.contains("WLS Regression Results"));
        assert!(text.contains("Dep. Variable:"));
        assert!(text.contains("poor"));
        assert!(text.contains("nonrobust"));
        assert!(text.contains("[0.025"));
        assert!(text.contains("0.975]"));
        assert!(text.contains("correctly specified"));
    }

    #[test]
    fn test_robust_note() {
        let text = ModelSummary::new(&results(CovarianceType::HC1))
            .unwrap()
            .to_string();
        assert!(text.contains("heteroscedasticity robust (HC1)"));
    }

    #[test]
    fn test_format_bound() {
        assert_eq!(format_bound(0.025), "0.025");
        assert_eq!(format_bound(0.05), "0.05");
        assert_eq!(format_bound(0.975), "0.975");
    }
}
