//! Model data: outcome, regressors and weights.

use crate::error::{RegressionError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Outcome vector, regressor matrix and survey weights for one model.
///
/// Regressors are used exactly as given: no intercept is added implicitly,
/// so a constant column must be present in the input to estimate one.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    outcome: String,
    names: Vec<String>,
    y: Array1<f64>,
    x: Array2<f64>,
    weights: Array1<f64>,
}

impl DesignMatrix {
    /// Build from arrays.
    ///
    /// # Errors
    /// Shape mismatches, non-finite values, negative weights and an empty
    /// regressor list are rejected.
    pub fn new(
        outcome: impl Into<String>,
        y: Array1<f64>,
        names: Vec<String>,
        x: Array2<f64>,
        weights: Array1<f64>,
    ) -> Result<Self> {
        let outcome = outcome.into();

        if names.is_empty() {
            return Err(RegressionError::NoRegressors);
        }
        if x.ncols() != names.len() {
            return Err(RegressionError::DimensionMismatch {
                expected: names.len(),
                actual: x.ncols(),
            });
        }
        for len in [x.nrows(), weights.len()] {
            if len != y.len() {
                return Err(RegressionError::DimensionMismatch {
                    expected: y.len(),
                    actual: len,
                });
            }
        }

        check_finite(&outcome, y.iter())?;
        for (j, name) in names.iter().enumerate() {
            check_finite(name, x.column(j).iter())?;
        }
        check_finite("weights", weights.iter())?;

        if let Some((row, &value)) = weights.iter().enumerate().find(|(_, w)| **w < 0.0) {
            return Err(RegressionError::InvalidWeight { row, value });
        }

        Ok(Self {
            outcome,
            names,
            y,
            x,
            weights,
        })
    }

    /// Build from columns of a DataFrame.
    ///
    /// Regressors keep the order of `regressors`. Boolean columns are
    /// rejected with [`RegressionError::NonNumericRegressor`]; cast flags to
    /// 0/1 first.
    pub fn from_frame(
        df: &DataFrame,
        outcome: &str,
        regressors: &[&str],
        weights: &str,
    ) -> Result<Self> {
        if regressors.is_empty() {
            return Err(RegressionError::NoRegressors);
        }

        let y = numeric_column(df, outcome)?;
        let w = numeric_column(df, weights)?;

        let mut x = Array2::<f64>::zeros((df.height(), regressors.len()));
        for (j, name) in regressors.iter().enumerate() {
            x.column_mut(j).assign(&numeric_column(df, name)?);
        }

        Self::new(
            outcome,
            y,
            regressors.iter().map(|s| s.to_string()).collect(),
            x,
            w,
        )
    }

    /// Outcome variable name.
    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    /// Regressor names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Outcome values.
    pub const fn y(&self) -> &Array1<f64> {
        &self.y
    }

    /// Regressor matrix (n × k).
    pub const fn x(&self) -> &Array2<f64> {
        &self.x
    }

    /// Survey weights.
    pub const fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Number of observations.
    pub fn nobs(&self) -> usize {
        self.y.len()
    }

    /// Number of regressors.
    pub fn k(&self) -> usize {
        self.names.len()
    }

    /// Index of the first column that is constant and non-zero.
    pub fn constant_index(&self) -> Option<usize> {
        if self.nobs() == 0 {
            return None;
        }
        (0..self.k()).find(|&j| {
            let column = self.x.column(j);
            let first = column[0];
            first != 0.0 && column.iter().all(|&v| v == first)
        })
    }
}

fn check_finite<'a>(name: &str, values: impl Iterator<Item = &'a f64>) -> Result<()> {
    let count = values.filter(|v| !v.is_finite()).count();
    if count > 0 {
        return Err(RegressionError::MissingValues {
            column: name.to_string(),
            count,
        });
    }
    Ok(())
}

/// Extract a strictly numeric column. Booleans and strings are rejected
/// rather than coerced.
fn numeric_column(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    let column = df
        .column(name)
        .map_err(|_| RegressionError::MissingColumn(name.to_string()))?;

    let dtype = column.dtype();
    if !(dtype.is_float() || dtype.is_integer()) {
        return Err(RegressionError::NonNumericRegressor {
            column: name.to_string(),
            dtype: dtype.to_string(),
        });
    }

    let cast = column.cast(&DataType::Float64)?;
    let values = cast.f64()?;
    if values.null_count() > 0 {
        return Err(RegressionError::MissingValues {
            column: name.to_string(),
            count: values.null_count(),
        });
    }

    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
