//! Parameter covariance estimators.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the covariance of the estimated parameters is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceType {
    /// σ² (XᵀWX)⁻¹, assuming homoskedastic whitened errors.
    #[default]
    NonRobust,
    /// White's heteroskedasticity-consistent sandwich estimator.
    HC0,
    /// HC0 scaled by n / (n - k).
    HC1,
}

impl CovarianceType {
    /// Label used in model summaries.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NonRobust => "nonrobust",
            Self::HC0 => "HC0",
            Self::HC1 => "HC1",
        }
    }

    /// Whether the estimator is heteroskedasticity-robust.
    pub const fn is_robust(&self) -> bool {
        !matches!(self, Self::NonRobust)
    }
}

impl fmt::Display for CovarianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CovarianceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nonrobust" | "none" | "classical" => Ok(Self::NonRobust),
            "hc0" => Ok(Self::HC0),
            "hc1" => Ok(Self::HC1),
            other => Err(format!(
                "Unknown covariance type: {} (expected nonrobust, hc0 or hc1)",
                other
            )),
        }
    }
}

/// Parameter covariance matrix.
///
/// # Arguments
/// * `cov_type` - Estimator to use
/// * `xtx_inv` - (XᵀWX)⁻¹
/// * `wx` - Whitened regressors √w · X (n × k)
/// * `wresid` - Whitened residuals √w · (y - Xβ)
/// * `scale` - SSR / df_resid
/// * `df_resid` - Residual degrees of freedom
pub fn parameter_covariance(
    cov_type: CovarianceType,
    xtx_inv: &Array2<f64>,
    wx: &Array2<f64>,
    wresid: &Array1<f64>,
    scale: f64,
    df_resid: f64,
) -> Array2<f64> {
    match cov_type {
        CovarianceType::NonRobust => xtx_inv * scale,
        CovarianceType::HC0 => sandwich(xtx_inv, wx, wresid),
        CovarianceType::HC1 => {
            let nobs = wresid.len() as f64;
            sandwich(xtx_inv, wx, wresid) * (nobs / df_resid)
        }
    }
}

/// (XᵀWX)⁻¹ [Σ eᵢ² xᵢ xᵢᵀ] (XᵀWX)⁻¹ on whitened data.
fn sandwich(xtx_inv: &Array2<f64>, wx: &Array2<f64>, wresid: &Array1<f64>) -> Array2<f64> {
    let k = wx.ncols();
    let mut meat = Array2::<f64>::zeros((k, k));

    for (row, e) in wx.rows().into_iter().zip(wresid.iter()) {
        let e2 = e * e;
        for i in 0..k {
            for j in 0..k {
                meat[[i, j]] += e2 * row[i] * row[j];
            }
        }
    }

    xtx_inv.dot(&meat).dot(xtx_inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rstest::rstest;

    #[rstest]
    #[case("nonrobust", CovarianceType::NonRobust)]
    #[case("HC0", CovarianceType::HC0)]
    #[case("hc1", CovarianceType::HC1)]
    fn test_parse(#[case] input: &str, #[case] expected: CovarianceType) {
        assert_eq!(input.parse::<CovarianceType>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        assert!("hc3".parse::<CovarianceType>().is_err());
    }

    #[test]
    fn test_hc1_scales_hc0() {
        let xtx_inv = array![[0.5, 0.0], [0.0, 0.25]];
        let wx = array![[1.0, 1.0], [1.0, 2.0], [1.0, 3.0], [1.0, 4.0]];
        let wresid = array![0.1, -0.2, 0.3, -0.1];

        let hc0 = parameter_covariance(CovarianceType::HC0, &xtx_inv, &wx, &wresid, 1.0, 2.0);
        let hc1 = parameter_covariance(CovarianceType::HC1, &xtx_inv, &wx, &wresid, 1.0, 2.0);

        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(hc1[[i, j]], hc0[[i, j]] * 2.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_nonrobust_is_scaled_inverse() {
        let xtx_inv = array![[0.5, 0.1], [0.1, 0.25]];
        let wx = Array2::<f64>::zeros((3, 2));
        let wresid = Array1::<f64>::zeros(3);

        let cov =
            parameter_covariance(CovarianceType::NonRobust, &xtx_inv, &wx, &wresid, 2.0, 1.0);
        assert_relative_eq!(cov[[0, 1]], 0.2);
        assert_relative_eq!(cov[[1, 1]], 0.5);
    }
}
