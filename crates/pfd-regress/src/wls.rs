//! Weighted least squares estimation.
//!
//! Observations are whitened by √wᵢ and the normal equations are solved by
//! Cholesky factorisation. Summary statistics follow the usual survey-WLS
//! conventions: the total sum of squares is weighted and centred on the
//! weighted mean when the model has a constant, uncentred otherwise.

use crate::covariance::{CovarianceType, parameter_covariance};
use crate::design::DesignMatrix;
use crate::error::{RegressionError, Result};
use crate::inference::{f_pvalue, t_critical, t_pvalue};
use crate::linalg::{cholesky, cholesky_solve, condition_number, invert_spd};
use ndarray::{Array1, Array2, Axis};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Weighted least squares model, ready to fit.
#[derive(Debug, Clone)]
pub struct Wls {
    design: DesignMatrix,
}

/// One estimated coefficient with its inference statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    /// Regressor name
    pub name: String,
    /// Point estimate
    pub estimate: f64,
    /// Standard error
    pub std_error: f64,
    /// t statistic
    pub t_value: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// Fitted WLS model.
#[derive(Debug, Clone)]
pub struct WlsResults {
    /// Regressor names in column order
    pub names: Vec<String>,
    /// Outcome variable name
    pub outcome: String,
    /// Estimated coefficients
    pub params: Array1<f64>,
    /// Standard errors
    pub bse: Array1<f64>,
    /// t statistics
    pub tvalues: Array1<f64>,
    /// Two-sided p-values from Student's t with `df_resid` degrees of freedom
    pub pvalues: Array1<f64>,
    /// Fitted values Xβ
    pub fittedvalues: Array1<f64>,
    /// Unweighted residuals y - Xβ
    pub resid: Array1<f64>,
    /// Number of observations
    pub nobs: usize,
    /// Model degrees of freedom (k minus the constant)
    pub df_model: f64,
    /// Residual degrees of freedom (n - k)
    pub df_resid: f64,
    /// 1 when a regressor is constant and non-zero
    pub k_constant: usize,
    /// Name of the constant regressor, if any
    pub constant: Option<String>,
    /// Weighted sum of squared residuals
    pub ssr: f64,
    /// SSR / df_resid
    pub scale: f64,
    /// √scale
    pub resid_std_err: f64,
    /// Weighted total sum of squares (centred iff the model has a constant)
    pub centered_tss: f64,
    /// Explained sum of squares
    pub ess: f64,
    /// Coefficient of determination
    pub rsquared: f64,
    /// Adjusted R²
    pub rsquared_adj: f64,
    /// F statistic for all non-constant coefficients being zero
    pub fvalue: f64,
    /// p-value of the F statistic
    pub f_pvalue: f64,
    /// Gaussian log-likelihood
    pub llf: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Parameter covariance matrix
    pub cov_params: Array2<f64>,
    /// Covariance estimator used
    pub cov_type: CovarianceType,
    /// Condition number of the whitened design
    pub condition_number: f64,
}

impl Wls {
    /// Wrap a design matrix. Nothing is computed until [`Wls::fit`].
    pub const fn new(design: DesignMatrix) -> Self {
        Self { design }
    }

    /// The underlying design.
    pub const fn design(&self) -> &DesignMatrix {
        &self.design
    }

    /// Fit with the classical (non-robust) covariance.
    pub fn fit(&self) -> Result<WlsResults> {
        self.fit_with(CovarianceType::NonRobust)
    }

    /// Fit with the given covariance estimator.
    ///
    /// # Errors
    /// * `InsufficientData` when there are not more observations than regressors
    /// * `Singular` when XᵀWX is not positive definite (collinear regressors)
    pub fn fit_with(&self, cov_type: CovarianceType) -> Result<WlsResults> {
        let design = &self.design;
        let n = design.nobs();
        let k = design.k();

        if n <= k {
            return Err(RegressionError::InsufficientData {
                required: k + 1,
                actual: n,
            });
        }

        debug!(
            outcome = design.outcome(),
            nobs = n,
            k,
            cov_type = %cov_type,
            "fitting WLS"
        );

        let x = design.x();
        let y = design.y();
        let w = design.weights();

        // Whitened data
        let sw = w.mapv(f64::sqrt);
        let wx = x * &sw.view().insert_axis(Axis(1));
        let wy = y * &sw;

        let xtwx = wx.t().dot(&wx);
        let xtwy = wx.t().dot(&wy);

        let l = cholesky(&xtwx)?;
        let params = cholesky_solve(&l, &xtwy);
        let xtwx_inv = invert_spd(&xtwx)?;

        let fittedvalues = x.dot(&params);
        let resid = y - &fittedvalues;
        let wresid = &resid * &sw;
        let ssr = wresid.dot(&wresid);

        let constant = design.constant_index();
        let k_constant = usize::from(constant.is_some());
        let df_resid = (n - k) as f64;
        let df_model = (k - k_constant) as f64;
        let scale = ssr / df_resid;

        let centered_tss = if k_constant == 1 {
            let ybar = weighted_mean(y, w);
            y.iter()
                .zip(w.iter())
                .map(|(yi, wi)| wi * (yi - ybar).powi(2))
                .sum::<f64>()
        } else {
            wy.dot(&wy)
        };
        let ess = centered_tss - ssr;
        let rsquared = 1.0 - ssr / centered_tss;
        let rsquared_adj = 1.0 - (n - k_constant) as f64 / df_resid * (1.0 - rsquared);

        let cov_params = parameter_covariance(cov_type, &xtwx_inv, &wx, &wresid, scale, df_resid);
        let bse = cov_params.diag().mapv(f64::sqrt);
        let tvalues = &params / &bse;
        let pvalues = tvalues
            .iter()
            .map(|&t| t_pvalue(t, df_resid))
            .collect::<Result<Array1<f64>>>()?;

        let fvalue = if df_model <= 0.0 {
            f64::NAN
        } else if cov_type.is_robust() {
            wald_f(&params, &cov_params, constant)
        } else {
            (ess / df_model) / scale
        };
        let f_pvalue = f_pvalue(fvalue, df_model, df_resid)?;

        let nobs2 = n as f64 / 2.0;
        let log_weights: f64 = w.iter().filter(|&&wi| wi > 0.0).map(|wi| wi.ln()).sum();
        let llf = -ssr.ln() * nobs2 - (1.0 + (PI / nobs2).ln()) * nobs2 + 0.5 * log_weights;
        let n_params = df_model + k_constant as f64;
        let aic = -2.0 * llf + 2.0 * n_params;
        let bic = -2.0 * llf + (n as f64).ln() * n_params;

        info!(
            outcome = design.outcome(),
            nobs = n,
            rsquared,
            "WLS fit complete"
        );

        Ok(WlsResults {
            names: design.names().to_vec(),
            outcome: design.outcome().to_string(),
            params,
            bse,
            tvalues,
            pvalues,
            fittedvalues,
            resid,
            nobs: n,
            df_model,
            df_resid,
            k_constant,
            constant: constant.map(|i| design.names()[i].clone()),
            ssr,
            scale,
            resid_std_err: scale.sqrt(),
            centered_tss,
            ess,
            rsquared,
            rsquared_adj,
            fvalue,
            f_pvalue,
            llf,
            aic,
            bic,
            cov_params,
            cov_type,
            condition_number: condition_number(&xtwx),
        })
    }
}

impl WlsResults {
    /// Column index of a regressor.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Coefficient of a regressor by name.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.params[i])
    }

    /// Coefficient with its inference statistics.
    pub fn term(&self, name: &str) -> Option<Term> {
        self.index_of(name).map(|i| self.term_at(i))
    }

    /// All coefficients in column order.
    pub fn terms(&self) -> Vec<Term> {
        (0..self.names.len()).map(|i| self.term_at(i)).collect()
    }

    fn term_at(&self, i: usize) -> Term {
        Term {
            name: self.names[i].clone(),
            estimate: self.params[i],
            std_error: self.bse[i],
            t_value: self.tvalues[i],
            p_value: self.pvalues[i],
        }
    }

    /// Confidence intervals `(lower, upper)` at level `1 - alpha`.
    pub fn conf_int(&self, alpha: f64) -> Result<Vec<(f64, f64)>> {
        let q = t_critical(alpha, self.df_resid)?;
        Ok(self
            .params
            .iter()
            .zip(self.bse.iter())
            .map(|(b, se)| (b - q * se, b + q * se))
            .collect())
    }

    /// Whether the model includes a constant regressor.
    pub const fn has_constant(&self) -> bool {
        self.k_constant == 1
    }
}

fn weighted_mean(values: &Array1<f64>, weights: &Array1<f64>) -> f64 {
    let total: f64 = weights.sum();
    values.dot(weights) / total
}

/// Wald F statistic that every coefficient except the constant is zero.
fn wald_f(params: &Array1<f64>, cov: &Array2<f64>, constant: Option<usize>) -> f64 {
    let tested: Vec<usize> = (0..params.len()).filter(|&i| Some(i) != constant).collect();
    let q = tested.len();

    let r_beta = Array1::from_iter(tested.iter().map(|&i| params[i]));
    let r_cov = Array2::from_shape_fn((q, q), |(a, b)| cov[[tested[a], tested[b]]]);

    match invert_spd(&r_cov) {
        Ok(inv) => r_beta.dot(&inv.dot(&r_beta)) / q as f64,
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn simple_design(weights: Array1<f64>) -> DesignMatrix {
        DesignMatrix::new(
            "y",
            array![1.0, 3.0, 2.0, 5.0, 4.0],
            vec!["x".to_string(), "const".to_string()],
            array![[1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [4.0, 1.0], [5.0, 1.0]],
            weights,
        )
        .unwrap()
    }

    #[test]
    fn test_unit_weights_match_ols() {
        let res = Wls::new(simple_design(Array1::ones(5))).fit().unwrap();

        assert_relative_eq!(res.params[0], 0.8, epsilon = 1e-10);
        assert_relative_eq!(res.params[1], 0.6, epsilon = 1e-10);
        assert_relative_eq!(res.ssr, 3.6, epsilon = 1e-10);
        assert_relative_eq!(res.centered_tss, 10.0, epsilon = 1e-10);
        assert_relative_eq!(res.rsquared, 0.64, epsilon = 1e-10);
        assert_relative_eq!(res.rsquared_adj, 0.52, epsilon = 1e-10);
        assert_relative_eq!(res.bse[0], 0.12_f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(res.bse[1], 1.32_f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(res.fvalue, 16.0 / 3.0, epsilon = 1e-10);
        assert_eq!(res.k_constant, 1);
        assert_eq!(res.df_model, 1.0);
        assert_eq!(res.df_resid, 3.0);
    }

    #[test]
    fn test_f_equals_t_squared_single_regressor() {
        let res = Wls::new(simple_design(Array1::ones(5))).fit().unwrap();
        assert_relative_eq!(res.fvalue, res.tvalues[0].powi(2), epsilon = 1e-10);
        assert_relative_eq!(res.f_pvalue, res.pvalues[0], epsilon = 1e-8);
    }

    #[test]
    fn test_insufficient_data() {
        let design = DesignMatrix::new(
            "y",
            array![1.0, 2.0],
            vec!["a".to_string(), "b".to_string()],
            array![[1.0, 0.0], [0.0, 1.0]],
            array![1.0, 1.0],
        )
        .unwrap();
        assert!(matches!(
            Wls::new(design).fit(),
            Err(RegressionError::InsufficientData {
                required: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_term_lookup() {
        let res = Wls::new(simple_design(Array1::ones(5))).fit().unwrap();
        let term = res.term("x").unwrap();
        assert_relative_eq!(term.estimate, 0.8, epsilon = 1e-10);
        assert_eq!(res.terms().len(), 2);
        assert!(res.param("missing").is_none());
    }
}
