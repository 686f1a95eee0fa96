//! Sampling distributions for test statistics.

use crate::error::{RegressionError, Result};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

fn students_t(df: f64) -> Result<StudentsT> {
    StudentsT::new(0.0, 1.0, df)
        .map_err(|e| RegressionError::Distribution(format!("t({}): {}", df, e)))
}

/// Two-sided p-value of a t statistic.
pub fn t_pvalue(t: f64, df: f64) -> Result<f64> {
    if t.is_nan() {
        return Ok(f64::NAN);
    }
    Ok(2.0 * students_t(df)?.sf(t.abs()))
}

/// Critical value `t` with P(|T| > t) = `alpha`.
pub fn t_critical(alpha: f64, df: f64) -> Result<f64> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(RegressionError::Distribution(format!(
            "alpha must be in (0, 1), got {}",
            alpha
        )));
    }
    Ok(students_t(df)?.inverse_cdf(1.0 - alpha / 2.0))
}

/// Upper-tail p-value of an F statistic.
pub fn f_pvalue(f: f64, df_num: f64, df_den: f64) -> Result<f64> {
    if f.is_nan() || df_num <= 0.0 {
        return Ok(f64::NAN);
    }
    let dist = FisherSnedecor::new(df_num, df_den).map_err(|e| {
        RegressionError::Distribution(format!("F({}, {}): {}", df_num, df_den, e))
    })?;
    Ok(dist.sf(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_t_critical_known_values() {
        assert_relative_eq!(t_critical(0.05, 3.0).unwrap(), 3.182446, epsilon = 1e-5);
        assert_relative_eq!(t_critical(0.05, 1e6).unwrap(), 1.959966, epsilon = 1e-4);
    }

    #[test]
    fn test_t_pvalue_symmetric() {
        let p_pos = t_pvalue(2.0, 10.0).unwrap();
        let p_neg = t_pvalue(-2.0, 10.0).unwrap();
        assert_relative_eq!(p_pos, p_neg);
        assert_relative_eq!(p_pos, 0.073388, epsilon = 1e-5);
        assert_relative_eq!(t_pvalue(0.0, 10.0).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_f_matches_squared_t() {
        // With one numerator degree of freedom, F = t².
        let p_t = t_pvalue(2.5, 12.0).unwrap();
        let p_f = f_pvalue(6.25, 1.0, 12.0).unwrap();
        assert_relative_eq!(p_t, p_f, epsilon = 1e-8);
    }

    #[test]
    fn test_invalid_alpha() {
        assert!(t_critical(0.0, 5.0).is_err());
        assert!(t_critical(1.5, 5.0).is_err());
    }
}
