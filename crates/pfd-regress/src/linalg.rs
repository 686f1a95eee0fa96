//! Dense linear algebra for small symmetric systems.
//!
//! The normal equations of a regression with k regressors form a k × k
//! symmetric positive definite matrix; k is small (a handful of covariates),
//! so straightforward O(k³) routines are used throughout.

use crate::error::{RegressionError, Result};
use ndarray::{Array1, Array2};

/// Relative pivot tolerance below which a matrix is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Cholesky factorisation `A = L Lᵀ` of a symmetric positive definite matrix.
///
/// # Returns
/// * Lower-triangular factor `L`
///
/// # Errors
/// `Singular` when a pivot is not positive relative to the largest diagonal
/// element, which is how perfect collinearity shows up in XᵀWX.
pub fn cholesky(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(RegressionError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let scale = (0..n)
        .map(|i| matrix[[i, i]].abs())
        .fold(0.0_f64, f64::max)
        .max(f64::MIN_POSITIVE);

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = matrix[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !diag.is_finite() || diag <= PIVOT_TOLERANCE * scale {
            return Err(RegressionError::Singular(format!(
                "pivot {} is {:.3e}; regressor {} is collinear with earlier regressors",
                j, diag, j
            )));
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;

        for i in (j + 1)..n {
            let mut sum = matrix[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / pivot;
        }
    }

    Ok(l)
}

/// Solve `L Lᵀ x = b` given the Cholesky factor `L`.
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // Forward substitution: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Back substitution: Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    x
}

/// Inverse of a symmetric positive definite matrix.
pub fn invert_spd(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let l = cholesky(matrix)?;
    let n = l.nrows();
    let mut inverse = Array2::<f64>::zeros((n, n));

    for j in 0..n {
        let mut e = Array1::<f64>::zeros(n);
        e[j] = 1.0;
        inverse.column_mut(j).assign(&cholesky_solve(&l, &e));
    }

    // Symmetrise away rounding noise
    let symmetric = (&inverse + &inverse.t()) / 2.0;
    Ok(symmetric)
}

/// Eigenvalues of a symmetric matrix, sorted in descending order.
///
/// Cyclic Jacobi: each sweep visits every pair `(p, q)` above the diagonal
/// and applies the Givens rotation that zeroes `a[p, q]`. Iteration stops
/// after `max_sweeps` or once the off-diagonal mass falls below
/// `tolerance` relative to the Frobenius norm.
pub fn symmetric_eigenvalues(
    matrix: &Array2<f64>,
    max_sweeps: usize,
    tolerance: f64,
) -> Result<Array1<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(RegressionError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let scale = matrix.iter().map(|v| v * v).sum::<f64>().sqrt().max(f64::MIN_POSITIVE);
    let mut a = matrix.clone();

    for _ in 0..max_sweeps {
        if off_diagonal_norm(&a) <= tolerance * scale {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]] == 0.0 {
                    continue;
                }
                let rotation = givens(n, p, q, &a);
                a = rotation.t().dot(&a).dot(&rotation);
            }
        }
    }

    let mut eigenvalues = a.diag().to_vec();
    eigenvalues.sort_by(|x, y| y.total_cmp(x));
    Ok(Array1::from(eigenvalues))
}

/// Condition number of a design matrix: √(λ_max / λ_min) of XᵀX.
///
/// Returns infinity when the smallest eigenvalue is not positive.
pub fn condition_number(xtx: &Array2<f64>) -> f64 {
    match symmetric_eigenvalues(xtx, 50, 1e-14) {
        Ok(eigenvalues) if !eigenvalues.is_empty() => {
            let max_eig = eigenvalues[0];
            let min_eig = eigenvalues[eigenvalues.len() - 1];
            if min_eig <= 0.0 {
                f64::INFINITY
            } else {
                (max_eig / min_eig).sqrt()
            }
        }
        _ => f64::NAN,
    }
}

fn off_diagonal_norm(a: &Array2<f64>) -> f64 {
    a.indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, v)| v * v)
        .sum::<f64>()
        .sqrt()
}

/// Rotation `J` in the `(p, q)` plane with `(JᵀAJ)[p, q] = 0`.
fn givens(n: usize, p: usize, q: usize, a: &Array2<f64>) -> Array2<f64> {
    let theta = 0.5 * (2.0 * a[[p, q]]).atan2(a[[q, q]] - a[[p, p]]);
    let (sin, cos) = theta.sin_cos();

    let mut rotation = Array2::eye(n);
    rotation[[p, p]] = cos;
    rotation[[q, q]] = cos;
    rotation[[p, q]] = sin;
    rotation[[q, p]] = -sin;
    rotation
}
