//! List and vector basics: indexing, element-wise maps and aggregation.

use ndarray::Array1;

/// Element `index` of `list`, or `None` when out of range.
pub fn element<T: Copy>(list: &[T], index: usize) -> Option<T> {
    list.get(index).copied()
}

/// Every element doubled.
pub fn doubled(list: &[i64]) -> Vec<i64> {
    list.iter().map(|x| x * 2).collect()
}

/// Element-wise eˣ.
pub fn exp(values: &[f64]) -> Array1<f64> {
    Array1::from(values.to_vec()).mapv(f64::exp)
}

/// Σ eˣ.
pub fn exp_sum(values: &[f64]) -> f64 {
    exp(values).sum()
}

/// Value after `periods` years of investing 1 per year at `rate`, each
/// contribution compounding from the year it is made: Σₜ (1 + rate)ᵗ for
/// t = 1..=periods.
pub fn compound_growth(rate: f64, periods: u32) -> f64 {
    let exponents = Array1::range(1.0, f64::from(periods) + 1.0, 1.0);
    exponents.mapv(|t| (1.0 + rate).powf(t)).sum()
}

/// The same total, one term at a time.
pub fn compound_growth_loop(rate: f64, periods: u32) -> f64 {
    (1..=periods).map(|t| (1.0 + rate).powi(t as i32)).sum()
}
