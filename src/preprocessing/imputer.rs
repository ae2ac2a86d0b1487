//! Missing value imputation

/// Arithmetic mean of the present values, or `None` when all are missing.
pub fn column_mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Fill missing values with the mean of the same column.
///
/// The mean is taken from `values` itself, so each table is imputed from its
/// own statistics. A column with no present value is filled with 0.
pub fn fill_mean(values: &[Option<f64>]) -> Vec<f64> {
    let mean = column_mean(values).unwrap_or(0.0);
    values.iter().map(|v| v.unwrap_or(mean)).collect()
}
