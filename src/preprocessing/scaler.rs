//! Min-max feature scaling

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};

/// Fitted bounds of one column: `(x - center) / scale`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Column minimum
    pub center: f64,
    /// Column range, 1.0 for constant columns
    pub scale: f64,
}

impl ScalerParams {
    fn fit(values: &[f64]) -> Self {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if !min.is_finite() || !max.is_finite() {
            return Self { center: 0.0, scale: 1.0 };
        }
        let range = max - min;
        Self {
            center: min,
            scale: if range == 0.0 { 1.0 } else { range },
        }
    }

    #[inline]
    pub fn apply(&self, v: f64) -> f64 {
        (v - self.center) / self.scale
    }

    #[inline]
    pub fn invert(&self, v: f64) -> f64 {
        v * self.scale + self.center
    }
}

/// Min-max scaler over named columns, fitted once on the training table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    columns: Vec<(String, ScalerParams)>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit bounds for `name` and return the scaled column.
    pub fn fit_column(&mut self, name: &str, values: &[f64]) -> Vec<f64> {
        let params = ScalerParams::fit(values);
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some((_, p)) => *p = params,
            None => self.columns.push((name.to_string(), params)),
        }
        values.iter().map(|&v| params.apply(v)).collect()
    }

    /// Scale a column with previously fitted bounds.
    pub fn transform_column(&self, name: &str, values: &[f64]) -> Result<Vec<f64>> {
        let params = self.params(name)?;
        Ok(values.iter().map(|&v| params.apply(v)).collect())
    }

    /// Scale a single value.
    pub fn transform_value(&self, name: &str, v: f64) -> Result<f64> {
        Ok(self.params(name)?.apply(v))
    }

    pub fn params(&self, name: &str) -> Result<ScalerParams> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| *p)
            .ok_or_else(|| ChurnError::DataError(format!("scaler has no bounds for '{}'", name)))
    }

    pub fn is_fitted(&self) -> bool {
        !self.columns.is_empty()
    }
}
