//! Categorical encoding implementations

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How the region code is turned into features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionEncoding {
    /// One indicator column per training category (`state_<category>`)
    #[default]
    OneHot,
    /// A single integer-coded column (`state`)
    Ordinal,
}

impl std::str::FromStr for RegionEncoding {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onehot" | "one-hot" | "one_hot" => Ok(RegionEncoding::OneHot),
            "ordinal" => Ok(RegionEncoding::Ordinal),
            other => Err(ChurnError::InvalidParameter {
                name: "region_encoding".to_string(),
                value: other.to_string(),
                reason: "expected 'onehot' or 'ordinal'".to_string(),
            }),
        }
    }
}

/// Fitted category set of one column.
///
/// Categories are kept sorted, so the integer code of a category depends only
/// on the set of values seen during fit and never on row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMapping {
    column: String,
    categories: Vec<String>,
}

impl CategoryMapping {
    /// Fit on the training values of `column`. Missing values are rejected.
    pub fn fit(column: &str, values: &[Option<String>]) -> Result<Self> {
        let mut set = BTreeSet::new();
        for (row, v) in values.iter().enumerate() {
            match v {
                Some(s) => {
                    set.insert(s.clone());
                }
                None => {
                    return Err(ChurnError::DataError(format!(
                        "missing categorical value in column '{}' at row {}",
                        column, row
                    )))
                }
            }
        }

        if set.is_empty() {
            return Err(ChurnError::DataError(format!(
                "column '{}' has no categories to fit",
                column
            )));
        }

        Ok(Self {
            column: column.to_string(),
            categories: set.into_iter().collect(),
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Integer code of a category.
    pub fn code(&self, category: &str) -> Result<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(category))
            .map_err(|_| ChurnError::EncodingError {
                column: self.column.clone(),
                category: category.to_string(),
            })
    }

    /// Ordinally encode a whole column.
    pub fn encode_ordinal(&self, values: &[Option<String>]) -> Result<Vec<f64>> {
        values
            .iter()
            .enumerate()
            .map(|(row, v)| {
                let v = v.as_deref().ok_or_else(|| {
                    ChurnError::DataError(format!(
                        "missing categorical value in column '{}' at row {}",
                        self.column, row
                    ))
                })?;
                self.code(v).map(|c| c as f64)
            })
            .collect()
    }

    /// One-hot encode a whole column into `len()` indicator columns.
    pub fn encode_onehot(&self, values: &[Option<String>]) -> Result<Vec<Vec<f64>>> {
        let codes = self.encode_ordinal(values)?;
        Ok((0..self.categories.len())
            .map(|k| {
                codes
                    .iter()
                    .map(|&c| if c as usize == k { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }
}
