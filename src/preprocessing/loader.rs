//! Table loading and column extraction

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Load a delimited table with a header row.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ChurnError::DataError(format!(
            "input file not found: {}",
            path.display()
        )));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| ChurnError::DataError(format!("{}: {}", path.display(), e)))?
        .finish()
        .map_err(|e| ChurnError::DataError(format!("{}: {}", path.display(), e)))?;

    debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded table");
    Ok(df)
}

/// Column names of a frame, in file order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| ChurnError::DataError(format!("missing column '{}'", name)))
}

/// Read a column as nullable floats.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let s = series(df, name)?;
    let cast = s
        .cast(&DataType::Float64)
        .map_err(|e| ChurnError::DataError(format!("column '{}' is not numeric: {}", name, e)))?;
    // A failed non-strict cast turns a value into null; compare null counts to catch it.
    if cast.null_count() > s.null_count() {
        return Err(ChurnError::DataError(format!(
            "column '{}' contains non-numeric values",
            name
        )));
    }
    let values: Vec<Option<f64>> = cast.f64()?.into_iter().collect();
    if let Some((row, v)) = values
        .iter()
        .enumerate()
        .find_map(|(i, v)| v.filter(|x| !x.is_finite()).map(|x| (i, x)))
    {
        return Err(ChurnError::DataError(format!(
            "column '{}' has non-finite value {} at row {}",
            name, v, row
        )));
    }
    Ok(values)
}

/// Read a column as nullable strings. Integer codes become their decimal form.
pub fn categorical_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let s = series(df, name)?;
    let cast = s.cast(&DataType::String)?;
    let ca = cast.str()?;
    Ok(ca.into_iter().map(|v| v.map(|x| x.trim().to_string())).collect())
}

/// Read the label column as 0/1 values.
///
/// Booleans, `True`/`False`, `Yes`/`No` and numeric 0/1 are accepted.
pub fn label_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let s = series(df, name)?;

    let raw: Vec<Option<f64>> = match s.dtype() {
        DataType::Boolean => s
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
            .collect(),
        DataType::String => s
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_label_text))
            .collect(),
        _ => s.cast(&DataType::Float64)?.f64()?.into_iter().collect(),
    };

    raw.into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(x) if x == 0.0 || x == 1.0 => Ok(x),
            Some(x) => Err(ChurnError::DataError(format!(
                "label '{}' must be binary, row {} has {}",
                name, row, x
            ))),
            None => Err(ChurnError::DataError(format!(
                "label '{}' missing or unparseable at row {}",
                name, row
            ))),
        })
        .collect()
}

fn parse_label_text(text: &str) -> Option<f64> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "1.0" => Some(1.0),
        "false" | "no" | "0" | "0.0" => Some(0.0),
        _ => None,
    }
}
