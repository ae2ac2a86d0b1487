//! Data preprocessing module
//!
//! Prepares the customer tables for training and inference:
//! - Mean imputation of missing numeric values, per table
//! - Ordinal encoding of plan flags, one-hot or ordinal encoding of the region
//! - Min-max scaling with bounds fitted on the training table
//! - A fixed, canonical feature order

mod config;
mod encoder;
mod imputer;
pub mod loader;
mod preparer;
mod scaler;
pub mod schema;

pub use config::PreprocessingConfig;
pub use encoder::{CategoryMapping, RegionEncoding};
pub use imputer::{column_mean, fill_mean};
pub use preparer::{DataPreparer, FittedPreprocessing, PreparedData};
pub use scaler::{MinMaxScaler, ScalerParams};
