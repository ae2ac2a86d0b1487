//! Preprocessing configuration

use super::RegionEncoding;
use serde::{Deserialize, Serialize};

/// Configuration for data preparation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// How the region code is encoded
    pub region_encoding: RegionEncoding,

    /// Required number of distinct training regions, if any
    pub expected_regions: Option<usize>,

    /// Reject rows with negative numeric telemetry
    pub reject_negative: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            region_encoding: RegionEncoding::OneHot,
            expected_regions: None,
            reject_negative: true,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the region encoding
    pub fn with_region_encoding(mut self, encoding: RegionEncoding) -> Self {
        self.region_encoding = encoding;
        self
    }

    /// Builder method to require a fixed number of region categories
    pub fn with_expected_regions(mut self, n: usize) -> Self {
        self.expected_regions = Some(n);
        self
    }
}
