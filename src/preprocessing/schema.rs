//! Column layout of the customer tables
//!
//! Maps raw CSV headers onto stable snake_case feature names and fixes the
//! canonical feature order shared by training and inference.

/// A numeric telemetry column and the feature name it is exposed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericColumn {
    pub column: &'static str,
    pub feature: &'static str,
}

/// Numeric columns, in canonical feature order.
pub const NUMERIC_COLUMNS: [NumericColumn; 11] = [
    NumericColumn { column: "Account length", feature: "account_length" },
    NumericColumn { column: "Number vmail messages", feature: "number_vmail_messages" },
    NumericColumn { column: "Total day minutes", feature: "total_day_minutes" },
    NumericColumn { column: "Total day calls", feature: "total_day_calls" },
    NumericColumn { column: "Total eve minutes", feature: "total_eve_minutes" },
    NumericColumn { column: "Total eve calls", feature: "total_eve_calls" },
    NumericColumn { column: "Total night minutes", feature: "total_night_minutes" },
    NumericColumn { column: "Total night calls", feature: "total_night_calls" },
    NumericColumn { column: "Total intl minutes", feature: "total_intl_minutes" },
    NumericColumn { column: "Total intl calls", feature: "total_intl_calls" },
    NumericColumn { column: "Customer service calls", feature: "customer_service_calls" },
];

/// Binary plan flags, ordinally encoded.
pub const PLAN_COLUMNS: [NumericColumn; 2] = [
    NumericColumn { column: "International plan", feature: "international_plan" },
    NumericColumn { column: "Voice mail plan", feature: "voice_mail_plan" },
];

/// Categorical region code.
pub const REGION_COLUMN: &str = "State";

/// Feature name prefix for the region encoding (`state` or `state_<category>`).
pub const REGION_FEATURE: &str = "state";

/// Label column.
pub const LABEL_COLUMN: &str = "Churn";

/// Charge columns are linear transforms of the minute columns.
pub const REDUNDANT_COLUMNS: [&str; 4] = [
    "Total day charge",
    "Total eve charge",
    "Total night charge",
    "Total intl charge",
];

/// Known columns that carry no predictive value for this model.
pub const IGNORED_COLUMNS: [&str; 1] = ["Area code"];

/// Feature name of a one-hot region indicator.
pub fn region_indicator(category: &str) -> String {
    format!("{}_{}", REGION_FEATURE, category)
}

/// Whether a raw column takes part in preparation at all.
pub fn is_known_column(name: &str) -> bool {
    name == REGION_COLUMN
        || name == LABEL_COLUMN
        || NUMERIC_COLUMNS.iter().any(|c| c.column == name)
        || PLAN_COLUMNS.iter().any(|c| c.column == name)
        || REDUNDANT_COLUMNS.contains(&name)
        || IGNORED_COLUMNS.contains(&name)
}

/// Raw columns that must be present in every input table.
pub fn required_columns() -> Vec<&'static str> {
    NUMERIC_COLUMNS
        .iter()
        .chain(PLAN_COLUMNS.iter())
        .map(|c| c.column)
        .chain([REGION_COLUMN, LABEL_COLUMN])
        .collect()
}
