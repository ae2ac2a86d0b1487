//! Prediction request and response bodies

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};

/// Raw telemetry of one customer
///
/// Field names are the feature names of a one-hot artifact with regions
/// `0..=6`; plan flags and region indicators are 0 or 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictRequest {
    pub account_length: u32,
    pub number_vmail_messages: u32,
    pub total_day_minutes: f64,
    pub total_day_calls: u32,
    pub total_eve_minutes: f64,
    pub total_eve_calls: u32,
    pub total_night_minutes: f64,
    pub total_night_calls: u32,
    pub total_intl_minutes: f64,
    pub total_intl_calls: u32,
    pub customer_service_calls: u32,
    pub international_plan: u8,
    pub voice_mail_plan: u8,
    pub state_0: u8,
    pub state_1: u8,
    pub state_2: u8,
    pub state_3: u8,
    pub state_4: u8,
    pub state_5: u8,
    pub state_6: u8,
}

impl PredictRequest {
    /// Every field, in request order.
    pub const FIELDS: [&'static str; 20] = [
        "account_length",
        "number_vmail_messages",
        "total_day_minutes",
        "total_day_calls",
        "total_eve_minutes",
        "total_eve_calls",
        "total_night_minutes",
        "total_night_calls",
        "total_intl_minutes",
        "total_intl_calls",
        "customer_service_calls",
        "international_plan",
        "voice_mail_plan",
        "state_0",
        "state_1",
        "state_2",
        "state_3",
        "state_4",
        "state_5",
        "state_6",
    ];

    /// Range checks serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let minutes = [
            ("total_day_minutes", self.total_day_minutes),
            ("total_eve_minutes", self.total_eve_minutes),
            ("total_night_minutes", self.total_night_minutes),
            ("total_intl_minutes", self.total_intl_minutes),
        ];
        for (name, v) in minutes {
            if !v.is_finite() || v < 0.0 {
                return Err(ChurnError::RequestValidation(format!(
                    "{} must be a non-negative number, got {}",
                    name, v
                )));
            }
        }

        let flags = [
            ("international_plan", self.international_plan),
            ("voice_mail_plan", self.voice_mail_plan),
            ("state_0", self.state_0),
            ("state_1", self.state_1),
            ("state_2", self.state_2),
            ("state_3", self.state_3),
            ("state_4", self.state_4),
            ("state_5", self.state_5),
            ("state_6", self.state_6),
        ];
        for (name, v) in flags {
            if v > 1 {
                return Err(ChurnError::RequestValidation(format!("{} must be 0 or 1, got {}", name, v)));
            }
        }
        Ok(())
    }

    /// Raw value of a field by feature name.
    pub fn value(&self, feature: &str) -> Option<f64> {
        let v = match feature {
            "account_length" => self.account_length as f64,
            "number_vmail_messages" => self.number_vmail_messages as f64,
            "total_day_minutes" => self.total_day_minutes,
            "total_day_calls" => self.total_day_calls as f64,
            "total_eve_minutes" => self.total_eve_minutes,
            "total_eve_calls" => self.total_eve_calls as f64,
            "total_night_minutes" => self.total_night_minutes,
            "total_night_calls" => self.total_night_calls as f64,
            "total_intl_minutes" => self.total_intl_minutes,
            "total_intl_calls" => self.total_intl_calls as f64,
            "customer_service_calls" => self.customer_service_calls as f64,
            "international_plan" => self.international_plan as f64,
            "voice_mail_plan" => self.voice_mail_plan as f64,
            "state_0" => self.state_0 as f64,
            "state_1" => self.state_1 as f64,
            "state_2" => self.state_2 as f64,
            "state_3" => self.state_3 as f64,
            "state_4" => self.state_4 as f64,
            "state_5" => self.state_5 as f64,
            "state_6" => self.state_6 as f64,
            _ => return None,
        };
        Some(v)
    }
}

/// Predicted outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Churn,
    NoChurn,
}

impl Prediction {
    pub fn from_class(class: f64) -> Self {
        if class >= 0.5 {
            Prediction::Churn
        } else {
            Prediction::NoChurn
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Prediction::Churn => "Customer Will Churn",
            Prediction::NoChurn => "Customer Will Not Churn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        Self {
            prediction: p.label().to_string(),
        }
    }
}
