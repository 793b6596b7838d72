use serde::{Deserialize, Serialize};

use crate::{
    domain::{PredictionResult, RankedLabel},
    error::PayloadError,
};

pub const FEATURE_NAMES_PATH: &str = "/feature-names";
pub const PREDICT_PATH: &str = "/predict";
pub const STATUS_PATH: &str = "/status";

/// Body of `GET /feature-names`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureNamesResponse {
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedLabelPayload {
    pub label: String,
    pub prob: f64,
}

/// Success body of `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_label_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top3: Option<Vec<RankedLabelPayload>>,
}

impl TryFrom<PredictResponse> for PredictionResult {
    type Error = PayloadError;

    fn try_from(value: PredictResponse) -> Result<Self, Self::Error> {
        if value.predicted_label.trim().is_empty() {
            return Err(PayloadError::EmptyLabel);
        }
        let top3 = value
            .top3
            .unwrap_or_default()
            .into_iter()
            .take(3)
            .map(|item| RankedLabel {
                label: item.label,
                probability: item.prob,
            })
            .collect();
        Ok(PredictionResult {
            predicted_label: value.predicted_label,
            predicted_label_index: value.predicted_label_index,
            confidence: value.confidence,
            top3,
        })
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub scaler_loaded: bool,
    #[serde(default)]
    pub label_encoder_loaded: bool,
    #[serde(default)]
    pub feature_names_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<u32>,
}

impl ServiceStatus {
    /// The service answers `/predict` only once every artifact is loaded.
    pub fn ready_for_predictions(&self) -> bool {
        self.model_loaded && self.scaler_loaded && self.label_encoder_loaded
    }
}
