use shared::domain::PredictionResult;

pub const CONFIDENCE_PLACEHOLDER: &str = "N/A";

/// Display-ready text of a prediction result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResult {
    pub label: String,
    pub confidence: String,
    /// Empty means the top-3 section is not shown at all.
    pub top3: Vec<String>,
}

impl RenderedResult {
    pub fn shows_top3(&self) -> bool {
        !self.top3.is_empty()
    }
}

pub fn render_result(result: &PredictionResult) -> RenderedResult {
    RenderedResult {
        label: result.predicted_label.clone(),
        confidence: result
            .confidence
            .map(format_percent)
            .unwrap_or_else(|| CONFIDENCE_PLACEHOLDER.to_string()),
        top3: result
            .top3
            .iter()
            .map(|item| format!("{} — {}", item.label, format_percent(item.probability)))
            .collect(),
    }
}

pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Short text suitable for an SMS, e.g. `Maize recommended (confidence 92%).`
pub fn summary_text(result: &PredictionResult) -> String {
    match result.confidence {
        Some(confidence) => format!(
            "{} recommended (confidence {}%).",
            result.predicted_label,
            (confidence * 100.0).round() as i64
        ),
        None => format!("{} recommended.", result.predicted_label),
    }
}
