use std::{collections::BTreeMap, fmt};

use serde::{
    ser::{SerializeMap, Serializer},
    Deserialize, Serialize,
};

use crate::error::SchemaError;

/// Feature list the prediction service was trained on. Used whenever the
/// service cannot tell us its own list.
pub const FALLBACK_FEATURE_NAMES: [&str; 14] = [
    "Ph",
    "K",
    "P",
    "N",
    "Zn",
    "S",
    "QV2M-W",
    "QV2M-Sp",
    "QV2M-Su",
    "QV2M-Au",
    "T2M_MIN-W",
    "T2M_MIN-Sp",
    "WD10M",
    "PRECTOTCORR-W",
];

/// Number of history entries kept in `pred_history`.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureName(String);

impl FeatureName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FeatureName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FeatureName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    Remote,
    Fallback,
}

/// Ordered, non-empty list of feature names driving the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<FeatureName>,
}

impl FeatureSchema {
    /// Builds a schema, keeping source order. Later duplicates are dropped.
    pub fn new<I, N>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = N>,
        N: Into<FeatureName>,
    {
        let mut ordered: Vec<FeatureName> = Vec::new();
        for name in names {
            let name = name.into();
            // Blank entries carry no field; a list of only blanks is empty.
            if name.as_str().trim().is_empty() {
                continue;
            }
            if !ordered.contains(&name) {
                ordered.push(name);
            }
        }
        if ordered.is_empty() {
            return Err(SchemaError::Empty);
        }
        Ok(Self { names: ordered })
    }

    pub fn fallback() -> Self {
        Self {
            names: FALLBACK_FEATURE_NAMES
                .iter()
                .map(|name| FeatureName::from(*name))
                .collect(),
        }
    }

    pub fn names(&self) -> &[FeatureName] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Fully numeric payload for `POST /predict`. Serializes as a JSON object in
/// schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    values: Vec<(FeatureName, f64)>,
}

impl PredictionRequest {
    pub(crate) fn from_ordered(values: Vec<(FeatureName, f64)>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(candidate, _)| candidate.as_str() == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureName, f64)> {
        self.values.iter().map(|(name, value)| (name, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_last_inputs(&self) -> LastInputs {
        self.values.iter().cloned().collect()
    }
}

impl Serialize for PredictionRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Builder used by form validation; the only way to obtain a request outside
/// this crate is through a fully parsed set of values.
#[derive(Debug, Default)]
pub struct PredictionRequestBuilder {
    values: Vec<(FeatureName, f64)>,
}

impl PredictionRequestBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: FeatureName, value: f64) {
        self.values.push((name, value));
    }

    pub fn build(self) -> PredictionRequest {
        PredictionRequest::from_ordered(self.values)
    }
}

/// Last submitted values, keyed by feature name.
pub type LastInputs = BTreeMap<FeatureName, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    pub label: String,
    #[serde(rename = "prob")]
    pub probability: f64,
}

/// Structured recommendation. Serialized in the service's wire shape so that
/// history entries read the same as the responses they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_label_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub top3: Vec<RankedLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub result: PredictionResult,
}

impl HistoryEntry {
    pub fn recorded_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.ts)
    }
}

/// Puts `entry` at the front and keeps the newest `limit` entries.
pub fn push_history(history: &mut Vec<HistoryEntry>, entry: HistoryEntry, limit: usize) {
    history.insert(0, entry);
    history.truncate(limit);
}
