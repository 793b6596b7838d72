//! Error types surfaced by the prediction client.

use shared::{domain::FeatureName, error::SchemaError};
use thiserror::Error;

pub const VALIDATION_MESSAGE: &str = "Please fill numeric values for every field";

/// Failure of the prediction round trip. The `Display` text is what the user
/// sees in the status line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("{}", status_message(*status, body))]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl RequestError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

/// Server text wins when there is any; otherwise a generic status line.
fn status_message(status: u16, body: &str) -> String {
    if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}

/// Why remote schema discovery was not used. Always recovered by the fallback
/// schema, never shown to the user as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaResolutionFailure {
    #[error("feature names request failed: {0}")]
    Request(#[from] RequestError),
    #[error("feature names response has no feature_names list")]
    MissingFeatureNames,
    #[error("feature names response is unusable: {0}")]
    Invalid(#[from] SchemaError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldProblem {
    Empty,
    NotNumeric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidField {
    pub name: FeatureName,
    pub problem: FieldProblem,
}

/// Every field that kept the form from becoming a request, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", VALIDATION_MESSAGE)]
pub struct ValidationError {
    pub fields: Vec<InvalidField>,
}

impl ValidationError {
    pub fn names(&self) -> impl Iterator<Item = &FeatureName> {
        self.fields.iter().map(|field| &field.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("'{0}' is not a field of the active feature schema")]
    UnknownField(String),
}

/// Failures of the secondary actions on a rendered result.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no prediction result is displayed")]
    NoResult,
    #[error("failed to copy summary to clipboard: {0:#}")]
    Clipboard(anyhow::Error),
    #[error("failed to save prediction history: {0:#}")]
    Storage(anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid api base url '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("failed to parse client config file: {0}")]
    File(String),
}
