use thiserror::Error;

/// Reasons a list of feature names cannot become a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("feature schema must contain at least one feature name")]
    Empty,
}

/// Reasons a service payload cannot become a domain value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("prediction response has an empty predicted_label")]
    EmptyLabel,
}
