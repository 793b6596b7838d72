//! Resolution of the feature schema that shapes the input form.

use std::sync::Arc;

use shared::{
    domain::{FeatureSchema, SchemaSource},
    protocol::FeatureNamesResponse,
};
use tracing::{info, warn};

use crate::{
    error::{RequestError, SchemaResolutionFailure},
    transport::PredictionTransport,
};

pub const REMOTE_SCHEMA_STATUS: &str = "Using feature names from server";
pub const FALLBACK_SCHEMA_STATUS: &str = "Using fallback feature list (edit if needed)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub schema: FeatureSchema,
    pub source: SchemaSource,
}

impl ResolvedSchema {
    pub fn fallback() -> Self {
        Self {
            schema: FeatureSchema::fallback(),
            source: SchemaSource::Fallback,
        }
    }

    pub fn status_message(&self) -> &'static str {
        match self.source {
            SchemaSource::Remote => REMOTE_SCHEMA_STATUS,
            SchemaSource::Fallback => FALLBACK_SCHEMA_STATUS,
        }
    }
}

pub struct FeatureSchemaLoader {
    transport: Arc<dyn PredictionTransport>,
}

impl FeatureSchemaLoader {
    pub fn new(transport: Arc<dyn PredictionTransport>) -> Self {
        Self { transport }
    }

    /// One discovery request; any failure degrades to the fallback schema.
    pub async fn resolve_schema(&self) -> ResolvedSchema {
        match schema_from_response(self.transport.fetch_feature_names().await) {
            Ok(schema) => {
                info!(
                    feature_count = schema.len(),
                    "schema: using remote feature names"
                );
                ResolvedSchema {
                    schema,
                    source: SchemaSource::Remote,
                }
            }
            Err(err) => {
                warn!("schema: feature names fetch failed, using fallback list: {err}");
                ResolvedSchema::fallback()
            }
        }
    }
}

pub fn schema_from_response(
    response: Result<FeatureNamesResponse, RequestError>,
) -> Result<FeatureSchema, SchemaResolutionFailure> {
    let body = response?;
    if let Some(note) = &body.note {
        info!(note = note.as_str(), "schema: service attached a note");
    }
    let names = body
        .feature_names
        .ok_or(SchemaResolutionFailure::MissingFeatureNames)?;
    Ok(FeatureSchema::new(names)?)
}

#[cfg(test)]
mod tests {
    use shared::error::SchemaError;

    use super::*;

    fn body(names: Option<&[&str]>) -> Result<FeatureNamesResponse, RequestError> {
        Ok(FeatureNamesResponse {
            feature_names: names.map(|names| names.iter().map(|n| n.to_string()).collect()),
            note: None,
        })
    }

    #[test]
    fn remote_list_keeps_order() {
        let schema = schema_from_response(body(Some(&["N", "Ph", "WD10M"]))).expect("schema");
        let names: Vec<&str> = schema.names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["N", "Ph", "WD10M"]);
    }

    #[test]
    fn empty_or_missing_list_is_a_failure() {
        assert_eq!(
            schema_from_response(body(Some(&[]))),
            Err(SchemaResolutionFailure::Invalid(SchemaError::Empty))
        );
        assert_eq!(
            schema_from_response(body(None)),
            Err(SchemaResolutionFailure::MissingFeatureNames)
        );
    }

    #[test]
    fn request_failures_pass_through() {
        let failure = schema_from_response(Err(RequestError::Status {
            status: 404,
            body: String::new(),
        }));
        assert!(matches!(failure, Err(SchemaResolutionFailure::Request(_))));
    }

    #[test]
    fn status_text_names_the_source() {
        assert!(ResolvedSchema::fallback()
            .status_message()
            .contains("fallback"));
    }
}
