use shared::domain::{
    FeatureName, FeatureSchema, LastInputs, PredictionRequest, PredictionRequestBuilder,
};

use crate::error::{FieldProblem, FormError, InvalidField, ValidationError};

/// Raw text of every form field, keyed and ordered by the active schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFieldState {
    entries: Vec<(FeatureName, String)>,
}

impl FormFieldState {
    pub fn new(schema: &FeatureSchema) -> Self {
        Self::prefilled(schema, None)
    }

    /// Fields whose name appears in `last` start with the remembered value.
    pub fn prefilled(schema: &FeatureSchema, last: Option<&LastInputs>) -> Self {
        let entries = schema
            .names()
            .iter()
            .map(|name| {
                let value = last
                    .and_then(|last| last.get(name))
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                (name.clone(), value)
            })
            .collect();
        Self { entries }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        let slot = self
            .entries
            .iter_mut()
            .find(|(candidate, _)| candidate.as_str() == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        slot.1 = value.into();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate.as_str() == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&FeatureName, &str)> {
        self.entries.iter().map(|(name, value)| (name, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All-or-nothing: one bad field rejects the whole form.
    pub fn validate(&self) -> Result<PredictionRequest, ValidationError> {
        let mut builder = PredictionRequestBuilder::with_capacity(self.entries.len());
        let mut invalid = Vec::new();
        for (name, raw) in &self.entries {
            match parse_feature_value(raw) {
                Ok(value) => builder.push(name.clone(), value),
                Err(problem) => invalid.push(InvalidField {
                    name: name.clone(),
                    problem,
                }),
            }
        }
        if invalid.is_empty() {
            Ok(builder.build())
        } else {
            Err(ValidationError { fields: invalid })
        }
    }
}

/// Plain decimal parsing. `NaN` and infinities count as non-numeric since a
/// JSON body cannot carry them.
pub fn parse_feature_value(raw: &str) -> Result<f64, FieldProblem> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldProblem::Empty);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FieldProblem::NotNumeric),
    }
}
