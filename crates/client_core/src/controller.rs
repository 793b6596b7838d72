//! Form ownership and the submit round trip.

use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::{
        FeatureName, FeatureSchema, HistoryEntry, LastInputs, PredictionResult, SchemaSource,
        HISTORY_LIMIT,
    },
    protocol::ServiceStatus,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    clipboard::ClipboardWriter,
    error::{ActionError, FormError, RequestError, ValidationError},
    form::FormFieldState,
    render::{render_result, summary_text, RenderedResult},
    schema::{FeatureSchemaLoader, ResolvedSchema},
    store::StateStore,
    transport::PredictionTransport,
};

pub const LOADING_STATUS: &str = "Loading feature names...";
pub const SUBMITTING_STATUS: &str = "Predicting...";
pub const SUCCESS_STATUS: &str = "Prediction returned";
pub const COPIED_STATUS: &str = "Copied summary to clipboard";
pub const SAVED_STATUS: &str = "Saved to local history";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    Invalid,
    Submitting,
    Rendering,
    ErrorDisplayed,
}

impl SubmissionPhase {
    /// Submit is only offered between submissions.
    pub fn accepts_submit(self) -> bool {
        self == Self::Idle
    }

    /// A request is on the wire.
    pub fn is_busy(self) -> bool {
        self == Self::Submitting
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == StatusKind::Error
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    SchemaLoaded {
        source: SchemaSource,
        feature_count: usize,
    },
    PhaseChanged(SubmissionPhase),
    StatusChanged(StatusLine),
    ResultRendered(RenderedResult),
    ResultCleared,
    HistoryUpdated {
        entries: usize,
    },
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Rendered(PredictionResult),
    Invalid(ValidationError),
    Failed(RequestError),
    /// The controller is not idle. Only reachable when an earlier `submit`
    /// future was dropped mid-request, which leaves the phase at `Submitting`.
    Busy,
}

/// Everything a front-end needs to draw the form.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerView {
    pub schema_source: Option<SchemaSource>,
    pub fields: Vec<(FeatureName, String)>,
    pub phase: SubmissionPhase,
    pub status: StatusLine,
    pub result: Option<RenderedResult>,
}

impl ControllerView {
    pub fn submit_enabled(&self) -> bool {
        self.phase.accepts_submit()
    }
}

pub struct PredictionController {
    transport: Arc<dyn PredictionTransport>,
    store: Arc<dyn StateStore>,
    clipboard: Arc<dyn ClipboardWriter>,
    schema: FeatureSchema,
    schema_source: Option<SchemaSource>,
    form: FormFieldState,
    phase: SubmissionPhase,
    status: StatusLine,
    result: Option<PredictionResult>,
    events: broadcast::Sender<ControllerEvent>,
}

impl PredictionController {
    pub fn new(
        transport: Arc<dyn PredictionTransport>,
        store: Arc<dyn StateStore>,
        clipboard: Arc<dyn ClipboardWriter>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let schema = FeatureSchema::fallback();
        let form = FormFieldState::new(&schema);
        Self {
            transport,
            store,
            clipboard,
            schema,
            schema_source: None,
            form,
            phase: SubmissionPhase::Idle,
            status: StatusLine::info(LOADING_STATUS),
            result: None,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Resolves the schema once per session and builds the form, pre-filled
    /// from the remembered inputs. Later calls return the schema already in use.
    pub async fn load(&mut self) -> SchemaSource {
        if let Some(source) = self.schema_source {
            return source;
        }
        let resolved = FeatureSchemaLoader::new(self.transport.clone())
            .resolve_schema()
            .await;
        let last = match self.store.load_last_inputs().await {
            Ok(last) => last,
            Err(err) => {
                warn!("controller: ignoring unreadable last inputs: {err:#}");
                None
            }
        };
        let source = resolved.source;
        self.apply_schema(resolved, last.as_ref());
        source
    }

    /// Replaces the schema and rebuilds every field from scratch.
    pub fn apply_schema(&mut self, resolved: ResolvedSchema, last: Option<&LastInputs>) {
        let status = StatusLine::info(resolved.status_message());
        self.form = FormFieldState::prefilled(&resolved.schema, last);
        self.schema = resolved.schema;
        self.schema_source = Some(resolved.source);
        self.emit(ControllerEvent::SchemaLoaded {
            source: resolved.source,
            feature_count: self.schema.len(),
        });
        self.set_status(status);
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn schema_source(&self) -> Option<SchemaSource> {
        self.schema_source
    }

    pub fn form(&self) -> &FormFieldState {
        &self.form
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.form.get(name)
    }

    /// Field names and raw values in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&FeatureName, &str)> {
        self.form.entries()
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        self.form.set(name, value)
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    pub fn view(&self) -> ControllerView {
        ControllerView {
            schema_source: self.schema_source,
            fields: self
                .fields()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect(),
            phase: self.phase,
            status: self.status.clone(),
            result: self.result.as_ref().map(render_result),
        }
    }

    /// Validates, persists the inputs, calls the service and routes the
    /// outcome. Always ends back in `Idle`.
    pub async fn submit(&mut self) -> SubmitOutcome {
        if !self.phase.accepts_submit() {
            return SubmitOutcome::Busy;
        }

        self.set_phase(SubmissionPhase::Validating);
        let request = match self.form.validate() {
            Ok(request) => request,
            Err(err) => {
                info!(
                    invalid_fields = err.fields.len(),
                    "controller: submission rejected by validation"
                );
                self.set_phase(SubmissionPhase::Invalid);
                self.set_status(StatusLine::error(err.to_string()));
                self.set_phase(SubmissionPhase::Idle);
                return SubmitOutcome::Invalid(err);
            }
        };

        self.set_phase(SubmissionPhase::Submitting);
        self.set_status(StatusLine::info(SUBMITTING_STATUS));
        // Written before the call so the values survive a failed request.
        if let Err(err) = self.store.save_last_inputs(&request).await {
            warn!("controller: failed to persist last inputs: {err:#}");
        }

        match self.transport.predict(&request).await {
            Ok(result) => {
                self.set_phase(SubmissionPhase::Rendering);
                info!(
                    label = result.predicted_label.as_str(),
                    confidence = result.confidence,
                    "controller: prediction returned"
                );
                self.result = Some(result.clone());
                self.emit(ControllerEvent::ResultRendered(render_result(&result)));
                self.set_status(StatusLine::info(SUCCESS_STATUS));
                self.set_phase(SubmissionPhase::Idle);
                SubmitOutcome::Rendered(result)
            }
            Err(err) => {
                warn!("controller: prediction request failed: {err}");
                self.set_phase(SubmissionPhase::ErrorDisplayed);
                if self.result.take().is_some() {
                    self.emit(ControllerEvent::ResultCleared);
                }
                self.set_status(StatusLine::error(err.to_string()));
                self.set_phase(SubmissionPhase::Idle);
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Short summary of the displayed result, without touching the clipboard.
    pub fn summary(&self) -> Result<String, ActionError> {
        self.result
            .as_ref()
            .map(summary_text)
            .ok_or(ActionError::NoResult)
    }

    /// Copies the short summary of the displayed result.
    pub fn copy_summary(&mut self) -> Result<String, ActionError> {
        let summary = self.summary()?;
        if let Err(err) = self.clipboard.write_text(&summary) {
            let err = ActionError::Clipboard(err);
            self.set_status(StatusLine::error(err.to_string()));
            return Err(err);
        }
        self.set_status(StatusLine::info(COPIED_STATUS));
        Ok(summary)
    }

    pub async fn save_to_history(&mut self) -> Result<usize, ActionError> {
        self.save_to_history_at(Utc::now().timestamp_millis()).await
    }

    /// Appends the displayed result stamped with `ts` (epoch millis).
    pub async fn save_to_history_at(&mut self, ts: i64) -> Result<usize, ActionError> {
        let result = self.result.clone().ok_or(ActionError::NoResult)?;
        let entry = HistoryEntry { ts, result };
        match self.store.append_history(entry, HISTORY_LIMIT).await {
            Ok(history) => {
                self.emit(ControllerEvent::HistoryUpdated {
                    entries: history.len(),
                });
                self.set_status(StatusLine::info(SAVED_STATUS));
                Ok(history.len())
            }
            Err(err) => {
                let err = ActionError::Storage(err);
                warn!("controller: {err}");
                self.set_status(StatusLine::error(err.to_string()));
                Err(err)
            }
        }
    }

    pub async fn history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        self.store.load_history().await
    }

    /// Asks the service which model artifacts it has loaded.
    pub async fn service_status(&self) -> Result<ServiceStatus, RequestError> {
        self.transport.fetch_service_status().await
    }

    fn set_phase(&mut self, phase: SubmissionPhase) {
        self.phase = phase;
        self.emit(ControllerEvent::PhaseChanged(phase));
    }

    fn set_status(&mut self, status: StatusLine) {
        self.status = status.clone();
        self.emit(ControllerEvent::StatusChanged(status));
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
