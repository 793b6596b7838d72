//! UI/backend events and error modeling for desktop GUI controller.

use client_core::{ControllerEvent, RenderedResult, StatusLine, SubmissionPhase};
use shared::{
    domain::{FeatureName, HistoryEntry, SchemaSource},
    protocol::ServiceStatus,
};

pub enum UiEvent {
    Info(String),
    Error(UiError),
    FormBuilt {
        source: SchemaSource,
        fields: Vec<(FeatureName, String)>,
    },
    Phase(SubmissionPhase),
    Status(StatusLine),
    ResultRendered(RenderedResult),
    ResultCleared,
    /// The clipboard lives on the UI thread.
    CopyToClipboard(String),
    HistoryLoaded(Vec<HistoryEntry>),
    ServiceStatusLoaded(ServiceStatus),
}

/// Maps controller events onto what the UI redraws. Schema events are
/// skipped: the worker sends the whole form once it is built.
pub fn ui_event_for(event: ControllerEvent) -> Option<UiEvent> {
    match event {
        ControllerEvent::PhaseChanged(phase) => Some(UiEvent::Phase(phase)),
        ControllerEvent::StatusChanged(status) => Some(UiEvent::Status(status)),
        ControllerEvent::ResultRendered(rendered) => Some(UiEvent::ResultRendered(rendered)),
        ControllerEvent::ResultCleared => Some(UiEvent::ResultCleared),
        ControllerEvent::SchemaLoaded { .. } | ControllerEvent::HistoryUpdated { .. } => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Storage,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    History,
    ServiceStatus,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("sqlite")
            || message_lower.contains("database")
            || message_lower.contains("client state")
            || message_lower.contains("history")
        {
            UiErrorCategory::Storage
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
            || message_lower.contains("unknown field")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
