//! Client side of the crop recommendation service: schema discovery, form
//! state, validation, the prediction round trip and result rendering.

pub mod clipboard;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod render;
pub mod schema;
pub mod store;
pub mod transport;

pub use clipboard::{ClipboardWriter, MemoryClipboard, MissingClipboard};
pub use config::{load_settings, Settings};
pub use controller::{
    ControllerEvent, ControllerView, PredictionController, StatusKind, StatusLine,
    SubmissionPhase, SubmitOutcome,
};
pub use error::{ActionError, ConfigError, FormError, RequestError, ValidationError};
pub use form::FormFieldState;
pub use render::{render_result, summary_text, RenderedResult};
pub use schema::{FeatureSchemaLoader, ResolvedSchema};
pub use store::{MemoryStateStore, StateStore};
pub use transport::{HttpTransport, PredictionTransport};
