//! Backend commands queued from UI to backend worker.

pub enum BackendCommand {
    /// Resolve the schema and build the form. Only the first one per session
    /// talks to the service.
    Load,
    /// Copies the form as typed into the controller, then submits it.
    Submit {
        fields: Vec<(String, String)>,
    },
    CopySummary,
    SaveToHistory,
    LoadHistory,
    CheckServiceStatus,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Load => "load",
            BackendCommand::Submit { .. } => "submit",
            BackendCommand::CopySummary => "copy_summary",
            BackendCommand::SaveToHistory => "save_to_history",
            BackendCommand::LoadHistory => "load_history",
            BackendCommand::CheckServiceStatus => "check_service_status",
        }
    }
}
