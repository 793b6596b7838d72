use std::{path::PathBuf, sync::Arc};

use arboard::Clipboard;
use chrono::Local;
use client_core::{
    config::DEFAULT_DATABASE_URL, controller::COPIED_STATUS, render_result, ActionError,
    ClipboardWriter, RenderedResult, Settings, StatusLine, SubmissionPhase,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::{
    domain::{FeatureName, HistoryEntry, SchemaSource},
    protocol::ServiceStatus,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiErrorCategory, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub api_base_url: String,
    pub database_url: String,
}

impl StartupConfig {
    /// An explicitly configured database wins; otherwise state lives in the
    /// per-user app data directory.
    pub fn resolve(
        settings: Settings,
        database_override: Option<String>,
        paths: Option<&AppPaths>,
    ) -> Self {
        let database_url = match (database_override, paths) {
            (Some(url), _) => url,
            (None, Some(paths)) if settings.database_url == DEFAULT_DATABASE_URL => {
                format!("sqlite://{}", paths.db_path.display())
            }
            (None, _) => settings.database_url,
        };
        Self {
            api_base_url: settings.api_base_url,
            database_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_root: PathBuf,
    pub db_path: PathBuf,
}

impl AppPaths {
    pub fn from_data_dir(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let root = if let Some(p) = data_dir {
            p
        } else {
            let base = dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("unable to resolve local app data dir"))?;
            base.join("crop_advisor")
        };

        Ok(Self {
            db_path: root.join("client.db"),
            data_root: root,
        })
    }
}

/// `arboard` needs a display server, so it is opened per copy.
struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        let mut clipboard = Clipboard::new()?;
        clipboard.set_text(text.to_string())?;
        Ok(())
    }
}

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Transport => "Network",
        UiErrorCategory::Storage => "Storage",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

fn history_timestamp(entry: &HistoryEntry) -> String {
    entry
        .recorded_at()
        .map(|at| {
            at.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| entry.ts.to_string())
}

pub struct DesktopGuiApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    schema_source: Option<SchemaSource>,
    fields: Vec<(FeatureName, String)>,
    phase: SubmissionPhase,
    status: StatusLine,
    result: Option<RenderedResult>,
    history: Vec<HistoryEntry>,
    show_history: bool,
    service_status: Option<ServiceStatus>,
    clipboard: Arc<dyn ClipboardWriter>,
}

impl DesktopGuiApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            schema_source: None,
            fields: Vec::new(),
            phase: SubmissionPhase::Idle,
            status: StatusLine::info("Loading feature names..."),
            result: None,
            history: Vec::new(),
            show_history: false,
            service_status: None,
            clipboard: Arc::new(SystemClipboard),
        }
    }

    fn submit_enabled(&self) -> bool {
        self.schema_source.is_some() && self.phase.accepts_submit()
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = StatusLine::info(message);
                }
                UiEvent::Error(err) => {
                    tracing::warn!(context = ?err.context(), "ui error: {}", err.message());
                    self.status = StatusLine::error(format!(
                        "{} error: {}",
                        err_label(err.category()),
                        err.message()
                    ));
                }
                UiEvent::FormBuilt { source, fields } => {
                    self.schema_source = Some(source);
                    self.fields = fields;
                }
                UiEvent::Phase(phase) => {
                    self.phase = phase;
                }
                UiEvent::Status(status) => {
                    self.status = status;
                }
                UiEvent::ResultRendered(rendered) => {
                    self.result = Some(rendered);
                }
                UiEvent::ResultCleared => {
                    self.result = None;
                }
                UiEvent::CopyToClipboard(text) => {
                    self.status = match self.clipboard.write_text(&text) {
                        Ok(()) => StatusLine::info(COPIED_STATUS),
                        Err(err) => {
                            let err = ActionError::Clipboard(err);
                            tracing::warn!("ui: {err}");
                            StatusLine::error(err.to_string())
                        }
                    };
                }
                UiEvent::HistoryLoaded(entries) => {
                    self.history = entries;
                }
                UiEvent::ServiceStatusLoaded(status) => {
                    self.service_status = Some(status);
                }
            }
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) -> bool {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status)
    }

    fn submit(&mut self) {
        if !self.submit_enabled() {
            return;
        }
        let fields = self
            .fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        // Disabled until the worker reports the submission finished.
        if self.dispatch(BackendCommand::Submit { fields }) {
            self.phase = SubmissionPhase::Validating;
        }
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Crop recommendation");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = if self.show_history {
                        "Hide history"
                    } else {
                        "History"
                    };
                    if ui.button(label).clicked() {
                        self.show_history = !self.show_history;
                        if self.show_history {
                            self.dispatch(BackendCommand::LoadHistory);
                        }
                    }
                    if ui.button("Service status").clicked() {
                        self.dispatch(BackendCommand::CheckServiceStatus);
                    }
                });
            });
            if let Some(status) = &self.service_status {
                let text = if status.ready_for_predictions() {
                    "Service ready: model, scaler and label encoder loaded".to_string()
                } else {
                    format!(
                        "Service not ready (model: {}, scaler: {}, label encoder: {})",
                        status.model_loaded, status.scaler_loaded, status.label_encoder_loaded
                    )
                };
                ui.small(text);
            }
        });
    }

    fn show_history_panel(&mut self, ctx: &egui::Context) {
        if !self.show_history {
            return;
        }
        egui::SidePanel::right("history_panel")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Saved predictions");
                ui.separator();
                if self.history.is_empty() {
                    ui.label("Nothing saved yet.");
                    return;
                }
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for entry in &self.history {
                        let rendered = render_result(&entry.result);
                        ui.label(egui::RichText::new(&rendered.label).strong());
                        ui.small(format!(
                            "{}  ·  {}",
                            history_timestamp(entry),
                            rendered.confidence
                        ));
                        ui.separator();
                    }
                });
            });
    }

    fn show_form(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Grid::new("feature_form")
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .striped(true)
                    .show(ui, |ui| {
                        for (name, value) in &mut self.fields {
                            ui.label(name.as_str());
                            ui.add(egui::TextEdit::singleline(value).desired_width(180.0));
                            ui.end_row();
                        }
                    });

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    let predict =
                        ui.add_enabled(self.submit_enabled(), egui::Button::new("Predict"));
                    if predict.clicked() {
                        self.submit();
                    }
                    if self.phase.is_busy() {
                        ui.spinner();
                    }
                });

                ui.add_space(4.0);
                if self.status.is_error() {
                    let color = ui.visuals().error_fg_color;
                    ui.colored_label(color, &self.status.text);
                } else {
                    ui.label(&self.status.text);
                }

                self.show_result(ui);
            });
        });
    }

    fn show_result(&mut self, ui: &mut egui::Ui) {
        let Some(result) = &self.result else {
            return;
        };
        let mut copy = false;
        let mut save = false;

        ui.add_space(12.0);
        ui.group(|ui| {
            ui.heading(format!("Prediction: {}", result.label));
            ui.label(format!("Confidence: {}", result.confidence));
            if result.shows_top3() {
                ui.add_space(4.0);
                ui.label("Top 3:");
                for line in &result.top3 {
                    ui.label(format!("  {line}"));
                }
            }
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                copy = ui.button("Copy summary").clicked();
                save = ui.button("Save to history").clicked();
            });
        });

        if copy {
            self.dispatch(BackendCommand::CopySummary);
        }
        if save {
            self.dispatch(BackendCommand::SaveToHistory);
        }
    }
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        self.show_top_bar(ctx);
        self.show_history_panel(ctx);
        self.show_form(ctx);

        if self.phase.accepts_submit() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        }
    }
}
