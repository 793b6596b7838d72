//! Backend worker: owns the prediction controller on its own tokio runtime and
//! serves UI commands one at a time.

use std::{sync::Arc, thread};

use client_core::{
    ActionError, HttpTransport, MissingClipboard, PredictionController, SubmitOutcome,
};
use crossbeam_channel::{Receiver, Sender};
use storage::Storage;
use tokio::sync::broadcast::error::RecvError;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{ui_event_for, UiError, UiErrorContext, UiEvent};
use crate::ui::app::StartupConfig;

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, startup: StartupConfig) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let storage = match Storage::new(&startup.database_url).await {
                Ok(storage) => storage,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!(
                            "backend worker startup failure: failed to open client state at {}: {err:#}",
                            startup.database_url
                        ),
                    )));
                    tracing::error!("failed to open client state: {err:#}");
                    return;
                }
            };

            // The system clipboard belongs to the UI thread; copies go there as
            // `UiEvent::CopyToClipboard` and the UI reports the outcome.
            let mut controller = PredictionController::new(
                Arc::new(HttpTransport::new(startup.api_base_url.clone())),
                Arc::new(storage),
                Arc::new(MissingClipboard),
            );
            spawn_event_forwarder(&controller, ui_tx.clone());
            tracing::info!(
                api_base_url = %startup.api_base_url,
                "backend worker ready"
            );

            handle_command(&mut controller, BackendCommand::Load, &ui_tx).await;
            handle_command(&mut controller, BackendCommand::LoadHistory, &ui_tx).await;

            while let Ok(cmd) = cmd_rx.recv() {
                handle_command(&mut controller, cmd, &ui_tx).await;
            }
            tracing::info!("ui command queue closed; backend worker exiting");
        });
    });
}

fn spawn_event_forwarder(controller: &PredictionController, ui_tx: Sender<UiEvent>) {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(ui_event) = ui_event_for(event) {
                        if ui_tx.send(ui_event).is_err() {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "ui event forwarder lagged behind controller");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn handle_command(
    controller: &mut PredictionController,
    cmd: BackendCommand,
    ui_tx: &Sender<UiEvent>,
) {
    match cmd {
        BackendCommand::Load => {
            let source = controller.load().await;
            let _ = ui_tx.send(UiEvent::FormBuilt {
                source,
                fields: controller.view().fields,
            });
        }
        BackendCommand::Submit { fields } => {
            for (name, value) in fields {
                if let Err(err) = controller.set_field(&name, value) {
                    tracing::warn!("backend: dropping edit: {err}");
                }
            }
            match controller.submit().await {
                SubmitOutcome::Busy => {
                    let _ = ui_tx.send(UiEvent::Info(
                        "A prediction is already in flight".to_string(),
                    ));
                }
                SubmitOutcome::Rendered(_)
                | SubmitOutcome::Invalid(_)
                | SubmitOutcome::Failed(_) => {}
            }
        }
        BackendCommand::CopySummary => match controller.summary() {
            Ok(summary) => {
                let _ = ui_tx.send(UiEvent::CopyToClipboard(summary));
            }
            Err(err) => tracing::debug!("backend: copy summary skipped: {err}"),
        },
        BackendCommand::SaveToHistory => match controller.save_to_history().await {
            Ok(_) => send_history(controller, ui_tx).await,
            Err(ActionError::NoResult) => {}
            Err(err) => tracing::debug!("backend: save to history failed: {err}"),
        },
        BackendCommand::LoadHistory => send_history(controller, ui_tx).await,
        BackendCommand::CheckServiceStatus => match controller.service_status().await {
            Ok(status) => {
                let _ = ui_tx.send(UiEvent::ServiceStatusLoaded(status));
            }
            Err(err) => {
                let _ = ui_tx.send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::ServiceStatus,
                    format!("service status unavailable: {err}"),
                )));
            }
        },
    }
}

async fn send_history(controller: &PredictionController, ui_tx: &Sender<UiEvent>) {
    match controller.history().await {
        Ok(entries) => {
            let _ = ui_tx.send(UiEvent::HistoryLoaded(entries));
        }
        Err(err) => {
            let _ = ui_tx.send(UiEvent::Error(UiError::from_message(
                UiErrorContext::History,
                format!("failed to read history: {err:#}"),
            )));
        }
    }
}
