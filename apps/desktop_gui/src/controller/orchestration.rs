//! Command orchestration helpers from UI actions to backend command queue.

use client_core::StatusLine;
use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub const QUEUE_FULL_STATUS: &str = "UI command queue is full; please retry";
pub const BACKEND_DISCONNECTED_STATUS: &str =
    "Backend command processor disconnected (possible startup/runtime failure); restart the app";

/// Returns whether the command was queued. On failure `status` explains why.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut StatusLine,
) -> bool {
    let cmd_name = cmd.name();

    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            true
        }
        Err(TrySendError::Full(_)) => {
            *status = StatusLine::error(QUEUE_FULL_STATUS);
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = StatusLine::error(BACKEND_DISCONNECTED_STATUS);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn reports_full_and_disconnected_queues() {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(1);
        let mut status = StatusLine::info("ready");

        assert!(dispatch_backend_command(&cmd_tx, BackendCommand::Load, &mut status));
        assert_eq!(status.text, "ready");

        assert!(!dispatch_backend_command(
            &cmd_tx,
            BackendCommand::LoadHistory,
            &mut status
        ));
        assert_eq!(status.text, QUEUE_FULL_STATUS);
        assert!(status.is_error());

        drop(cmd_rx);
        assert!(!dispatch_backend_command(
            &cmd_tx,
            BackendCommand::CopySummary,
            &mut status
        ));
        assert_eq!(status.text, BACKEND_DISCONNECTED_STATUS);
    }
}
