//! Action handlers: UpdateAction dispatch and background task spawning

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use sketchd_core::prelude::*;
use sketchd_core::RepresentationKind;
use sketchd_toolchain::{parse_sketch_titles, CommandSender, ToolchainCommand};

use crate::engine_event::EngineEvent;
use crate::handler::UpdateAction;
use crate::message::Message;

const NOT_RUNNING: &str = "The toolchain is not running.";

/// Execute an action, spawning a background task where it waits on anything
pub fn handle_action(
    action: UpdateAction,
    msg_tx: mpsc::Sender<Message>,
    cmd_sender: Option<CommandSender>,
    event_tx: &broadcast::Sender<EngineEvent>,
) {
    match action {
        UpdateAction::SendRun {
            job_id,
            code,
            device,
            minimal,
        } => {
            let command = ToolchainCommand::Run {
                code,
                device,
                minimal,
            };
            spawn_job_request(command, job_id, cmd_sender, msg_tx);
        }

        UpdateAction::SendStop { code, minimal, job } => {
            let command = ToolchainCommand::Stop { code, minimal, job };
            spawn_fire_and_forget(command, cmd_sender, msg_tx);
        }

        UpdateAction::SendExport {
            job_id,
            code,
            path,
            device,
            minimal,
        } => {
            let command = ToolchainCommand::Export {
                code,
                path,
                device,
                minimal,
            };
            spawn_job_request(command, job_id, cmd_sender, msg_tx);
        }

        UpdateAction::SendSave {
            generation,
            title,
            data,
            kind,
            device,
        } => {
            spawn_save(generation, title, data, kind, device, cmd_sender, msg_tx);
        }

        UpdateAction::FetchSketchNames { kind } => {
            spawn_fetch_names(kind, cmd_sender, msg_tx);
        }

        UpdateAction::PromptExportPath { suggested_name } => {
            let _ = event_tx.send(EngineEvent::ExportPathRequested { suggested_name });
        }

        UpdateAction::ScheduleNotificationDismiss { id, after } => {
            spawn_timer(after, Message::NotificationTimeout { id }, msg_tx);
        }

        UpdateAction::ScheduleNotificationRemoval { id, after } => {
            spawn_timer(after, Message::NotificationRemove { id }, msg_tx);
        }

        UpdateAction::ScheduleLoadGraceEnd { generation, after } => {
            spawn_timer(after, Message::LoadGraceElapsed { generation }, msg_tx);
        }

        UpdateAction::ExitEditor => {
            let _ = event_tx.send(EngineEvent::EditorClosed);
        }
    }
}

/// Deliver `msg` after `after`. Timers are never cancelled; handlers ignore stale ones.
fn spawn_timer(after: Duration, msg: Message, msg_tx: mpsc::Sender<Message>) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let _ = msg_tx.send(msg).await;
    });
}

/// Run/export: sent under the job id the handler already allocated
fn spawn_job_request(
    command: ToolchainCommand,
    job_id: u64,
    cmd_sender: Option<CommandSender>,
    msg_tx: mpsc::Sender<Message>,
) {
    tokio::spawn(async move {
        let result = match cmd_sender {
            Some(sender) => sender.send_with_id(command, job_id).await,
            None => Err(Error::toolchain(NOT_RUNNING)),
        };
        if let Err(e) = result {
            error!("Failed to send job #{}: {}", job_id, e);
            let _ = msg_tx
                .send(Message::CommandFailed {
                    job_id: Some(job_id),
                    error: failure_text(&e),
                })
                .await;
        }
    });
}

fn spawn_fire_and_forget(
    command: ToolchainCommand,
    cmd_sender: Option<CommandSender>,
    msg_tx: mpsc::Sender<Message>,
) {
    tokio::spawn(async move {
        let result = match cmd_sender {
            Some(sender) => sender.send_fire_and_forget(command).await.map(|_| ()),
            None => Err(Error::toolchain(NOT_RUNNING)),
        };
        if let Err(e) = result {
            let _ = msg_tx
                .send(Message::CommandFailed {
                    job_id: None,
                    error: failure_text(&e),
                })
                .await;
        }
    });
}

fn spawn_save(
    generation: u64,
    title: String,
    data: String,
    kind: RepresentationKind,
    device: sketchd_core::DeviceId,
    cmd_sender: Option<CommandSender>,
    msg_tx: mpsc::Sender<Message>,
) {
    tokio::spawn(async move {
        let error = match cmd_sender {
            Some(sender) => {
                let command = ToolchainCommand::Save {
                    title: title.clone(),
                    data,
                    kind,
                    device,
                };
                match sender.send(command).await {
                    Ok(response) if response.success => None,
                    Ok(response) => Some(
                        response
                            .error
                            .unwrap_or_else(|| "Save failed".to_string()),
                    ),
                    Err(e) => Some(failure_text(&e)),
                }
            }
            None => Some(NOT_RUNNING.to_string()),
        };
        let _ = msg_tx
            .send(Message::SaveCompleted {
                generation,
                title,
                error,
            })
            .await;
    });
}

fn spawn_fetch_names(
    kind: RepresentationKind,
    cmd_sender: Option<CommandSender>,
    msg_tx: mpsc::Sender<Message>,
) {
    tokio::spawn(async move {
        let Some(sender) = cmd_sender else {
            let _ = msg_tx
                .send(Message::SketchNamesFailed {
                    error: NOT_RUNNING.to_string(),
                })
                .await;
            return;
        };

        let msg = match sender.send(ToolchainCommand::Sketches).await {
            Ok(response) if response.success => {
                let titles = response
                    .result
                    .as_ref()
                    .map(|r| parse_sketch_titles(r, kind))
                    .unwrap_or_default();
                Message::SketchNamesLoaded { kind, titles }
            }
            Ok(response) => Message::SketchNamesFailed {
                error: response.error.unwrap_or_default(),
            },
            Err(e) => Message::SketchNamesFailed {
                error: e.to_string(),
            },
        };
        let _ = msg_tx.send(msg).await;
    });
}

/// Toolchain-side failures are shown without the internal prefix
fn failure_text(error: &Error) -> String {
    match error {
        Error::Toolchain { message } => message.clone(),
        Error::ChannelSend { .. } | Error::ChannelClosed => NOT_RUNNING.to_string(),
        other => other.to_string(),
    }
}
