//! Run/stop/export requests and toolchain events

use std::path::PathBuf;

use sketchd_core::prelude::*;
use sketchd_core::{PortsChanged, RunProgress, ToolchainEvent, ToolchainMessage};
use sketchd_toolchain::{next_request_id, parse_toolchain_message, JobKind, JobPhase, JobTransition};

use crate::state::AppState;

use super::{notify, UpdateAction, UpdateResult};

pub const CANCELLED_TEXT: &str = "Run operation cancelled.";

/// Run, or stop the running job. Never sends a second run.
pub fn handle_run_toggle(state: &mut AppState) -> UpdateResult {
    let Some(doc) = state.document.as_ref() else {
        return UpdateResult::none();
    };
    let code = state.current_code();

    match state.job.phase() {
        JobPhase::Running => {
            let job = state.job.job_id();
            state.job.mark_stop_requested();
            info!("Stopping job {:?}", job);
            UpdateResult::action(UpdateAction::SendStop {
                code,
                minimal: state.minimal_compile,
                job,
            })
        }
        JobPhase::Requested => {
            debug!("Run already requested, waiting for the toolchain");
            UpdateResult::none()
        }
        _ => {
            let device = doc.device_id().clone();
            let job_id = next_request_id();
            state.job.request(job_id);
            state.running_stage = None;
            info!("Requesting run #{} on {}", job_id, device);
            UpdateResult::action(UpdateAction::SendRun {
                job_id,
                code,
                device,
                minimal: state.minimal_compile,
            })
        }
    }
}

/// Ask the host where to write the binary
pub fn handle_export(state: &mut AppState) -> UpdateResult {
    if state.document.is_none() || state.job.is_active() {
        return UpdateResult::none();
    }
    let suggested_name = match state.title() {
        "" => "sketch.bin".to_string(),
        title => format!("{}.bin", title),
    };
    UpdateResult::action(UpdateAction::PromptExportPath { suggested_name })
}

/// Export has no acknowledgment stage, so the job is Running right away
pub fn handle_export_path(state: &mut AppState, path: Option<PathBuf>) -> UpdateResult {
    let Some(path) = path else {
        debug!("Export cancelled, no destination chosen");
        return UpdateResult::none();
    };
    let Some(doc) = state.document.as_ref() else {
        return UpdateResult::none();
    };
    if state.job.is_active() {
        return UpdateResult::none();
    }

    let device = doc.device_id().clone();
    let code = state.current_code();
    let job_id = next_request_id();
    state.job.start_export(job_id);
    state.running_stage = None;
    info!("Exporting #{} for {} to {}", job_id, device, path.display());

    UpdateResult::action(UpdateAction::SendExport {
        job_id,
        code,
        path: path.to_string_lossy().into_owned(),
        device,
        minimal: state.minimal_compile,
    })
}

/// A request could not be written to the toolchain
pub fn handle_command_failed(
    state: &mut AppState,
    job_id: Option<u64>,
    error: String,
) -> UpdateResult {
    warn!("Toolchain request failed: {}", error);
    if job_id.is_some() && job_id == state.job.job_id() {
        state.job.reset();
        state.running_stage = None;
    }
    UpdateResult::actions(notify::error(state, error))
}

pub fn handle_toolchain_event(state: &mut AppState, event: ToolchainEvent) -> UpdateResult {
    match event {
        ToolchainEvent::Stdout(line) => match parse_toolchain_message(&line) {
            Some(message) => handle_toolchain_message(state, message),
            None => {
                trace!("toolchain: {}", line);
                UpdateResult::none()
            }
        },
        ToolchainEvent::Message(message) => handle_toolchain_message(state, message),
        ToolchainEvent::Stderr(line) => {
            debug!("toolchain stderr: {}", line);
            UpdateResult::none()
        }
        ToolchainEvent::Exited { code } => {
            warn!("Toolchain exited with code {:?}", code);
            state.device_connected = None;
            if !state.job.is_active() {
                return UpdateResult::none();
            }
            state.job.reset();
            state.running_stage = None;
            UpdateResult::actions(notify::error(
                state,
                "The toolchain stopped unexpectedly.",
            ))
        }
        ToolchainEvent::SpawnFailed { reason } => {
            error!("Toolchain failed to start: {}", reason);
            UpdateResult::actions(notify::error(
                state,
                format!("Could not start the toolchain: {}", reason),
            ))
        }
    }
}

fn handle_toolchain_message(state: &mut AppState, message: ToolchainMessage) -> UpdateResult {
    match message {
        ToolchainMessage::RunProgress(progress) => handle_progress(state, &progress),
        ToolchainMessage::Ports(ports) => handle_ports(state, &ports),
        ToolchainMessage::Log(log) => {
            debug!("toolchain: {}", log.message);
            UpdateResult::none()
        }
        // Routed to the request tracker before update
        ToolchainMessage::Response { .. } => UpdateResult::none(),
        ToolchainMessage::UnknownEvent { event, .. } => {
            trace!("Unhandled toolchain event '{}'", event);
            UpdateResult::none()
        }
    }
}

fn handle_progress(state: &mut AppState, progress: &RunProgress) -> UpdateResult {
    let kind = state.job.kind();
    let transition = state.job.apply(progress);
    trace!("Progress {:?} -> {:?}", progress.stage, transition);

    let ignored = transition == JobTransition::Ignored;
    let mut actions = Vec::new();
    match transition {
        JobTransition::Ignored => {}
        JobTransition::Started => {
            state.running_stage = state.job.stage().map(str::to_string);
        }
        JobTransition::Stage(stage) => {
            state.running_stage = Some(stage);
        }
        JobTransition::Completed => {
            state.running_stage = None;
            if progress.error.is_none() && !progress.cancelled {
                let text = match kind {
                    Some(JobKind::Export) => "Export finished.",
                    _ => "Upload finished.",
                };
                actions.extend(notify::success(state, text));
            }
        }
        JobTransition::Cancelled => {
            state.running_stage = None;
            actions.extend(notify::info(state, CANCELLED_TEXT));
        }
    }

    if !ignored {
        if let Some(err) = &progress.error {
            actions.extend(notify::error(state, err.clone()));
        }
    }

    UpdateResult::actions(actions)
}

/// Presence is surfaced on transitions only; a disconnect never cancels the job
fn handle_ports(state: &mut AppState, ports: &PortsChanged) -> UpdateResult {
    let connected = ports.is_connected();
    if state.device_connected == Some(connected) {
        return UpdateResult::none();
    }
    let first_report = state.device_connected.is_none();
    state.device_connected = Some(connected);

    // Nothing to announce for an absent device at startup
    if first_report && !connected {
        return UpdateResult::none();
    }

    let name = state.device_name().unwrap_or_else(|| "Device".to_string());
    let text = if connected {
        format!("{} connected", name)
    } else {
        format!("{} disconnected", name)
    };
    UpdateResult::actions(notify::presence(state, text))
}
