//! Headless mode - JSON event output
//!
//! The headless host drives the Engine without any editing UI and writes
//! structured status to stdout so scripts can follow a run or export.
//!
//! # Event Format
//!
//! NDJSON (newline-delimited JSON), one event per line, each with an
//! "event" field naming its type.
//!
//! # Example Output
//!
//! ```json
//! {"event":"toolchain_started","command":"sketchd-toolchain","timestamp":1704700001000}
//! {"event":"stage","stage":"COMPILE","timestamp":1704700002000}
//! {"event":"job_finished","outcome":"completed","timestamp":1704700009000}
//! ```

pub mod runner;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use sketchd_app::{EngineEvent, JobOutcome, NotificationLevel};
use sketchd_toolchain::JobKind;

/// Events emitted in headless mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Toolchain process spawned
    ToolchainStarted { command: String, timestamp: i64 },

    SketchLoaded {
        title: String,
        kind: String,
        device: String,
        timestamp: i64,
    },

    JobStarted {
        job_id: Option<u64>,
        kind: String,
        timestamp: i64,
    },

    /// Progress stage of the running job
    Stage { stage: String, timestamp: i64 },

    Notification {
        level: String,
        text: String,
        timestamp: i64,
    },

    /// Target device plugged in or removed
    Device { connected: bool, timestamp: i64 },

    JobFinished { outcome: String, timestamp: i64 },

    /// Result of `sketchd validate`
    Validation {
        name: String,
        sanitized: String,
        result: String,
        timestamp: i64,
    },

    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Map an engine event to its headless form. Events with no headless
    /// counterpart (dirty flag, dialogs) yield `None`.
    pub fn from_engine_event(event: &EngineEvent) -> Option<Self> {
        let timestamp = Self::now();
        let mapped = match event {
            EngineEvent::SketchLoaded {
                title,
                kind,
                device_id,
            } => Self::SketchLoaded {
                title: title.clone(),
                kind: kind.wire_name().to_string(),
                device: device_id.clone(),
                timestamp,
            },
            EngineEvent::JobStarted { job_id, kind } => Self::JobStarted {
                job_id: *job_id,
                kind: job_kind_label(*kind).to_string(),
                timestamp,
            },
            EngineEvent::StageChanged { stage } => Self::Stage {
                stage: stage.clone(),
                timestamp,
            },
            EngineEvent::NotificationRaised { text, level, .. } => Self::Notification {
                level: level_label(*level).to_string(),
                text: text.clone(),
                timestamp,
            },
            EngineEvent::DeviceConnectionChanged { connected } => Self::Device {
                connected: *connected,
                timestamp,
            },
            EngineEvent::JobFinished { outcome } => Self::JobFinished {
                outcome: outcome_label(*outcome).to_string(),
                timestamp,
            },
            _ => return None,
        };
        Some(mapped)
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn toolchain_started(command: &str) -> Self {
        Self::ToolchainStarted {
            command: command.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn validation(name: &str, sanitized: String, result: &str) -> Self {
        Self::Validation {
            name: name.to_string(),
            sanitized,
            result: result.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }
}

fn job_kind_label(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Run => "run",
        JobKind::Export => "export",
    }
}

fn level_label(level: NotificationLevel) -> &'static str {
    match level {
        NotificationLevel::Info => "info",
        NotificationLevel::Success => "success",
        NotificationLevel::Error => "error",
    }
}

fn outcome_label(outcome: JobOutcome) -> &'static str {
    match outcome {
        JobOutcome::Completed => "completed",
        JobOutcome::Cancelled => "cancelled",
        JobOutcome::Aborted => "aborted",
    }
}
