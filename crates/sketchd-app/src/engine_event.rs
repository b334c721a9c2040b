//! Domain events emitted by the Engine for the hosting shell
//!
//! Events are broadcast after each message processing cycle via
//! `Engine::subscribe()`, so subscribers see a consistent view of state changes.

use sketchd_core::RepresentationKind;
use sketchd_toolchain::JobKind;

use crate::notifications::NotificationLevel;

/// How a job left the Running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Cancelled,
    /// The toolchain went away or the request never reached it
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Editor
    // ─────────────────────────────────────────────────────────
    /// A sketch was loaded into the editor
    SketchLoaded {
        title: String,
        kind: RepresentationKind,
        device_id: String,
    },

    /// The unsaved-changes flag flipped
    DirtyChanged { unsaved: bool },

    /// The document got a new title (Save-As)
    TitleChanged { title: String },

    /// The Save-As dialog opened; the host should ask for a name
    SaveDialogOpened,

    /// The host should pick an export destination and answer with
    /// `Message::ExportPathChosen`
    ExportPathRequested { suggested_name: String },

    /// The editor closed; control returns to the host
    EditorClosed,

    // ─────────────────────────────────────────────────────────
    // Jobs
    // ─────────────────────────────────────────────────────────
    /// The toolchain acknowledged a run, or an export began
    JobStarted { job_id: Option<u64>, kind: JobKind },

    StageChanged { stage: String },

    JobFinished { outcome: JobOutcome },

    // ─────────────────────────────────────────────────────────
    // Notifications / devices
    // ─────────────────────────────────────────────────────────
    NotificationRaised {
        id: u64,
        text: String,
        level: NotificationLevel,
    },

    DeviceConnectionChanged { connected: bool },

    // ─────────────────────────────────────────────────────────
    // Engine Lifecycle
    // ─────────────────────────────────────────────────────────
    Shutdown,
}

impl EngineEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SketchLoaded { .. } => "sketch_loaded",
            Self::DirtyChanged { .. } => "dirty_changed",
            Self::TitleChanged { .. } => "title_changed",
            Self::SaveDialogOpened => "save_dialog_opened",
            Self::ExportPathRequested { .. } => "export_path_requested",
            Self::EditorClosed => "editor_closed",
            Self::JobStarted { .. } => "job_started",
            Self::StageChanged { .. } => "stage_changed",
            Self::JobFinished { .. } => "job_finished",
            Self::NotificationRaised { .. } => "notification_raised",
            Self::DeviceConnectionChanged { .. } => "device_connection_changed",
            Self::Shutdown => "shutdown",
        }
    }
}
