//! Message types for the editor session (TEA pattern)

use std::path::PathBuf;

use sketchd_core::{PersistedSketch, RepresentationKind, ToolchainEvent};

use crate::exit_dialog::ExitOption;

/// All possible messages in the editor session
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────
    /// Open a sketch in the editor
    LoadSketch {
        sketch: PersistedSketch,
        title: String,
    },

    /// The post-load grace window for `generation` has passed
    LoadGraceElapsed { generation: u64 },

    // ─────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────
    /// The block workspace reported a change
    WorkspaceChanged,

    /// The text buffer reported a change
    TextChanged,

    /// Flip the minimal compile flag
    ToggleMinimal,

    // ─────────────────────────────────────────────────────────
    // Saving
    // ─────────────────────────────────────────────────────────
    /// Save under the current title, or open Save-As if untitled
    Save,

    /// Save shortcut; ignored while a dialog is open
    KeyboardSave,

    /// Open the Save-As dialog
    OpenSaveModal,

    /// Sketch titles for the Save-As uniqueness check
    SketchNamesLoaded {
        kind: RepresentationKind,
        titles: Vec<String>,
    },

    /// The sketch list could not be fetched
    SketchNamesFailed { error: String },

    /// Filename input changed
    SaveModalInput { filename: String },

    SaveModalSubmit,

    SaveModalCancel,

    /// The toolchain answered a save request
    SaveCompleted {
        generation: u64,
        title: String,
        error: Option<String>,
    },

    // ─────────────────────────────────────────────────────────
    // Exit
    // ─────────────────────────────────────────────────────────
    /// Leave the editor (asks first when there are unsaved changes)
    RequestExit,

    /// Answer from the exit confirmation dialog
    ExitChoice(ExitOption),

    // ─────────────────────────────────────────────────────────
    // Run / Export
    // ─────────────────────────────────────────────────────────
    /// Run, or stop the running job
    RunToggle,

    /// Start the export flow (asks the host for a destination)
    Export,

    /// Destination picked by the host; `None` if the user cancelled
    ExportPathChosen { path: Option<PathBuf> },

    /// A fire-and-forget request never reached the toolchain
    CommandFailed {
        job_id: Option<u64>,
        error: String,
    },

    /// Output or lifecycle event from the toolchain process
    Toolchain(ToolchainEvent),

    // ─────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────
    /// User closed a notification
    DismissNotification { id: u64 },

    /// Auto-dismiss timer fired
    NotificationTimeout { id: u64 },

    /// Closing animation finished
    NotificationRemove { id: u64 },
}
