//! Handler module - TEA update function and event handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `load`: Loading sketches and the post-load grace window
//! - `save`: Inline save, Save-As dialog
//! - `exit`: Leaving the editor
//! - `toolchain`: Run/stop/export and toolchain events
//! - `notify`: Notification helpers and timers

pub(crate) mod exit;
pub(crate) mod load;
pub(crate) mod notify;
pub(crate) mod save;
pub(crate) mod toolchain;
pub(crate) mod update;

#[cfg(test)]
mod tests;

use std::time::Duration;

use sketchd_core::{DeviceId, RepresentationKind};

use crate::message::Message;

// Re-export main entry point
pub use update::update;

/// Side effects the event loop performs after update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Start compiling and uploading under `job_id`
    SendRun {
        job_id: u64,
        code: String,
        device: DeviceId,
        minimal: bool,
    },

    /// Ask the toolchain to cancel the running job
    SendStop {
        code: String,
        minimal: bool,
        job: Option<u64>,
    },

    /// Compile to a binary at `path` under `job_id`
    SendExport {
        job_id: u64,
        code: String,
        path: String,
        device: DeviceId,
        minimal: bool,
    },

    /// Persist the sketch container; answered with `Message::SaveCompleted`
    SendSave {
        /// Load generation of the document being saved
        generation: u64,
        title: String,
        data: String,
        kind: RepresentationKind,
        device: DeviceId,
    },

    /// Fetch existing titles; answered with `Message::SketchNamesLoaded`
    FetchSketchNames { kind: RepresentationKind },

    /// Ask the host for an export destination; answered with `Message::ExportPathChosen`
    PromptExportPath { suggested_name: String },

    ScheduleNotificationDismiss { id: u64, after: Duration },

    ScheduleNotificationRemoval { id: u64, after: Duration },

    ScheduleLoadGraceEnd { generation: u64, after: Duration },

    /// Hand control back to the host (home screen)
    ExitEditor,
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Actions for the event loop to perform, in order
    pub actions: Vec<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            actions: Vec::new(),
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            actions: vec![action],
        }
    }

    pub fn actions(actions: Vec<UpdateAction>) -> Self {
        Self {
            message: None,
            actions,
        }
    }

    pub fn with_action(mut self, action: UpdateAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = UpdateAction>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn with_message(mut self, msg: Message) -> Self {
        self.message = Some(msg);
        self
    }
}
