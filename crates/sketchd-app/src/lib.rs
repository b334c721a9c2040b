//! sketchd-app - Editor session state and orchestration for sketchd
//!
//! This crate implements the TEA (The Elm Architecture) pattern for the editor
//! session: load, edit, save and Save-As, run/stop, export and the exit flow.
//! It also provides the Engine that hosting shells drive, configuration
//! loading, notifications and dialog state.

pub mod actions;
pub mod config;
pub mod engine;
pub mod engine_event;
pub mod exit_dialog;
pub mod handler;
pub mod message;
pub mod notifications;
pub mod process;
pub mod save_dialog;
pub mod state;

// Re-export primary types
pub use engine::Engine;
pub use engine_event::{EngineEvent, JobOutcome};
pub use exit_dialog::ExitOption;
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use notifications::{Notification, NotificationLevel};
pub use save_dialog::{sanitize, validate, FilenameError};
pub use state::AppState;
