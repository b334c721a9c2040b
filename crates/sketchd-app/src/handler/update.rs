//! Main update function - handles state transitions (TEA pattern)

use crate::message::Message;
use crate::state::AppState;

use super::{exit, load, notify, save, toolchain, UpdateResult};

/// Process a message and update state.
/// Returns an optional follow-up message and the actions to perform.
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        // ─────────────────────────────────────────────────────────
        // Loading / editing
        // ─────────────────────────────────────────────────────────
        Message::LoadSketch { sketch, title } => load::handle_load(state, sketch, title),
        Message::LoadGraceElapsed { generation } => load::handle_grace_elapsed(state, generation),
        Message::WorkspaceChanged => load::handle_workspace_changed(state),
        Message::TextChanged => load::handle_text_changed(state),
        Message::ToggleMinimal => {
            state.minimal_compile = !state.minimal_compile;
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Saving
        // ─────────────────────────────────────────────────────────
        Message::Save => save::handle_save(state),
        Message::KeyboardSave => save::handle_keyboard_save(state),
        Message::OpenSaveModal => save::handle_open_save_modal(state),
        Message::SketchNamesLoaded { kind, titles } => {
            save::handle_names_loaded(state, kind, titles)
        }
        Message::SketchNamesFailed { error } => save::handle_names_failed(state, error),
        Message::SaveModalInput { filename } => save::handle_modal_input(state, filename),
        Message::SaveModalSubmit => save::handle_modal_submit(state),
        Message::SaveModalCancel => save::handle_modal_cancel(state),
        Message::SaveCompleted {
            generation,
            title,
            error,
        } => save::handle_save_completed(state, generation, title, error),

        // ─────────────────────────────────────────────────────────
        // Exit
        // ─────────────────────────────────────────────────────────
        Message::RequestExit => exit::handle_request_exit(state),
        Message::ExitChoice(option) => exit::handle_exit_choice(state, option),

        // ─────────────────────────────────────────────────────────
        // Toolchain
        // ─────────────────────────────────────────────────────────
        Message::RunToggle => toolchain::handle_run_toggle(state),
        Message::Export => toolchain::handle_export(state),
        Message::ExportPathChosen { path } => toolchain::handle_export_path(state, path),
        Message::CommandFailed { job_id, error } => {
            toolchain::handle_command_failed(state, job_id, error)
        }
        Message::Toolchain(event) => toolchain::handle_toolchain_event(state, event),

        // ─────────────────────────────────────────────────────────
        // Notifications
        // ─────────────────────────────────────────────────────────
        Message::DismissNotification { id } | Message::NotificationTimeout { id } => {
            notify::handle_close(state, id)
        }
        Message::NotificationRemove { id } => notify::handle_remove(state, id),
    }
}
