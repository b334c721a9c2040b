//! Leaving the editor

use sketchd_core::prelude::*;

use crate::exit_dialog::ExitOption;
use crate::message::Message;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Close the editor and hand control back to the host
pub(crate) fn close(state: &mut AppState) -> Vec<UpdateAction> {
    info!("Leaving editor for '{}'", state.title());
    state.close_editor();
    vec![UpdateAction::ExitEditor]
}

/// Leave immediately when clean, otherwise ask
pub fn handle_request_exit(state: &mut AppState) -> UpdateResult {
    if !state.editor_open {
        return UpdateResult::none();
    }
    if !state.unsaved_changes {
        return UpdateResult::actions(close(state));
    }
    state.exit_dialog.open = true;
    UpdateResult::none()
}

/// The exit dialog's three-way branch
pub fn handle_exit_choice(state: &mut AppState, option: ExitOption) -> UpdateResult {
    if !state.editor_open {
        return UpdateResult::none();
    }
    state.exit_dialog.open = false;

    // Nothing to lose: every option leaves
    if !state.unsaved_changes {
        return UpdateResult::actions(close(state));
    }

    match option {
        ExitOption::Cancel => {
            debug!("Exit cancelled");
            state.exit_pending = false;
            UpdateResult::none()
        }
        ExitOption::Exit => {
            info!("Discarding unsaved changes");
            UpdateResult::actions(close(state))
        }
        ExitOption::SaveAndExit => {
            state.exit_pending = true;
            // Untitled goes through Save-As; the pending flag resumes the exit
            // once that save succeeds
            UpdateResult::message(Message::Save)
        }
    }
}
