//! Loading sketches into the editor

use std::time::Duration;

use sketchd_core::prelude::*;
use sketchd_core::{decode, PersistedSketch, RepresentationKind};

use crate::message::Message;
use crate::state::AppState;

use super::{notify, UpdateAction, UpdateResult};

/// Decode `sketch` and populate the editing surface for its kind.
///
/// Population happens inside a grace window so the change callbacks it
/// triggers are not taken as user edits.
pub fn handle_load(state: &mut AppState, sketch: PersistedSketch, title: String) -> UpdateResult {
    let decoded = match decode(&sketch, title, &state.catalog) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Failed to load sketch: {}", e);
            return UpdateResult::actions(notify::error(state, e.to_string()));
        }
    };

    let document = decoded.document;
    match document.kind() {
        RepresentationKind::Visual => {
            state.workspace.clear();
            if let Err(e) = state.workspace.load_markup(document.payload()) {
                warn!("Workspace rejected markup: {}", e);
                return UpdateResult::actions(notify::error(state, e.to_string()));
            }
            // Category set is device specific
            let palette = state.catalog.palette_for(document.device_id()).to_vec();
            state.workspace.set_palette(&palette);
            state.code_preview = state.workspace.generate_code();
        }
        RepresentationKind::Textual => {
            state.text_buffer.set_text(document.payload());
            state.code_preview = document.payload().to_string();
        }
    }

    info!(
        "Loaded {} sketch '{}' for {}",
        document.kind(),
        document.title(),
        document.device_id()
    );

    let wants_name = decoded.first_save_warranted && document.is_untitled();

    // The previous document's Save-As dialog and its title list go with it
    state.save_dialog.close();
    state.document = Some(document);
    state.editor_open = true;
    state.unsaved_changes = false;
    state.exit_pending = false;
    state.exit_dialog.open = false;
    state.load_generation += 1;
    state.load_grace = true;

    let mut result = UpdateResult::action(UpdateAction::ScheduleLoadGraceEnd {
        generation: state.load_generation,
        after: Duration::from_millis(state.settings.editor.load_grace_ms),
    });

    if wants_name {
        result = result.with_message(Message::OpenSaveModal);
    }

    result
}

/// End of the grace window: whatever population did is not an unsaved change
pub fn handle_grace_elapsed(state: &mut AppState, generation: u64) -> UpdateResult {
    if generation != state.load_generation || !state.load_grace {
        trace!("Ignoring stale load grace timer #{}", generation);
        return UpdateResult::none();
    }
    state.load_grace = false;
    state.unsaved_changes = false;
    state.text_buffer.set_dirty(false);
    if let Some(doc) = state.document.as_mut() {
        doc.mark_clean(None);
    }
    UpdateResult::none()
}

/// Block workspace change: refresh the preview, and record an edit outside the grace window
pub fn handle_workspace_changed(state: &mut AppState) -> UpdateResult {
    if state.kind() != Some(RepresentationKind::Visual) {
        return UpdateResult::none();
    }
    state.code_preview = state.workspace.generate_code();
    record_edit(state);
    UpdateResult::none()
}

pub fn handle_text_changed(state: &mut AppState) -> UpdateResult {
    if state.kind() != Some(RepresentationKind::Textual) {
        return UpdateResult::none();
    }
    state.code_preview = state.text_buffer.text();
    record_edit(state);
    UpdateResult::none()
}

fn record_edit(state: &mut AppState) {
    if state.load_grace {
        return;
    }
    state.unsaved_changes = true;
    if let Some(doc) = state.document.as_mut() {
        doc.mark_dirty();
    }
}
