//! Saving: inline save, Save-As dialog and save results

use sketchd_core::prelude::*;
use sketchd_core::{encode, RepresentationKind};

use crate::message::Message;
use crate::state::AppState;

use super::{exit, notify, UpdateAction, UpdateResult};

pub const SAVED_TEXT: &str = "Sketch saved.";

/// Save under the current title; untitled documents go through Save-As
pub fn handle_save(state: &mut AppState) -> UpdateResult {
    let Some(doc) = state.document.as_ref() else {
        return UpdateResult::none();
    };
    if doc.is_untitled() {
        return UpdateResult::message(Message::OpenSaveModal);
    }
    let title = doc.title().to_string();
    send_save(state, title)
}

pub fn handle_keyboard_save(state: &mut AppState) -> UpdateResult {
    if !state.editor_open || state.any_dialog_open() {
        return UpdateResult::none();
    }
    handle_save(state)
}

/// Encode the document and emit the save request.
///
/// Validation failures stop here and never reach the toolchain.
fn send_save(state: &mut AppState, title: String) -> UpdateResult {
    state.sync_document_payload();
    let Some(doc) = state.document.as_ref() else {
        return UpdateResult::none();
    };

    let data = encode(doc, state.workspace.as_ref()).and_then(|sketch| sketch.to_container());
    let data = match data {
        Ok(data) => data,
        Err(e) => {
            warn!("Save of '{}' rejected: {}", title, e);
            state.exit_pending = false;
            return UpdateResult::actions(notify::error(state, e.to_string()));
        }
    };

    debug!("Saving '{}' ({} bytes)", title, data.len());
    UpdateResult::action(UpdateAction::SendSave {
        generation: state.load_generation,
        title,
        data,
        kind: doc.kind(),
        device: doc.device_id().clone(),
    })
}

/// Save result from the toolchain
pub fn handle_save_completed(
    state: &mut AppState,
    generation: u64,
    title: String,
    error: Option<String>,
) -> UpdateResult {
    // Reply for a document that has since been replaced or closed
    if generation != state.load_generation || state.document.is_none() {
        debug!("Ignoring save result for '{}' from load #{}", title, generation);
        return UpdateResult::none();
    }

    if let Some(error) = error {
        warn!("Save of '{}' failed: {}", title, error);
        // The document stays dirty and a pending exit is abandoned
        state.exit_pending = false;
        return UpdateResult::actions(notify::error(state, error));
    }

    let Some(doc) = state.document.as_mut() else {
        return UpdateResult::none();
    };
    doc.mark_clean(Some(title.clone()));
    state.unsaved_changes = false;
    state.text_buffer.set_dirty(false);
    info!("Saved sketch '{}'", title);

    let mut result = UpdateResult::actions(notify::success(state, SAVED_TEXT));
    if state.exit_pending {
        result = result.with_actions(exit::close(state));
    }
    result
}

/// Open the Save-As dialog and fetch the titles it validates against
pub fn handle_open_save_modal(state: &mut AppState) -> UpdateResult {
    let Some(kind) = state.kind() else {
        return UpdateResult::none();
    };

    if kind == RepresentationKind::Visual && state.workspace.block_count() == 0 {
        state.exit_pending = false;
        return UpdateResult::actions(notify::error(state, Error::EmptyWorkspace.to_string()));
    }

    if !state.save_dialog.open() {
        trace!("Save dialog already open");
        return UpdateResult::none();
    }

    UpdateResult::action(UpdateAction::FetchSketchNames { kind })
}

pub fn handle_names_loaded(
    state: &mut AppState,
    kind: RepresentationKind,
    titles: Vec<String>,
) -> UpdateResult {
    if !state.save_dialog.open || state.kind() != Some(kind) {
        return UpdateResult::none();
    }
    debug!("{} existing {} sketches", titles.len(), kind);
    state.save_dialog.set_known_titles(titles);
    UpdateResult::none()
}

/// Without the list only the empty check applies
pub fn handle_names_failed(state: &mut AppState, error: String) -> UpdateResult {
    warn!("Could not fetch sketch names: {}", error);
    state.save_dialog.loading_titles = false;
    UpdateResult::none()
}

pub fn handle_modal_input(state: &mut AppState, filename: String) -> UpdateResult {
    if !state.save_dialog.open {
        return UpdateResult::none();
    }
    state.save_dialog.set_filename(filename);
    UpdateResult::none()
}

/// Submit is disabled while the filename has an error
pub fn handle_modal_submit(state: &mut AppState) -> UpdateResult {
    if !state.save_dialog.can_submit() {
        return UpdateResult::none();
    }
    let title = state.save_dialog.sanitized();
    state.save_dialog.close();
    send_save(state, title)
}

pub fn handle_modal_cancel(state: &mut AppState) -> UpdateResult {
    state.save_dialog.close();
    state.exit_pending = false;
    UpdateResult::none()
}

