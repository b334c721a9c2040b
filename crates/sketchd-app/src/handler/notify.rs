//! Notification helpers: raising toasts and driving their timers

use std::time::Duration;

use crate::notifications::NotificationLevel;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Timer for a freshly raised notification, unless auto-dismiss is disabled
fn dismiss_timer(state: &AppState, id: u64) -> Option<UpdateAction> {
    let timeout = state.settings.editor.notification_timeout_ms;
    if timeout < 0 {
        return None;
    }
    Some(UpdateAction::ScheduleNotificationDismiss {
        id,
        after: Duration::from_millis(timeout as u64),
    })
}

/// Raise a notification and return its dismiss timer
pub(crate) fn raise(
    state: &mut AppState,
    text: impl Into<String>,
    level: NotificationLevel,
) -> Vec<UpdateAction> {
    let id = state.notifications.push(text, level);
    dismiss_timer(state, id).into_iter().collect()
}

pub(crate) fn info(state: &mut AppState, text: impl Into<String>) -> Vec<UpdateAction> {
    raise(state, text, NotificationLevel::Info)
}

pub(crate) fn success(state: &mut AppState, text: impl Into<String>) -> Vec<UpdateAction> {
    raise(state, text, NotificationLevel::Success)
}

pub(crate) fn error(state: &mut AppState, text: impl Into<String>) -> Vec<UpdateAction> {
    raise(state, text, NotificationLevel::Error)
}

/// Raise into the single presence slot
pub(crate) fn presence(state: &mut AppState, text: impl Into<String>) -> Vec<UpdateAction> {
    let id = state
        .notifications
        .push_presence(text, NotificationLevel::Info);
    dismiss_timer(state, id).into_iter().collect()
}

/// User close or auto-dismiss: start closing, then remove after the grace period
pub fn handle_close(state: &mut AppState, id: u64) -> UpdateResult {
    if !state.notifications.begin_close(id) {
        return UpdateResult::none();
    }
    UpdateResult::action(UpdateAction::ScheduleNotificationRemoval {
        id,
        after: Duration::from_millis(state.settings.editor.notification_grace_ms),
    })
}

pub fn handle_remove(state: &mut AppState, id: u64) -> UpdateResult {
    state.notifications.remove(id);
    UpdateResult::none()
}
