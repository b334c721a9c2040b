//! Message processing with toolchain response routing
//!
//! Runs TEA message processing and routes toolchain responses to the
//! RequestTracker before the handlers see them.

use tokio::sync::{broadcast, mpsc};

use sketchd_core::{ToolchainEvent, ToolchainMessage};
use sketchd_toolchain::{parse_toolchain_message, response_id, CommandSender};

use crate::actions::handle_action;
use crate::engine_event::EngineEvent;
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update function, following up
/// messages until none remain and dispatching every action on the way
pub fn process_message(
    state: &mut AppState,
    message: Message,
    msg_tx: &mpsc::Sender<Message>,
    cmd_sender: Option<&CommandSender>,
    event_tx: &broadcast::Sender<EngineEvent>,
) {
    route_toolchain_response(&message, cmd_sender);

    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        for action in result.actions {
            handle_action(action, msg_tx.clone(), cmd_sender.cloned(), event_tx);
        }

        msg = result.message;
    }
}

/// Hand responses to the tracker; on exit, fail whatever is still pending
fn route_toolchain_response(message: &Message, cmd_sender: Option<&CommandSender>) {
    let Some(sender) = cmd_sender else {
        return;
    };

    match message {
        Message::Toolchain(ToolchainEvent::Stdout(line)) => {
            if let Some(ToolchainMessage::Response { id, result, error }) =
                parse_toolchain_message(line)
            {
                if let Some(id_num) = response_id(&id) {
                    let tracker = sender.tracker().clone();
                    tokio::spawn(async move {
                        tracker.handle_response(id_num, result, error).await;
                    });
                }
            }
        }
        Message::Toolchain(ToolchainEvent::Exited { .. }) => {
            let tracker = sender.tracker().clone();
            tokio::spawn(async move {
                tracker.cancel_all().await;
            });
        }
        _ => {}
    }
}
