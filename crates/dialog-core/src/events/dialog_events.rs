//! Dialog-specific events

use serde::Serialize;

use crate::dialog::{DialogId, DialogState, TerminationReason};
use crate::message::Method;

/// Dialog events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DialogEvent {
    /// Dialog state changed
    StateChanged {
        dialog_id: DialogId,
        old_state: DialogState,
        new_state: DialogState,
    },

    /// A response was received on the dialog, delivered before the dialog
    /// reacts to it
    MessageReceived {
        dialog_id: DialogId,
        status_code: u16,
        method: Method,
        cseq: u32,
    },

    /// A forked dialog was created for a response with a novel To-tag
    Forked {
        dialog_id: DialogId,
        original_id: DialogId,
    },

    /// Dialog terminated
    Terminated {
        dialog_id: DialogId,
        reason: TerminationReason,
    },
}

impl DialogEvent {
    pub fn dialog_id(&self) -> DialogId {
        match self {
            DialogEvent::StateChanged { dialog_id, .. }
            | DialogEvent::MessageReceived { dialog_id, .. }
            | DialogEvent::Forked { dialog_id, .. }
            | DialogEvent::Terminated { dialog_id, .. } => *dialog_id,
        }
    }
}
