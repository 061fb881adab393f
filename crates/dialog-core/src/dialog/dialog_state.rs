//! Dialog state, direction and termination reasons

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dialog state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogState {
    /// Created, nothing sent or received yet
    Idle,
    /// Initial INVITE sent, no response with a tag yet
    Inviting,
    /// Provisional response with a To-tag received or sent
    Early,
    /// 2xx received or sent
    Confirmed,
    /// Dialog is finished
    Terminated,
}

impl DialogState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, DialogState::Terminated)
    }

    /// Early or earlier
    pub fn is_pre_confirmed(&self) -> bool {
        matches!(self, DialogState::Idle | DialogState::Inviting | DialogState::Early)
    }
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogState::Idle => write!(f, "Idle"),
            DialogState::Inviting => write!(f, "Inviting"),
            DialogState::Early => write!(f, "Early"),
            DialogState::Confirmed => write!(f, "Confirmed"),
            DialogState::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Which side initiated the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// We sent the dialog-creating request (UAC)
    Outgoing,
    /// We received the dialog-creating request (UAS)
    Incoming,
}

impl Direction {
    pub fn is_outgoing(&self) -> bool {
        matches!(self, Direction::Outgoing)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outgoing => write!(f, "outgoing"),
            Direction::Incoming => write!(f, "incoming"),
        }
    }
}

/// Why a dialog was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationReason {
    /// BYE or explicit local termination
    Normal,
    /// A non-2xx final response ended the dialog
    FinalResponse(u16),
    /// Setting up the dialog failed locally
    LocalFailure,
    /// A forked dialog got no final response before its timer fired
    ForkedCallNoFinalResponse,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Normal => write!(f, "normal"),
            TerminationReason::FinalResponse(code) => write!(f, "final response {}", code),
            TerminationReason::LocalFailure => write!(f, "local failure"),
            TerminationReason::ForkedCallNoFinalResponse => {
                write!(f, "forked call, no final response")
            }
        }
    }
}
