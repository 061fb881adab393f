//! Non-identity session state copied from an original dialog into its forks
//!
//! Negotiation of session timers and authentication happens elsewhere; the
//! dialog only carries the last known values so that a fork starts from the
//! same point as its original.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which side refreshes the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Refresher {
    Uac,
    Uas,
}

/// Session-timer parameters in force for the dialog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTimerSnapshot {
    pub session_expires: Option<Duration>,
    pub min_se: Option<Duration>,
    pub refresher: Option<Refresher>,
}

/// Cached digest challenge state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSnapshot {
    pub realm: Option<String>,
    pub nonce: Option<String>,
    pub opaque: Option<String>,
    pub nonce_count: u32,
}
