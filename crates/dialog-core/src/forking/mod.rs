//! Forked early dialogs
//!
//! An INVITE forked by a proxy can draw responses from several UASs, each
//! with its own To-tag (RFC 3261 Section 12.1.2). The first tagged response
//! belongs to the original dialog; every further To-tag creates a forked
//! dialog that copies the original's session state and lives on its own.
//!
//! ## Components
//!
//! - [`ForkManager`]: creates and deduplicates forked dialogs, drives their
//!   provisional and first 2xx responses, and abandons failed forks
//! - [`ForkTimer`]: per-fork one-shot abandonment timer
//! - [`InviteDelegate`]: hooks into reliable-provisional and final-response
//!   processing owned by the INVITE layer

pub mod delegate;
pub mod fork_manager;
pub mod fork_timer;

pub use delegate::{InviteDelegate, NoopInviteDelegate};
pub use fork_manager::{ForkManager, ForkOutcome};
pub use fork_timer::ForkTimer;
