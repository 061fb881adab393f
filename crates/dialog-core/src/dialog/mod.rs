//! Core dialog types
//!
//! This module contains the dialog record and the handle through which every
//! other component reaches it:
//!
//! - [`DialogId`]: Unique UUID-based identifiers for dialogs
//! - [`Dialog`]: The dialog record (identity, sequencing, route-set, fork timer)
//! - [`DialogHandle`]: Shared, lockable reference with a generation counter
//! - [`DialogState`], [`Direction`], [`TerminationReason`]
//!
//! ## Dialog Lifecycle
//!
//! ```text
//! Idle → Inviting → Early → Confirmed → Terminated
//!   ↓       ↓         ↓         ↓           ↓
//! created INVITE     1xx       2xx     BYE / non-2xx /
//!          sent     recv'd    recv'd   fork timer expiry
//! ```
//!
//! Forked dialogs skip straight to `Early` on creation, or stay `Idle` when
//! their original is a hidden (subscription) dialog.
//!
//! ## Usage
//!
//! Dialogs are created and driven through the
//! [`DialogManager`](crate::manager::DialogManager).

pub mod dialog_id;
pub mod dialog_impl;
pub mod dialog_state;
pub mod handle;
pub mod session_state;

// Re-export main types
pub use dialog_id::DialogId;
pub use dialog_impl::{Dialog, OriginalRef};
pub use dialog_state::{DialogState, Direction, TerminationReason};
pub use handle::{DialogHandle, WeakDialogHandle};
pub use session_state::{AuthSnapshot, Refresher, SessionTimerSnapshot};
