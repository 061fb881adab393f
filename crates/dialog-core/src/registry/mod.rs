//! Dialog registry
//!
//! Concurrent index of live dialogs keyed by Call-ID and tags. Lookups never
//! take a dialog lock: every entry carries a snapshot of the dialog's key,
//! refreshed together with the tag by [`DialogRegistry::assign_remote_tag`]
//! when the dialog learns its remote tag.

pub mod dialog_registry;

pub use dialog_registry::{DialogRegistry, InsertOutcome};
