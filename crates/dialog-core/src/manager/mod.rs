//! Dialog Manager Module
//!
//! The main [`DialogManager`] and its supporting functionality, split by
//! concern:
//!
//! - `core`: construction, dialog creation, termination
//! - `response_lifecycle`: preparing outbound requests, ACKs and responses
//! - inbound response dispatch lives in `crate::protocol::response_handler`

// Core dialog manager implementation
pub mod core;

pub mod response_lifecycle;

// Re-export the main DialogManager
pub use core::{DialogManager, OutgoingDialogParams};
