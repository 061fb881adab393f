//! # SIPLEG Dialog Core
//!
//! RFC 3261 dialog handling for SIP user agents, focused on the two parts
//! that are easy to get wrong: forked early dialogs and route-sets.
//!
//! ## Features
//!
//! - **Forking**: responses with novel To-tags create forked dialogs that
//!   copy the original's session state, are deduplicated against racing
//!   duplicates, and are abandoned by a timer when no final response arrives
//! - **Route-sets**: built from Record-Route headers (provisional on 1xx,
//!   confirmed on 2xx) and applied to outbound requests and responses, with
//!   loose and strict router handling
//! - **Registry**: concurrent dialog index keyed by Call-ID and tags
//!
//! ## Architecture
//!
//! - `message`: minimal typed SIP message model and the `SipMessage` trait
//! - `transaction`: transaction keys and the `TransactionInfo` trait
//! - `dialog`: the dialog record and its shared handle
//! - `events`: dialog notifications and observers
//! - `registry`: the dialog registry
//! - `routing`: dialog matching and route-set management
//! - `forking`: forked dialog creation and the fork timer
//! - `manager` / `protocol`: the `DialogManager` entry points
//!
//! ## Example
//!
//! ```rust
//! use sipleg_dialog_core::{DialogCoreConfig, DialogManager, OutgoingDialogParams};
//!
//! let config = DialogCoreConfig::default().with_forking(true);
//! let manager = DialogManager::with_config(config).unwrap();
//! let dialog = manager
//!     .create_outgoing_dialog(OutgoingDialogParams::new(
//!         "<sip:alice@atlanta.example.com>".parse().unwrap(),
//!         "<sip:bob@biloxi.example.com>".parse().unwrap(),
//!     ))
//!     .unwrap();
//!
//! assert_eq!(manager.dialog_count(), 1);
//! assert!(dialog.lock().forking_enabled);
//! ```

pub mod config;
pub mod dialog;
pub mod errors;
pub mod events;
pub mod forking;
pub mod manager;
pub mod message;
pub mod protocol;
pub mod registry;
pub mod routing;
pub mod transaction;

// Re-export key types
pub use config::DialogCoreConfig;
pub use dialog::{Dialog, DialogHandle, DialogId, DialogState, Direction, TerminationReason};
pub use errors::{DialogError, DialogResult};
pub use events::{DialogEvent, DialogObserver, NullObserver};
pub use forking::{ForkManager, ForkOutcome, InviteDelegate, NoopInviteDelegate};
pub use manager::{DialogManager, OutgoingDialogParams};
pub use message::{Header, HeaderPosition, Message, Method, NameAddr, RouteHop, SipMessage, SipUri};
pub use protocol::ResponseDisposition;
pub use registry::DialogRegistry;
pub use routing::{DialogKey, RouteSetManager, RouteSetState};
pub use transaction::{TransactionInfo, TransactionKey, TransactionSnapshot};
