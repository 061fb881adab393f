//! Minimal SIP message model
//!
//! Full header parsing and encoding belong to the transport and parser
//! layers. This module carries just enough typed structure for dialog
//! matching, forking and route-set handling.
//!
//! ## Contents
//!
//! - [`SipUri`] and [`NameAddr`] with a small `nom` text parser
//! - [`RouteHop`] for Route / Record-Route values
//! - [`Header`] and [`HeaderKind`]
//! - the [`SipMessage`] trait and the owned [`Message`] implementation

pub mod header;
pub mod method;
mod parser;
pub mod sip_message;
pub mod uri;

pub use header::{CSeq, Header, HeaderKind, NameAddr, RouteHop};
pub use method::Method;
pub use sip_message::{HeaderPosition, Message, SipMessage, StartLine};
pub use uri::{Param, Scheme, SipUri};
