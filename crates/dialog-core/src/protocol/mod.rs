//! SIP protocol handling for dialog-core
//!
//! Inbound message processing on top of the [`DialogManager`](crate::manager::DialogManager).
//! Currently this is response dispatch: deciding whether a response belongs
//! to the original dialog or to a fork, and driving the dialog it lands on.

pub mod response_handler;

pub use response_handler::ResponseDisposition;
