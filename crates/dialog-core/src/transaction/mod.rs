//! Transaction-layer glue
//!
//! Dialog processing never drives transactions itself. It only needs two things
//! from the transaction layer:
//!
//! - a [`TransactionKey`] extracted from a message, used to match responses
//!   to dialogs and to build registry keys
//! - a [`TransactionInfo`] view of the transaction a message belongs to,
//!   used when deciding whether Route / Record-Route headers apply

pub mod info;
pub mod key;

pub use info::{TransactionInfo, TransactionSnapshot};
pub use key::TransactionKey;
