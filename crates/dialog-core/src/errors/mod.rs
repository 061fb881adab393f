//! Error types for dialog-core
//!
//! This module defines the error type used throughout the crate together with
//! the `DialogResult` alias and small constructor helpers.

pub mod dialog_errors;

// Re-export main error types
pub use dialog_errors::{DialogError, DialogResult};
