//! Dialog error definitions
//!
//! Error kinds follow the failure classes of the forking and route-set core:
//!
//! - **BadParameter**: a required input is missing (e.g. a message without Call-ID)
//! - **IllegalAction**: the operation is not valid for the dialog's role or state
//! - **OutOfResources**: route-set or identity allocation failed
//! - **NotFound**: a lookup produced nothing (e.g. request target on an empty route-set)
//! - **Unknown**: an unexpected internal outcome
//!
//! Failures in the fork path never terminate the original dialog; callers
//! receive the error and drop only the offending message.

use thiserror::Error;

/// Result type used across dialog-core
pub type DialogResult<T> = Result<T, DialogError>;

/// Errors produced by dialog-core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogError {
    /// A required input was missing or malformed
    #[error("Bad parameter: {message}")]
    BadParameter { message: String },

    /// Operation is not permitted for this dialog
    #[error("Illegal action: {message}")]
    IllegalAction { message: String },

    /// Allocation of route entries or dialog identity failed
    #[error("Out of resources: {message}")]
    OutOfResources { message: String },

    /// Requested item does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// SIP text could not be interpreted
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal failure
    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl DialogError {
    pub fn bad_parameter(message: &str) -> Self {
        Self::BadParameter { message: message.to_string() }
    }

    pub fn illegal_action(message: &str) -> Self {
        Self::IllegalAction { message: message.to_string() }
    }

    pub fn out_of_resources(message: &str) -> Self {
        Self::OutOfResources { message: message.to_string() }
    }

    pub fn not_found(message: &str) -> Self {
        Self::NotFound { message: message.to_string() }
    }

    pub fn protocol_error(message: &str) -> Self {
        Self::Protocol { message: message.to_string() }
    }

    pub fn configuration(message: &str) -> Self {
        Self::Configuration { message: message.to_string() }
    }

    pub fn unknown(message: &str) -> Self {
        Self::Unknown { message: message.to_string() }
    }

    /// Whether the error only means "nothing to act on"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
