//! Dialog identifiers

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a dialog
///
/// Independent of the SIP identity (Call-ID and tags), which may not be fully
/// known when the dialog is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogId(pub Uuid);

impl DialogId {
    /// Create a new random dialog ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DialogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
