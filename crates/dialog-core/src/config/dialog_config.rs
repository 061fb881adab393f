//! Dialog-core configuration
//!
//! ## Examples
//!
//! ```rust
//! use sipleg_dialog_core::config::DialogCoreConfig;
//! use std::time::Duration;
//!
//! let config = DialogCoreConfig::default()
//!     .with_forking(true)
//!     .with_forked_1xx_timeout(Duration::from_secs(32));
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.forked_1xx_timeout(), Duration::from_secs(32));
//! ```
//!
//! ### From TOML
//!
//! ```rust
//! use sipleg_dialog_core::config::DialogCoreConfig;
//!
//! let config = DialogCoreConfig::from_toml_str(r#"
//!     forking_enabled = true
//!     forked_1xx_timeout_ms = 5000
//! "#).unwrap();
//!
//! assert!(config.forking_enabled);
//! assert_eq!(config.max_route_entries, 64);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{DialogError, DialogResult};

/// Default delay before an unanswered fork is abandoned (3 minutes)
pub const DEFAULT_FORKED_1XX_TIMEOUT_MS: u64 = 180_000;

/// Default cap on the number of hops in one route-set
pub const DEFAULT_MAX_ROUTE_ENTRIES: usize = 64;

/// Configuration for dialog forking and route-set handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogCoreConfig {
    /// Delay before a fork that saw a provisional response but no final one
    /// is terminated. Zero disables the timer.
    pub forked_1xx_timeout_ms: u64,

    /// Whether new outgoing dialogs accept forked responses
    pub forking_enabled: bool,

    /// Maximum number of Route / Record-Route hops stored per route-set
    pub max_route_entries: usize,
}

impl Default for DialogCoreConfig {
    fn default() -> Self {
        Self {
            forked_1xx_timeout_ms: DEFAULT_FORKED_1XX_TIMEOUT_MS,
            forking_enabled: false,
            max_route_entries: DEFAULT_MAX_ROUTE_ENTRIES,
        }
    }
}

impl DialogCoreConfig {
    pub fn forked_1xx_timeout(&self) -> Duration {
        Duration::from_millis(self.forked_1xx_timeout_ms)
    }

    /// Set the fork abandonment delay
    pub fn with_forked_1xx_timeout(mut self, timeout: Duration) -> Self {
        self.forked_1xx_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable or disable forking for new outgoing dialogs
    pub fn with_forking(mut self, enabled: bool) -> Self {
        self.forking_enabled = enabled;
        self
    }

    pub fn with_max_route_entries(mut self, max: usize) -> Self {
        self.max_route_entries = max;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> DialogResult<()> {
        if self.max_route_entries == 0 {
            return Err(DialogError::configuration("max_route_entries must be greater than 0"));
        }
        if u32::try_from(self.max_route_entries).is_err() {
            return Err(DialogError::configuration("max_route_entries does not fit in 32 bits"));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> DialogResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| {
                DialogError::configuration(&format!("invalid dialog-core config: {}", e))
            })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DialogCoreConfig::default();
        assert!(!config.forking_enabled);
        assert_eq!(config.forked_1xx_timeout(), Duration::from_secs(180));
        assert_eq!(config.max_route_entries, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_document_uses_defaults() {
        let config = DialogCoreConfig::from_toml_str("max_route_entries = 8").unwrap();
        assert_eq!(config.max_route_entries, 8);
        assert_eq!(config.forked_1xx_timeout_ms, DEFAULT_FORKED_1XX_TIMEOUT_MS);
    }

    #[test]
    fn test_toml_rejects_invalid_values() {
        let err = DialogCoreConfig::from_toml_str("max_route_entries = 0").unwrap_err();
        assert!(matches!(err, DialogError::Configuration { .. }));

        let err = DialogCoreConfig::from_toml_str("forking_enabled = \"yes\"").unwrap_err();
        assert!(matches!(err, DialogError::Configuration { .. }));
    }

    #[test]
    fn test_zero_timeout_is_allowed() {
        let config = DialogCoreConfig::default().with_forked_1xx_timeout(Duration::ZERO);
        assert!(config.validate().is_ok());
        assert_eq!(config.forked_1xx_timeout(), Duration::ZERO);
    }
}
