//! Configuration module for dialog-core
//!
//! A single [`DialogCoreConfig`] drives forking and route-set limits. It can
//! be built in code with the `with_*` methods or loaded from TOML.

pub mod dialog_config;

pub use dialog_config::{
    DialogCoreConfig,
    DEFAULT_FORKED_1XX_TIMEOUT_MS,
    DEFAULT_MAX_ROUTE_ENTRIES,
};
