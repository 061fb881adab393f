//! Dialog matching and route-set management
//!
//! - [`DialogKey`] and the matching rules used by the registry
//! - [`RouteSet`], its arena storage, and the [`RouteSetManager`] that
//!   builds it from Record-Route headers and applies it to outbound messages

pub mod dialog_matcher;
pub mod route_arena;
pub mod route_set;
pub mod route_set_manager;

pub use dialog_matcher::{fork_key_matches, keys_match, matches_original, DialogKey};
pub use route_arena::{HopIndex, RouteArena, RouteSetEntry};
pub use route_set::{RouteIter, RouteSet, RouteSetState};
pub use route_set_manager::RouteSetManager;
