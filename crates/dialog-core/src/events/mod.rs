//! Dialog event notifications
//!
//! Components never call observers while holding a dialog lock. Operations
//! collect [`DialogEvent`]s under the lock and deliver them through a
//! [`DialogObserver`] once it is released.

pub mod dialog_events;
pub mod observer;

pub use dialog_events::DialogEvent;
pub use observer::{DialogObserver, NullObserver};
