//! Event observers

use tokio::sync::mpsc;
use tracing::warn;

use super::dialog_events::DialogEvent;

/// Receives dialog notifications
///
/// Called with no dialog lock held; implementations may call back into the
/// dialog manager.
pub trait DialogObserver: Send + Sync {
    fn on_event(&self, event: DialogEvent);

    fn on_events(&self, events: Vec<DialogEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl DialogObserver for NullObserver {
    fn on_event(&self, _event: DialogEvent) {}
}

impl DialogObserver for mpsc::UnboundedSender<DialogEvent> {
    fn on_event(&self, event: DialogEvent) {
        if let Err(e) = self.send(event) {
            warn!("Dropping dialog event, receiver closed: {:?}", e.0);
        }
    }
}
