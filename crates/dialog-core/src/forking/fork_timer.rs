//! Fork abandonment timer
//!
//! A forked dialog that has seen a provisional response but no final one is
//! terminated once its timer fires. The timer task only holds a weak handle
//! plus the dialog generation and arm sequence it was armed with; on expiry
//! it re-locks the dialog and does nothing unless both still match.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dialog::{Dialog, DialogHandle, TerminationReason, WeakDialogHandle};
use crate::events::DialogObserver;
use crate::registry::DialogRegistry;

static NEXT_ARM_SEQ: AtomicU64 = AtomicU64::new(1);

/// Armed fork timer
#[derive(Debug)]
pub struct ForkTimer {
    seq: u64,
    generation: u64,
    task: JoinHandle<()>,
}

impl ForkTimer {
    /// Sequence number of this arming
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Dialog generation the timer was armed for
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel the timer task
    pub fn release(self) {
        self.task.abort();
    }
}

/// Arm the fork timer of a locked dialog
///
/// Does nothing if the timer is already armed or the dialog's delay is zero.
/// Without a tokio runtime the failure is logged and the fork stays
/// unprotected. Returns whether a timer was armed.
pub(crate) fn arm(
    handle: &DialogHandle,
    dialog: &mut Dialog,
    registry: Weak<DialogRegistry>,
    observer: Arc<dyn DialogObserver>,
) -> bool {
    if dialog.fork_timer.is_some() {
        return false;
    }

    let delay = dialog.forked_1xx_timeout;
    if delay.is_zero() {
        debug!("Fork timer disabled for dialog {}", dialog.id);
        return false;
    }

    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!("Cannot arm fork timer for dialog {}: {}", dialog.id, e);
            return false;
        }
    };

    let seq = NEXT_ARM_SEQ.fetch_add(1, Ordering::Relaxed);
    let generation = handle.generation();
    let weak = handle.downgrade();

    let task = runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        on_expiry(weak, generation, seq, registry, observer);
    });

    debug!("Fork timer {} armed for dialog {} ({:?})", seq, dialog.id, delay);
    dialog.fork_timer = Some(ForkTimer { seq, generation, task });
    true
}

/// Cancel the fork timer of a locked dialog; returns whether one was armed
pub(crate) fn disarm(dialog: &mut Dialog) -> bool {
    match dialog.fork_timer.take() {
        Some(timer) => {
            debug!("Fork timer {} released for dialog {}", timer.seq, dialog.id);
            timer.release();
            true
        }
        None => false,
    }
}

fn on_expiry(
    weak: WeakDialogHandle,
    generation: u64,
    seq: u64,
    registry: Weak<DialogRegistry>,
    observer: Arc<dyn DialogObserver>,
) {
    let Some(handle) = weak.upgrade() else {
        debug!("Fork timer {} fired for a dialog that no longer exists", seq);
        return;
    };

    let events = {
        let mut dialog = handle.lock();
        let armed = dialog.fork_timer.as_ref().map(|t| (t.seq, t.generation));
        if armed != Some((seq, generation)) || handle.generation() != generation {
            debug!("Stale fork timer {} ignored for dialog {}", seq, dialog.id);
            return;
        }

        // The slot holds this task's own JoinHandle; drop it without aborting.
        dialog.fork_timer = None;
        info!("Fork timer expired for dialog {}, no final response", dialog.id);
        handle.terminate_locked(&mut dialog, TerminationReason::ForkedCallNoFinalResponse)
    };

    if let Some(registry) = registry.upgrade() {
        registry.remove(handle.id());
    }
    observer.on_events(events);
}
