//! Shared dialog handles
//!
//! A [`DialogHandle`] is the only way to reach a [`Dialog`]. It pairs the
//! record's mutex with two lock-free fields, the id and a generation counter.
//! The generation changes when the dialog is terminated, so timers and
//! back-references holding an old value can detect that the dialog they
//! were armed for is gone.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::events::DialogEvent;

use super::dialog_id::DialogId;
use super::dialog_impl::Dialog;
use super::dialog_state::{DialogState, TerminationReason};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

struct DialogCell {
    id: DialogId,
    call_id: String,
    generation: AtomicU64,
    inner: Mutex<Dialog>,
}

/// Shared, lockable reference to a dialog
#[derive(Clone)]
pub struct DialogHandle(Arc<DialogCell>);

/// Non-owning dialog reference held by timers
#[derive(Clone)]
pub struct WeakDialogHandle(Weak<DialogCell>);

impl DialogHandle {
    pub fn new(dialog: Dialog) -> Self {
        Self(Arc::new(DialogCell {
            id: dialog.id,
            call_id: dialog.call_id.clone(),
            generation: AtomicU64::new(next_generation()),
            inner: Mutex::new(dialog),
        }))
    }

    pub fn id(&self) -> DialogId {
        self.0.id
    }

    pub fn call_id(&self) -> &str {
        &self.0.call_id
    }

    pub fn generation(&self) -> u64 {
        self.0.generation.load(Ordering::Acquire)
    }

    /// Lock the dialog record
    pub fn lock(&self) -> MutexGuard<'_, Dialog> {
        self.0.inner.lock()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> DialogState {
        self.lock().state
    }

    pub fn downgrade(&self) -> WeakDialogHandle {
        WeakDialogHandle(Arc::downgrade(&self.0))
    }

    /// Whether both handles refer to the same dialog record
    pub fn ptr_eq(&self, other: &DialogHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Give the dialog a fresh generation, invalidating every stale token
    pub fn invalidate(&self) {
        self.0.generation.store(next_generation(), Ordering::Release);
    }

    /// Terminate a dialog whose lock the caller already holds
    ///
    /// Releases the fork timer, drops the route-set and bumps the generation.
    /// Returns the notifications to deliver once the lock is released; empty
    /// if the dialog was already terminated.
    pub fn terminate_locked(
        &self,
        dialog: &mut Dialog,
        reason: TerminationReason,
    ) -> Vec<DialogEvent> {
        if dialog.state.is_terminated() {
            return Vec::new();
        }

        if let Some(timer) = dialog.fork_timer.take() {
            timer.release();
        }
        dialog.route_set.clear();
        dialog.termination_reason = Some(reason);

        let mut events = Vec::with_capacity(2);
        if let Some(event) = dialog.transition(DialogState::Terminated) {
            events.push(event);
        }
        events.push(DialogEvent::Terminated {
            dialog_id: dialog.id,
            reason,
        });

        self.invalidate();
        debug!("Dialog {} terminated: {}", dialog.id, reason);
        events
    }
}

impl fmt::Debug for DialogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogHandle")
            .field("id", &self.0.id)
            .field("call_id", &self.0.call_id)
            .field("generation", &self.generation())
            .finish()
    }
}

impl WeakDialogHandle {
    pub fn upgrade(&self) -> Option<DialogHandle> {
        self.0.upgrade().map(DialogHandle)
    }
}

impl fmt::Debug for WeakDialogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakDialogHandle")
    }
}
