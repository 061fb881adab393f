//! Forked dialog creation and processing
//!
//! ## Creating a fork
//!
//! 1. Find the original outgoing dialog through the registry, ignoring its
//!    To-tag
//! 2. Check that the original accepts forks
//! 3. Build an unregistered dialog from the response identity, then copy the
//!    original's session state into it
//! 4. Register it unless a racing caller already registered the same fork
//!
//! The registry is locked only for the lookup and the final insert. The
//! original's lock is held just long enough to snapshot its session state;
//! the snapshot is applied to a fork no one else can reach yet.
//!
//! ## Failure policy
//!
//! Failures on the fork path never touch the original dialog. A new fork
//! that fails before it has processed a provisional response is terminated
//! at once with [`TerminationReason::LocalFailure`]. Once a provisional has
//! been processed, failures leave the fork to its abandonment timer.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dialog::{
    AuthSnapshot, Dialog, DialogHandle, DialogState, Direction, OriginalRef,
    SessionTimerSnapshot, TerminationReason,
};
use crate::errors::{DialogError, DialogResult};
use crate::events::{DialogEvent, DialogObserver};
use crate::message::{NameAddr, SipMessage, SipUri};
use crate::registry::{DialogRegistry, InsertOutcome};
use crate::routing::{DialogKey, RouteSetManager};
use crate::transaction::TransactionKey;

use super::delegate::InviteDelegate;
use super::fork_timer;

/// A forked dialog returned by [`ForkManager::handle_forkable_response`]
#[derive(Debug, Clone)]
pub struct ForkOutcome {
    pub dialog: DialogHandle,
    /// False when an already registered fork was returned
    pub is_new: bool,
}

/// Creates forked dialogs and drives them until they are confirmed or
/// abandoned
pub struct ForkManager {
    registry: Arc<DialogRegistry>,
    route_sets: RouteSetManager,
    observer: Arc<dyn DialogObserver>,
    delegate: Arc<dyn InviteDelegate>,
}

impl ForkManager {
    pub fn new(
        registry: Arc<DialogRegistry>,
        route_sets: RouteSetManager,
        observer: Arc<dyn DialogObserver>,
        delegate: Arc<dyn InviteDelegate>,
    ) -> Self {
        Self {
            registry,
            route_sets,
            observer,
            delegate,
        }
    }

    /// Find or create the forked dialog a response with a novel To-tag
    /// belongs to
    ///
    /// Returns `Ok(None)` when no original dialog matches or the original
    /// does not accept forks.
    pub fn handle_forkable_response(
        &self,
        original: &DialogHandle,
        message: &dyn SipMessage,
    ) -> DialogResult<Option<ForkOutcome>> {
        let tx_key = TransactionKey::from_message(message)?;

        // An inbound request carries the remote side's tag in From
        let switch_tags = message.is_request();
        let key = if switch_tags {
            DialogKey::for_request(&tx_key)
        } else {
            DialogKey::for_response(&tx_key)
        };

        let Some(found) = self.registry.find_original(&key) else {
            warn!("No original dialog for forked message {}", tx_key);
            return Ok(None);
        };
        if !found.ptr_eq(original) {
            debug!(
                "Registry original {} differs from caller's dialog {}",
                found.id(),
                original.id()
            );
        }

        let forking_enabled = found.lock().forking_enabled;
        if !forking_enabled {
            info!("Forking disabled on dialog {}, dropping {}", found.id(), tx_key);
            return Ok(None);
        }

        let mut dialog = self.build_fork(message, &tx_key, switch_tags)?;
        ForkSeed::take(&found)?.apply(&mut dialog);

        let fork_key = dialog.key();
        let fork_id = dialog.id;
        match self
            .registry
            .insert_if_absent(fork_key, false, DialogHandle::new(dialog))
        {
            InsertOutcome::Existing(existing) => {
                debug!("Discarding duplicate fork {}, reusing {}", fork_id, existing.id());
                Ok(Some(ForkOutcome {
                    dialog: existing,
                    is_new: false,
                }))
            }
            InsertOutcome::Inserted(handle) => {
                info!("Created forked dialog {} from original {}", handle.id(), found.id());
                self.observer.on_event(DialogEvent::Forked {
                    dialog_id: handle.id(),
                    original_id: found.id(),
                });
                Ok(Some(ForkOutcome {
                    dialog: handle,
                    is_new: true,
                }))
            }
        }
    }

    fn build_fork(
        &self,
        message: &dyn SipMessage,
        tx_key: &TransactionKey,
        switch_tags: bool,
    ) -> DialogResult<Dialog> {
        let from = message
            .from_header()
            .ok_or_else(|| DialogError::bad_parameter("forked message has no From header"))?;
        let to = message
            .to_header()
            .ok_or_else(|| DialogError::bad_parameter("forked message has no To header"))?;
        let (local, remote) = if switch_tags { (to, from) } else { (from, to) };

        let mut dialog = Dialog::new(
            tx_key.call_id.clone(),
            local.clone(),
            remote.clone(),
            local.tag().map(str::to_string),
            remote.tag().map(str::to_string),
            Direction::Outgoing,
        )
        .with_max_route_entries(self.route_sets.max_route_entries());

        dialog.is_original = false;
        if switch_tags {
            dialog.remote_cseq = tx_key.cseq;
        } else {
            dialog.local_cseq = tx_key.cseq;
        }
        dialog.update_remote_target(message);
        Ok(dialog)
    }

    /// Process a provisional response on a forked dialog
    pub fn handle_provisional(
        &self,
        forked: &DialogHandle,
        message: &dyn SipMessage,
    ) -> DialogResult<()> {
        let rseq = message.rseq();
        {
            let dialog = forked.lock();
            Self::check_fork(&dialog)?;
            if let (Some(rseq), Some(last)) = (rseq, dialog.incoming_rseq) {
                if rseq <= last {
                    debug!("Dialog {} ignoring RSeq {} (last {})", dialog.id, rseq, last);
                    return Ok(());
                }
            }
        }

        self.notify_received(forked, message);

        let mut events = Vec::new();
        {
            let mut dialog = forked.lock();
            Self::check_fork(&dialog)?;
            self.route_sets.initialize(&mut dialog, message, false)?;
            dialog.provisional_seen = true;
            if matches!(dialog.state, DialogState::Idle | DialogState::Inviting) {
                events.extend(dialog.transition(DialogState::Early));
            }
            if rseq.is_some() {
                dialog.incoming_rseq = rseq;
            }
            fork_timer::arm(
                forked,
                &mut dialog,
                Arc::downgrade(&self.registry),
                self.observer.clone(),
            );
        }
        self.observer.on_events(events);

        if let Some(rseq) = rseq {
            self.delegate.reliable_provisional_received(forked, rseq, message)?;
        }
        Ok(())
    }

    /// Process the first 2xx on a forked dialog
    ///
    /// A 2xx on an already confirmed fork is a retransmission and is ignored.
    /// The timer is only disarmed once the confirmed route-set is built, so a
    /// failed build leaves the fork as it was.
    pub fn handle_first_2xx(
        &self,
        forked: &DialogHandle,
        message: &dyn SipMessage,
    ) -> DialogResult<()> {
        {
            let dialog = forked.lock();
            Self::check_fork(&dialog)?;
            if dialog.state == DialogState::Confirmed {
                debug!("Dialog {} already confirmed, ignoring 2xx retransmission", dialog.id);
                return Ok(());
            }
        }

        self.notify_received(forked, message);

        let mut events = Vec::new();
        {
            let mut dialog = forked.lock();
            Self::check_fork(&dialog)?;
            self.route_sets.initialize(&mut dialog, message, true)?;
            fork_timer::disarm(&mut dialog);
            dialog.update_remote_target(message);
            events.extend(dialog.transition(DialogState::Confirmed));
        }
        self.observer.on_events(events);

        self.delegate.final_response_received(forked, message)
    }

    /// Terminate a fork whose setup failed before it processed a provisional
    /// response
    ///
    /// Original dialogs, confirmed forks and forks that have seen a
    /// provisional (whose timer owns their cleanup) are left alone. Returns
    /// whether the fork was terminated.
    pub fn abandon_on_failure(&self, dialog: &DialogHandle) -> bool {
        let abandon = {
            let d = dialog.lock();
            !d.is_original
                && !d.provisional_seen
                && !d.fork_timer_armed()
                && d.state.is_pre_confirmed()
        };
        if !abandon {
            return false;
        }
        warn!("Abandoning forked dialog {} after local failure", dialog.id());
        self.registry
            .terminate(dialog, TerminationReason::LocalFailure, self.observer.as_ref())
    }

    fn check_fork(dialog: &Dialog) -> DialogResult<()> {
        if dialog.is_original {
            return Err(DialogError::illegal_action(&format!(
                "dialog {} is an original dialog, not a fork",
                dialog.id
            )));
        }
        if dialog.state.is_terminated() {
            return Err(DialogError::illegal_action(&format!(
                "forked dialog {} is terminated",
                dialog.id
            )));
        }
        Ok(())
    }

    fn notify_received(&self, dialog: &DialogHandle, message: &dyn SipMessage) {
        let (Some(status_code), Some(cseq)) = (message.status_code(), message.cseq()) else {
            return;
        };
        self.observer.on_event(DialogEvent::MessageReceived {
            dialog_id: dialog.id(),
            status_code,
            method: cseq.method.clone(),
            cseq: cseq.seq,
        });
    }
}

/// Session state a fork inherits from its original
///
/// Taken under the original's lock and applied to the fork afterwards.
struct ForkSeed {
    original: OriginalRef,
    local_contact: Option<NameAddr>,
    outbound_proxy: Option<SipUri>,
    session_timer: SessionTimerSnapshot,
    auth_state: AuthSnapshot,
    is_hidden: bool,
    forked_1xx_timeout: Duration,
    local_cseq: u32,
}

impl ForkSeed {
    fn take(original: &DialogHandle) -> DialogResult<Self> {
        let generation = original.generation();
        let source = original.lock();
        if !source.forking_enabled {
            return Err(DialogError::unknown(&format!(
                "forking was disabled on dialog {} while creating a fork",
                source.id
            )));
        }
        Ok(Self {
            original: OriginalRef {
                id: source.id,
                generation,
            },
            local_contact: source.local_contact.clone(),
            outbound_proxy: source.outbound_proxy.clone(),
            session_timer: source.session_timer.clone(),
            auth_state: source.auth_state.clone(),
            is_hidden: source.is_hidden,
            forked_1xx_timeout: source.forked_1xx_timeout,
            local_cseq: source.local_cseq,
        })
    }

    fn apply(self, fork: &mut Dialog) {
        fork.forking_enabled = true;
        fork.local_contact = self.local_contact;
        fork.outbound_proxy = self.outbound_proxy;
        fork.session_timer = self.session_timer;
        fork.auth_state = self.auth_state;
        fork.is_hidden = self.is_hidden;
        fork.forked_1xx_timeout = self.forked_1xx_timeout;
        fork.local_cseq = fork.local_cseq.max(self.local_cseq);
        fork.original = Some(self.original);
        fork.state = if self.is_hidden {
            DialogState::Idle
        } else {
            DialogState::Early
        };
    }
}
