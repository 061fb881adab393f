//! Dialog implementation for RFC 3261 SIP dialogs
//!
//! This module contains the main Dialog record: SIP identity, sequencing,
//! the route-set, and the per-dialog fork timer. The record is always reached
//! through a [`DialogHandle`](super::DialogHandle), whose mutex serializes
//! every mutation.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::DEFAULT_MAX_ROUTE_ENTRIES;
use crate::events::DialogEvent;
use crate::forking::ForkTimer;
use crate::message::{NameAddr, SipMessage, SipUri};
use crate::routing::{DialogKey, RouteSet};

use super::dialog_id::DialogId;
use super::dialog_state::{DialogState, Direction, TerminationReason};
use super::session_state::{AuthSnapshot, SessionTimerSnapshot};

/// Back-reference from a forked dialog to its original
///
/// Never dereferenced directly: it is resolved through the registry, which
/// checks that the generation still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalRef {
    pub id: DialogId,
    pub generation: u64,
}

/// A SIP dialog as defined in RFC 3261
#[derive(Debug)]
pub struct Dialog {
    /// Unique identifier for this dialog
    pub id: DialogId,

    /// Current state of the dialog
    pub state: DialogState,

    /// Call-ID for this dialog
    pub call_id: String,

    /// Local party (From for outgoing dialogs, To for incoming)
    pub local_party: NameAddr,

    /// Remote party
    pub remote_party: NameAddr,

    pub local_tag: Option<String>,
    pub remote_tag: Option<String>,

    /// Local sequence number
    pub local_cseq: u32,

    /// Remote sequence number
    pub remote_cseq: u32,

    pub direction: Direction,

    /// Whether responses with novel To-tags may create forked dialogs
    pub forking_enabled: bool,

    /// Dialog serving an out-of-dialog subscription
    pub is_hidden: bool,

    /// False for dialogs created by forking
    pub is_original: bool,

    /// Set on forked dialogs only
    pub original: Option<OriginalRef>,

    /// Remote target URI (where to send requests), learned from Contact
    pub remote_target: Option<SipUri>,

    pub local_contact: Option<NameAddr>,
    pub remote_contact: Option<NameAddr>,

    /// Outbound proxy for requests sent in this dialog
    pub outbound_proxy: Option<SipUri>,

    pub session_timer: SessionTimerSnapshot,
    pub auth_state: AuthSnapshot,

    /// Last RSeq seen on a reliable provisional response
    pub incoming_rseq: Option<u32>,

    /// Set once a forked dialog has processed a provisional response
    pub provisional_seen: bool,

    /// Delay before an unanswered fork is abandoned; zero disables the timer
    pub forked_1xx_timeout: Duration,

    pub termination_reason: Option<TerminationReason>,

    /// Route set for this dialog
    pub route_set: RouteSet,

    /// Abandonment timer, armed on forked dialogs only
    pub fork_timer: Option<ForkTimer>,

    pub created_at: Instant,
}

impl Dialog {
    /// Create a new dialog in the `Idle` state
    pub fn new(
        call_id: String,
        local_party: NameAddr,
        remote_party: NameAddr,
        local_tag: Option<String>,
        remote_tag: Option<String>,
        direction: Direction,
    ) -> Self {
        Self {
            id: DialogId::new(),
            state: DialogState::Idle,
            call_id,
            local_party,
            remote_party,
            local_tag,
            remote_tag,
            local_cseq: 0,
            remote_cseq: 0,
            direction,
            forking_enabled: false,
            is_hidden: false,
            is_original: true,
            original: None,
            remote_target: None,
            local_contact: None,
            remote_contact: None,
            outbound_proxy: None,
            session_timer: SessionTimerSnapshot::default(),
            auth_state: AuthSnapshot::default(),
            incoming_rseq: None,
            provisional_seen: false,
            forked_1xx_timeout: Duration::ZERO,
            termination_reason: None,
            route_set: RouteSet::new(DEFAULT_MAX_ROUTE_ENTRIES),
            fork_timer: None,
            created_at: Instant::now(),
        }
    }

    /// Replace the route-set with an empty one bounded to `limit` entries
    pub fn with_max_route_entries(mut self, limit: usize) -> Self {
        self.route_set = RouteSet::new(limit);
        self
    }

    /// Generate a local tag
    pub fn generate_local_tag() -> String {
        format!("{:08x}", rand::random::<u32>())
    }

    /// Registry key for this dialog
    ///
    /// Tags are laid out as they appear in the dialog-creating request:
    /// the caller's tag is always the From-tag.
    pub fn key(&self) -> DialogKey {
        let (from_tag, to_tag) = match self.direction {
            Direction::Outgoing => (self.local_tag.clone(), self.remote_tag.clone()),
            Direction::Incoming => (self.remote_tag.clone(), self.local_tag.clone()),
        };
        DialogKey {
            call_id: self.call_id.clone(),
            from_tag,
            to_tag,
            direction: self.direction,
        }
    }

    /// Move to `new_state`, returning the change notification if the state
    /// actually changed
    pub fn transition(&mut self, new_state: DialogState) -> Option<DialogEvent> {
        if self.state == new_state {
            return None;
        }
        let old_state = self.state;
        self.state = new_state;
        debug!("Dialog {} {} -> {}", self.id, old_state, new_state);
        Some(DialogEvent::StateChanged {
            dialog_id: self.id,
            old_state,
            new_state,
        })
    }

    /// Where in-dialog requests go when no route-set overrides it
    pub fn remote_target_or_party(&self) -> &SipUri {
        self.remote_target.as_ref().unwrap_or(&self.remote_party.uri)
    }

    /// Take the remote target from the message's first Contact, if any
    pub fn update_remote_target(&mut self, message: &dyn SipMessage) {
        if let Some(contact) = message.contact() {
            self.remote_target = Some(contact.uri.clone());
            self.remote_contact = Some(contact.clone());
        }
    }

    /// Whether the fork timer is currently armed
    pub fn fork_timer_armed(&self) -> bool {
        self.fork_timer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, Method};

    fn party(user: &str) -> NameAddr {
        NameAddr::new(SipUri::sip("example.com").with_user(user))
    }

    #[test]
    fn test_key_orientation() {
        let outgoing = Dialog::new(
            "c1".into(),
            party("alice"),
            party("bob"),
            Some("a".into()),
            Some("b".into()),
            Direction::Outgoing,
        );
        let key = outgoing.key();
        assert_eq!(key.from_tag.as_deref(), Some("a"));
        assert_eq!(key.to_tag.as_deref(), Some("b"));

        let incoming = Dialog::new(
            "c1".into(),
            party("bob"),
            party("alice"),
            Some("b".into()),
            Some("a".into()),
            Direction::Incoming,
        );
        let key = incoming.key();
        assert_eq!(key.from_tag.as_deref(), Some("a"));
        assert_eq!(key.to_tag.as_deref(), Some("b"));
    }

    #[test]
    fn test_transition_reports_only_changes() {
        let mut dialog =
            Dialog::new("c2".into(), party("a"), party("b"), None, None, Direction::Outgoing);
        assert!(dialog.transition(DialogState::Idle).is_none());
        match dialog.transition(DialogState::Early) {
            Some(DialogEvent::StateChanged { old_state, new_state, .. }) => {
                assert_eq!(old_state, DialogState::Idle);
                assert_eq!(new_state, DialogState::Early);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_remote_target_from_contact() {
        let mut dialog =
            Dialog::new("c3".into(), party("a"), party("b"), None, None, Direction::Outgoing);
        assert_eq!(dialog.remote_target_or_party().user.as_deref(), Some("b"));

        let response = Message::response(200, "OK")
            .with_cseq(1, Method::Invite)
            .with_contact(NameAddr::new(SipUri::sip("10.0.0.9").with_user("b")));
        dialog.update_remote_target(&response);
        assert_eq!(dialog.remote_target_or_party().host, "10.0.0.9");
    }

    #[test]
    fn test_local_tag_format() {
        let tag = Dialog::generate_local_tag();
        assert_eq!(tag.len(), 8);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
