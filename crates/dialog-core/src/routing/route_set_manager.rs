//! Route-set construction and application
//!
//! Builds a dialog's route-set from Record-Route headers and applies it to
//! the messages the dialog sends (RFC 3261 Sections 12.1 and 12.2.1.1).
//!
//! ## Stored order
//!
//! Entries are kept in the wire order of the Record-Route headers they came
//! from. The UAC walks the set tail-to-head when building Route headers, the
//! UAS head-to-tail, so neither side ever has to reverse stored data.
//!
//! ## Strict routers
//!
//! When the first hop a request will visit is a strict router (no `;lr`),
//! that hop becomes the Request-URI with its URI headers stripped, it is left
//! out of the Route headers, and the remote target is appended as the last
//! Route instead.

use tracing::{debug, warn};

use crate::config::DialogCoreConfig;
use crate::dialog::{Dialog, DialogState, Direction};
use crate::errors::{DialogError, DialogResult};
use crate::message::{Header, HeaderPosition, Method, RouteHop, SipMessage, SipUri};
use crate::transaction::TransactionInfo;

use super::route_arena::{RouteArena, RouteSetEntry};
use super::route_set::RouteSetState;

/// Builds and applies dialog route-sets
#[derive(Debug, Clone)]
pub struct RouteSetManager {
    max_route_entries: usize,
}

impl RouteSetManager {
    pub fn new(max_route_entries: usize) -> Self {
        Self { max_route_entries }
    }

    pub fn from_config(config: &DialogCoreConfig) -> Self {
        Self::new(config.max_route_entries)
    }

    pub fn max_route_entries(&self) -> usize {
        self.max_route_entries
    }

    /// Build the route-set from the Record-Route headers of `message`
    ///
    /// A confirmed set is built once, from the first 2xx, and replaces any
    /// provisional set. A provisional set is only built when no set exists.
    /// On `OutOfResources` the previous route-set is left untouched.
    pub fn initialize(
        &self,
        dialog: &mut Dialog,
        message: &dyn SipMessage,
        confirmed: bool,
    ) -> DialogResult<()> {
        if confirmed {
            self.initialize_confirmed(dialog, message)
        } else {
            self.initialize_provisional(dialog, message)
        }
    }

    fn initialize_confirmed(
        &self,
        dialog: &mut Dialog,
        message: &dyn SipMessage,
    ) -> DialogResult<()> {
        if dialog.route_set.is_confirmed() {
            debug!("Dialog {} already has a confirmed route-set", dialog.id);
            return Ok(());
        }

        let dialog_id = dialog.id;
        let arena = dialog.route_set.persistent_mut();
        let start = arena.len();
        let mut hops = Vec::new();
        for hop in message.record_routes() {
            match arena.alloc(RouteSetEntry::new(hop.clone())) {
                Ok(index) => hops.push(index),
                Err(e) => {
                    arena.truncate(start);
                    warn!("Dialog {} failed to build confirmed route-set: {}", dialog_id, e);
                    return Err(e);
                }
            }
        }

        dialog.route_set.discard_provisional();
        dialog.route_set.install_confirmed(hops);
        debug!(
            "Dialog {} route-set confirmed with {} entries",
            dialog_id,
            dialog.route_set.len()
        );
        Ok(())
    }

    fn initialize_provisional(
        &self,
        dialog: &mut Dialog,
        message: &dyn SipMessage,
    ) -> DialogResult<()> {
        if dialog.route_set.state() != RouteSetState::Unset {
            return Ok(());
        }

        let mut arena = RouteArena::new(self.max_route_entries);
        let mut hops = Vec::new();
        for hop in message.record_routes() {
            hops.push(arena.alloc(RouteSetEntry::new(hop.clone()))?);
        }

        if hops.is_empty() {
            return Ok(());
        }

        debug!("Dialog {} provisional route-set with {} entries", dialog.id, hops.len());
        dialog.route_set.install_provisional(arena, hops);
        Ok(())
    }

    /// Drop a provisional route-set; a confirmed one is kept
    pub fn discard_provisional(&self, dialog: &mut Dialog) {
        if dialog.route_set.discard_provisional() {
            debug!("Dialog {} provisional route-set discarded", dialog.id);
        }
    }

    pub fn is_empty(&self, dialog: &Dialog) -> bool {
        dialog.route_set.is_empty()
    }

    /// Whether an outbound request is sent without the dialog's routes
    ///
    /// An ACK for a failure response and a CANCEL belong to the INVITE
    /// transaction and reuse its Route headers until the dialog is confirmed.
    pub fn bypasses_route_set(
        &self,
        dialog: &Dialog,
        message: &dyn SipMessage,
        tx: &dyn TransactionInfo,
    ) -> bool {
        if dialog.state == DialogState::Confirmed {
            return false;
        }
        match message.method() {
            Some(Method::Ack) => tx.response_code().is_some_and(|code| code >= 300),
            Some(Method::Cancel) => true,
            _ => false,
        }
    }

    /// Add Route headers to an outbound request
    pub fn apply_to_outbound_request(
        &self,
        dialog: &Dialog,
        message: &mut dyn SipMessage,
        tx: &dyn TransactionInfo,
    ) {
        if dialog.route_set.is_empty() || self.bypasses_route_set(dialog, message, tx) {
            return;
        }
        self.push_routes(dialog, message);
    }

    /// Add Route headers to the ACK for an INVITE final response
    pub fn apply_to_2xx_ack(
        &self,
        dialog: &Dialog,
        response_code: u16,
        message: &mut dyn SipMessage,
    ) {
        if dialog.state != DialogState::Confirmed && response_code >= 300 {
            return;
        }
        if dialog.route_set.is_empty() {
            return;
        }
        self.push_routes(dialog, message);
    }

    /// Copy Record-Route into, or drop the route-set because of, an outbound
    /// response
    pub fn apply_to_outbound_response(
        &self,
        dialog: &mut Dialog,
        message: &mut dyn SipMessage,
        tx: &dyn TransactionInfo,
    ) {
        let Some(code) = message.status_code() else {
            debug!("Dialog {} asked to apply routes to a request as a response", dialog.id);
            return;
        };

        let method = tx.method();
        let establishing = match method {
            Method::Invite | Method::Refer => true,
            Method::Subscribe => tx.is_initial_subscription(),
            _ => false,
        };
        let connected = dialog.state == DialogState::Confirmed;

        if establishing && (101..300).contains(&code) && !connected {
            for entry in dialog.route_set.iter() {
                message.push_header(Header::RecordRoute(entry.hop.clone()), HeaderPosition::Tail);
            }
        } else if method == Method::Invite
            && !connected
            && code >= 300
            && !tx.preserve_route_set()
        {
            if !dialog.route_set.is_empty() {
                debug!("Dialog {} route-set dropped after {} response", dialog.id, code);
            }
            dialog.route_set.clear();
        }
    }

    /// Request-URI for the next in-dialog request, and whether the first
    /// Route header is the next hop
    pub fn effective_request_target(&self, dialog: &Dialog) -> DialogResult<(SipUri, bool)> {
        let entry = match dialog.direction {
            Direction::Outgoing => dialog.route_set.last(),
            Direction::Incoming => dialog.route_set.first(),
        }
        .ok_or_else(|| DialogError::not_found(&format!("dialog {} has no route-set", dialog.id)))?;

        if entry.loose {
            Ok((dialog.remote_target_or_party().clone(), true))
        } else {
            Ok((entry.hop.uri().without_headers(), false))
        }
    }

    fn push_routes(&self, dialog: &Dialog, message: &mut dyn SipMessage) {
        let set = &dialog.route_set;
        let (strict, ordered): (bool, Vec<&RouteSetEntry>) = match dialog.direction {
            Direction::Outgoing => (
                set.last().is_some_and(|e| !e.loose),
                set.iter().rev().collect(),
            ),
            Direction::Incoming => (set.first().is_some_and(|e| !e.loose), set.iter().collect()),
        };

        let skip = usize::from(strict);
        for entry in ordered.into_iter().skip(skip) {
            message.push_header(Header::Route(entry.hop.clone()), HeaderPosition::Tail);
        }
        if strict {
            let target = RouteHop::new(dialog.remote_target_or_party().clone());
            message.push_header(Header::Route(target), HeaderPosition::Tail);
        }
    }
}
