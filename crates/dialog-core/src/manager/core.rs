//! Core DialogManager Implementation
//!
//! The [`DialogManager`] ties the registry, route-set handling and forking
//! together behind the entry points the transaction layer calls:
//!
//! - create original dialogs (outgoing and incoming)
//! - dispatch inbound responses (see `protocol::response_handler`)
//! - prepare outbound requests and responses (see `response_lifecycle`)
//! - terminate dialogs
//!
//! ## Locking
//!
//! Every operation locks at most one dialog at a time. A dialog lock is never
//! held while touching the registry or calling the [`InviteDelegate`]. The
//! registry may lock a dialog under its own bucket guard, never the reverse.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DialogCoreConfig;
use crate::dialog::{Dialog, DialogHandle, DialogId, Direction, TerminationReason};
use crate::errors::{DialogError, DialogResult};
use crate::events::{DialogObserver, NullObserver};
use crate::forking::{ForkManager, InviteDelegate, NoopInviteDelegate};
use crate::message::{NameAddr, SipMessage, SipUri};
use crate::registry::DialogRegistry;
use crate::routing::RouteSetManager;
use crate::transaction::TransactionKey;

/// Parameters for a dialog we initiate
#[derive(Debug, Clone)]
pub struct OutgoingDialogParams {
    pub local_party: NameAddr,
    pub remote_party: NameAddr,
    /// Generated when absent
    pub call_id: Option<String>,
    /// Generated when absent
    pub local_tag: Option<String>,
    pub local_contact: Option<NameAddr>,
    pub outbound_proxy: Option<SipUri>,
    pub initial_cseq: u32,
    /// Overrides the configured default
    pub forking_enabled: Option<bool>,
    /// Overrides the configured default
    pub forked_1xx_timeout: Option<Duration>,
    /// Dialog serving an out-of-dialog subscription
    pub hidden: bool,
}

impl OutgoingDialogParams {
    pub fn new(local_party: NameAddr, remote_party: NameAddr) -> Self {
        Self {
            local_party,
            remote_party,
            call_id: None,
            local_tag: None,
            local_contact: None,
            outbound_proxy: None,
            initial_cseq: 1,
            forking_enabled: None,
            forked_1xx_timeout: None,
            hidden: false,
        }
    }

    pub fn with_call_id(mut self, call_id: &str) -> Self {
        self.call_id = Some(call_id.to_string());
        self
    }

    pub fn with_local_tag(mut self, tag: &str) -> Self {
        self.local_tag = Some(tag.to_string());
        self
    }

    pub fn with_local_contact(mut self, contact: NameAddr) -> Self {
        self.local_contact = Some(contact);
        self
    }

    pub fn with_outbound_proxy(mut self, proxy: SipUri) -> Self {
        self.outbound_proxy = Some(proxy);
        self
    }

    pub fn with_forking(mut self, enabled: bool) -> Self {
        self.forking_enabled = Some(enabled);
        self
    }

    pub fn with_forked_1xx_timeout(mut self, timeout: Duration) -> Self {
        self.forked_1xx_timeout = Some(timeout);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Dialog orchestration entry points
pub struct DialogManager {
    pub(crate) config: DialogCoreConfig,
    pub(crate) registry: Arc<DialogRegistry>,
    pub(crate) route_sets: RouteSetManager,
    pub(crate) forks: ForkManager,
    pub(crate) observer: Arc<dyn DialogObserver>,
    pub(crate) delegate: Arc<dyn InviteDelegate>,
}

impl DialogManager {
    /// Create a manager; fails if the configuration is invalid
    pub fn new(
        config: DialogCoreConfig,
        observer: Arc<dyn DialogObserver>,
        delegate: Arc<dyn InviteDelegate>,
    ) -> DialogResult<Self> {
        config.validate()?;

        let registry = Arc::new(DialogRegistry::new());
        let route_sets = RouteSetManager::from_config(&config);
        let forks = ForkManager::new(
            registry.clone(),
            route_sets.clone(),
            observer.clone(),
            delegate.clone(),
        );

        info!(
            "Dialog manager ready (forking {}, fork timer {:?})",
            if config.forking_enabled { "enabled" } else { "disabled" },
            config.forked_1xx_timeout()
        );

        Ok(Self {
            config,
            registry,
            route_sets,
            forks,
            observer,
            delegate,
        })
    }

    /// Manager without observer or INVITE delegate
    pub fn with_config(config: DialogCoreConfig) -> DialogResult<Self> {
        Self::new(config, Arc::new(NullObserver), Arc::new(NoopInviteDelegate))
    }

    pub fn config(&self) -> &DialogCoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<DialogRegistry> {
        &self.registry
    }

    pub fn route_sets(&self) -> &RouteSetManager {
        &self.route_sets
    }

    pub fn forks(&self) -> &ForkManager {
        &self.forks
    }

    /// Get a registered dialog
    pub fn get_dialog(&self, id: DialogId) -> DialogResult<DialogHandle> {
        self.registry
            .get(id)
            .ok_or_else(|| DialogError::not_found(&format!("dialog {} not found", id)))
    }

    /// Create and register a dialog for a request we are about to send
    pub fn create_outgoing_dialog(
        &self,
        params: OutgoingDialogParams,
    ) -> DialogResult<DialogHandle> {
        let call_id = params
            .call_id
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let local_tag = params.local_tag.unwrap_or_else(Dialog::generate_local_tag);

        let mut local_party = params.local_party;
        local_party.set_tag(&local_tag);

        let mut dialog = Dialog::new(
            call_id,
            local_party,
            params.remote_party,
            Some(local_tag),
            None,
            Direction::Outgoing,
        )
        .with_max_route_entries(self.config.max_route_entries);

        dialog.local_cseq = params.initial_cseq;
        dialog.local_contact = params.local_contact;
        dialog.outbound_proxy = params.outbound_proxy;
        dialog.is_hidden = params.hidden;
        dialog.forking_enabled = params.forking_enabled.unwrap_or(self.config.forking_enabled);
        dialog.forked_1xx_timeout = params
            .forked_1xx_timeout
            .unwrap_or_else(|| self.config.forked_1xx_timeout());

        let key = dialog.key();
        let handle = DialogHandle::new(dialog);
        self.registry.insert(key, true, handle.clone())?;

        debug!("Created outgoing dialog {} (call {})", handle.id(), handle.call_id());
        Ok(handle)
    }

    /// Create and register a dialog for a dialog-creating request we received
    ///
    /// The route-set is taken from the request's Record-Route headers and is
    /// final from the start.
    pub fn create_incoming_dialog(&self, request: &dyn SipMessage) -> DialogResult<DialogHandle> {
        let method = request
            .method()
            .ok_or_else(|| {
                DialogError::bad_parameter("cannot create an incoming dialog from a response")
            })?;
        if !method.creates_dialog() {
            return Err(DialogError::illegal_action(&format!(
                "{} does not create a dialog",
                method
            )));
        }

        let tx_key = TransactionKey::from_message(request)?;
        let (Some(from), Some(to)) = (request.from_header(), request.to_header()) else {
            return Err(DialogError::bad_parameter("request has no From or To header"));
        };

        let local_tag = to
            .tag()
            .map(str::to_string)
            .unwrap_or_else(Dialog::generate_local_tag);
        let mut local_party = to.clone();
        local_party.set_tag(&local_tag);

        let mut dialog = Dialog::new(
            tx_key.call_id.clone(),
            local_party,
            from.clone(),
            Some(local_tag),
            tx_key.from_tag.clone(),
            Direction::Incoming,
        )
        .with_max_route_entries(self.config.max_route_entries);

        dialog.remote_cseq = tx_key.cseq;
        dialog.update_remote_target(request);
        self.route_sets.initialize(&mut dialog, request, true)?;

        let key = dialog.key();
        let handle = DialogHandle::new(dialog);
        self.registry.insert(key, true, handle.clone())?;

        debug!("Created incoming dialog {} for {}", handle.id(), tx_key);
        Ok(handle)
    }

    /// Terminate a dialog and unregister it
    ///
    /// Returns false if the dialog was already terminated.
    pub fn terminate(&self, dialog: &DialogHandle, reason: TerminationReason) -> bool {
        info!("Terminating dialog {}: {}", dialog.id(), reason);
        self.registry.terminate(dialog, reason, self.observer.as_ref())
    }

    /// Number of registered dialogs
    pub fn dialog_count(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::DialogState;
    use crate::message::{Message, Method};

    fn manager() -> DialogManager {
        DialogManager::with_config(DialogCoreConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DialogCoreConfig::default().with_max_route_entries(0);
        assert!(DialogManager::with_config(config).is_err());
    }

    #[test]
    fn test_create_outgoing_dialog_registers_original() {
        let mgr = manager();
        let params = OutgoingDialogParams::new(
            "<sip:alice@a.example.com>".parse().unwrap(),
            "<sip:bob@b.example.com>".parse().unwrap(),
        )
        .with_call_id("out-1")
        .with_local_tag("a1")
        .with_forking(true);

        let handle = mgr.create_outgoing_dialog(params).unwrap();
        let dialog = handle.lock();
        assert!(dialog.is_original);
        assert!(dialog.forking_enabled);
        assert_eq!(dialog.state, DialogState::Idle);
        assert_eq!(dialog.local_party.tag(), Some("a1"));
        assert_eq!(dialog.forked_1xx_timeout, Duration::from_secs(180));
        drop(dialog);

        assert_eq!(mgr.dialog_count(), 1);
        assert!(mgr.get_dialog(handle.id()).is_ok());
    }

    #[test]
    fn test_create_incoming_dialog_confirms_route_set() {
        let mgr = manager();
        let invite = Message::request(Method::Invite, SipUri::sip("b.example.com").with_user("bob"))
            .with_call_id("in-1")
            .with_from("<sip:alice@a.example.com>;tag=a1".parse().unwrap())
            .with_to("<sip:bob@b.example.com>".parse().unwrap())
            .with_cseq(7, Method::Invite)
            .with_contact("<sip:alice@192.0.2.1>".parse().unwrap())
            .with_record_route("<sip:p1.example.com;lr>".parse().unwrap());

        let handle = mgr.create_incoming_dialog(&invite).unwrap();
        let dialog = handle.lock();
        assert_eq!(dialog.direction, Direction::Incoming);
        assert_eq!(dialog.remote_tag.as_deref(), Some("a1"));
        assert!(dialog.local_tag.is_some());
        assert_eq!(dialog.remote_cseq, 7);
        assert!(dialog.route_set.is_confirmed());
        assert_eq!(dialog.remote_target_or_party().host, "192.0.2.1");
    }

    #[test]
    fn test_create_incoming_dialog_rejects_non_dialog_methods() {
        let mgr = manager();
        let options = Message::request(Method::Options, SipUri::sip("b.example.com"));
        assert!(matches!(
            mgr.create_incoming_dialog(&options),
            Err(DialogError::IllegalAction { .. })
        ));
        let response = Message::response(200, "OK");
        assert!(matches!(
            mgr.create_incoming_dialog(&response),
            Err(DialogError::BadParameter { .. })
        ));
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mgr = manager();
        let handle = mgr
            .create_outgoing_dialog(OutgoingDialogParams::new(
                "<sip:alice@a.example.com>".parse().unwrap(),
                "<sip:bob@b.example.com>".parse().unwrap(),
            ))
            .unwrap();
        assert!(mgr.terminate(&handle, TerminationReason::Normal));
        assert!(!mgr.terminate(&handle, TerminationReason::Normal));
        assert_eq!(mgr.dialog_count(), 0);
    }
}
