//! Shared helpers for dialog-core integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use sipleg_dialog_core::{
    DialogCoreConfig, DialogEvent, DialogHandle, DialogManager, Message, Method, NameAddr,
    NoopInviteDelegate, OutgoingDialogParams, SipUri,
};

pub const CALL_ID: &str = "a84b4c76e66710@pc33.atlanta.example.com";
pub const LOCAL_TAG: &str = "1928301774";

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Manager with forking enabled and a channel observer
pub fn forking_manager(
    fork_timeout: Duration,
) -> (DialogManager, mpsc::UnboundedReceiver<DialogEvent>) {
    init_tracing();
    let (tx, rx) = mpsc::unbounded_channel();
    let config = DialogCoreConfig::default()
        .with_forking(true)
        .with_forked_1xx_timeout(fork_timeout);
    let manager = DialogManager::new(config, Arc::new(tx), Arc::new(NoopInviteDelegate))
        .expect("valid config");
    (manager, rx)
}

pub fn alice() -> NameAddr {
    "\"Alice\" <sip:alice@atlanta.example.com>".parse().expect("alice")
}

pub fn bob() -> NameAddr {
    "Bob <sip:bob@biloxi.example.com>".parse().expect("bob")
}

/// Outgoing INVITE dialog from Alice to Bob
pub fn invite_dialog(manager: &DialogManager) -> DialogHandle {
    manager
        .create_outgoing_dialog(
            OutgoingDialogParams::new(alice(), bob())
                .with_call_id(CALL_ID)
                .with_local_tag(LOCAL_TAG)
                .with_local_contact(NameAddr::new(
                    SipUri::sip("pc33.atlanta.example.com").with_user("alice"),
                )),
        )
        .expect("dialog created")
}

/// Response to Alice's INVITE from the UAS identified by `to_tag`
pub fn invite_response(code: u16, to_tag: &str, record_routes: &[&str]) -> Message {
    let mut response = Message::response(code, "Test")
        .with_call_id(CALL_ID)
        .with_from(alice().with_tag(LOCAL_TAG))
        .with_to(bob().with_tag(to_tag))
        .with_cseq(314159, Method::Invite)
        .with_contact(NameAddr::new(
            SipUri::sip(&format!("{}.biloxi.example.com", to_tag)).with_user("bob"),
        ));
    for route in record_routes {
        response = response.with_record_route(route.parse().expect("record-route"));
    }
    response
}

/// Drain every event currently queued
pub fn drain(rx: &mut mpsc::UnboundedReceiver<DialogEvent>) -> Vec<DialogEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
