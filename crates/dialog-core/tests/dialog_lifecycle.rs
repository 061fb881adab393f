//! Dialog lifecycle tests
//!
//! Covers configuration loading, the event stream, INVITE delegate
//! callbacks and failure handling on the fork path.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::info;

use common::*;
use sipleg_dialog_core::{
    DialogCoreConfig, DialogError, DialogEvent, DialogHandle, DialogManager, DialogResult,
    DialogState, InviteDelegate, Message, Method, ResponseDisposition, SipMessage, SipUri,
    TerminationReason, TransactionSnapshot,
};

#[derive(Default)]
struct RecordingDelegate {
    prack_due: Mutex<Vec<u32>>,
    ack_due: Mutex<Vec<u16>>,
    fail_prack: bool,
}

impl InviteDelegate for RecordingDelegate {
    fn reliable_provisional_received(
        &self,
        _dialog: &DialogHandle,
        rseq: u32,
        _message: &dyn SipMessage,
    ) -> DialogResult<()> {
        self.prack_due.lock().push(rseq);
        if self.fail_prack {
            return Err(DialogError::protocol_error("PRACK could not be sent"));
        }
        Ok(())
    }

    fn final_response_received(
        &self,
        _dialog: &DialogHandle,
        message: &dyn SipMessage,
    ) -> DialogResult<()> {
        self.ack_due.lock().extend(message.status_code());
        Ok(())
    }
}

fn manager_with(
    config: DialogCoreConfig,
    delegate: Arc<RecordingDelegate>,
) -> (DialogManager, mpsc::UnboundedReceiver<DialogEvent>) {
    init_tracing();
    let (tx, rx) = mpsc::unbounded_channel();
    let manager = DialogManager::new(config, Arc::new(tx), delegate).expect("valid config");
    (manager, rx)
}

#[test]
fn test_config_from_toml() {
    let config = DialogCoreConfig::from_toml_str(
        r#"
        forking_enabled = true
        forked_1xx_timeout_ms = 32000
        max_route_entries = 16
        "#,
    )
    .unwrap();
    assert!(config.forking_enabled);
    assert_eq!(config.forked_1xx_timeout(), Duration::from_secs(32));

    let manager = DialogManager::with_config(config).unwrap();
    assert_eq!(manager.route_sets().max_route_entries(), 16);

    let err = DialogCoreConfig::from_toml_str("max_route_entries = 0").unwrap_err();
    assert!(matches!(err, DialogError::Configuration { .. }));
    assert!(DialogCoreConfig::from_toml_str("forking_enabled = \"yes\"").is_err());
}

#[tokio::test]
async fn test_event_stream_for_answered_call() -> Result<(), DialogError> {
    let (manager, mut rx) = forking_manager(Duration::from_secs(180));
    let dialog = invite_dialog(&manager);

    let bob_uri = SipUri::sip("biloxi.example.com").with_user("bob");
    let mut invite = Message::request(Method::Invite, bob_uri)
        .with_call_id(CALL_ID)
        .with_cseq(314159, Method::Invite);
    manager.prepare_request(&dialog, &mut invite, &TransactionSnapshot::new(Method::Invite))?;
    assert_eq!(dialog.state(), DialogState::Inviting);

    manager.handle_response(&dialog, &invite_response(100, "", &[]))?;
    manager.handle_response(&dialog, &invite_response(180, "b1", &[]))?;
    manager.handle_response(&dialog, &invite_response(200, "b1", &[]))?;

    let mut bye_ok = Message::response(200, "OK")
        .with_call_id(CALL_ID)
        .with_from(alice().with_tag(LOCAL_TAG))
        .with_to(bob().with_tag("b1"))
        .with_cseq(314160, Method::Bye);
    manager.handle_response(&dialog, &bye_ok)?;
    assert_eq!(dialog.state(), DialogState::Terminated);
    assert_eq!(dialog.lock().termination_reason, Some(TerminationReason::Normal));

    let id = dialog.id();
    let states: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            DialogEvent::StateChanged { dialog_id, new_state, .. } if dialog_id == id => {
                Some(new_state)
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            DialogState::Inviting,
            DialogState::Early,
            DialogState::Confirmed,
            DialogState::Terminated
        ]
    );

    // Terminated dialogs refuse further traffic
    bye_ok.headers.clear();
    assert!(manager.handle_response(&dialog, &bye_ok).is_err());

    info!("✅ Event stream follows the call");
    Ok(())
}

#[tokio::test]
async fn test_events_serialize_for_export() -> Result<(), DialogError> {
    let (manager, mut rx) = forking_manager(Duration::from_secs(180));
    let dialog = invite_dialog(&manager);
    manager.handle_response(&dialog, &invite_response(180, "b1", &[]))?;

    let events = drain(&mut rx);
    let received = events
        .iter()
        .find(|e| matches!(e, DialogEvent::MessageReceived { .. }))
        .expect("message event");
    let json = serde_json::to_value(received).unwrap();
    assert_eq!(json["MessageReceived"]["status_code"], 180);
    assert_eq!(json["MessageReceived"]["cseq"], 314159);
    Ok(())
}

#[tokio::test]
async fn test_delegate_sees_prack_and_ack_duties() -> Result<(), DialogError> {
    let delegate = Arc::new(RecordingDelegate::default());
    let config = DialogCoreConfig::default().with_forking(true);
    let (manager, _rx) = manager_with(config, delegate.clone());
    let original = invite_dialog(&manager);
    manager.handle_response(&original, &invite_response(180, "b1", &[]))?;

    manager.handle_response(&original, &invite_response(183, "b2", &[]).with_rseq(1))?;
    manager.handle_response(&original, &invite_response(183, "b2", &[]).with_rseq(1))?;
    manager.handle_response(&original, &invite_response(200, "b2", &[]))?;
    manager.handle_response(&original, &invite_response(200, "b1", &[]))?;

    assert_eq!(*delegate.prack_due.lock(), vec![1]);
    assert_eq!(*delegate.ack_due.lock(), vec![200, 200]);
    Ok(())
}

#[tokio::test]
async fn test_failure_before_timer_abandons_only_the_fork() -> Result<(), DialogError> {
    let delegate = Arc::new(RecordingDelegate::default());
    let config = DialogCoreConfig::default()
        .with_forking(true)
        .with_max_route_entries(1);
    let (manager, mut rx) = manager_with(config, delegate);
    let original = invite_dialog(&manager);
    manager.handle_response(&original, &invite_response(180, "b1", &[]))?;
    drain(&mut rx);

    let err = manager
        .handle_response(
            &original,
            &invite_response(180, "b2", &["<sip:p1.example.com;lr>", "<sip:p2.example.com;lr>"]),
        )
        .unwrap_err();
    assert!(matches!(err, DialogError::OutOfResources { .. }));

    let abandoned = drain(&mut rx).into_iter().find_map(|e| match e {
        DialogEvent::Terminated { dialog_id, reason } => Some((dialog_id, reason)),
        _ => None,
    });
    let (fork_id, reason) = abandoned.expect("fork terminated");
    assert_ne!(fork_id, original.id());
    assert_eq!(reason, TerminationReason::LocalFailure);

    assert_eq!(original.state(), DialogState::Early);
    assert_eq!(manager.dialog_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failure_after_timer_leaves_fork_to_timer() -> Result<(), DialogError> {
    let delegate = Arc::new(RecordingDelegate {
        fail_prack: true,
        ..Default::default()
    });
    let config = DialogCoreConfig::default()
        .with_forking(true)
        .with_forked_1xx_timeout(Duration::from_millis(500));
    let (manager, _rx) = manager_with(config, delegate);
    let original = invite_dialog(&manager);
    manager.handle_response(&original, &invite_response(180, "b1", &[]))?;

    let result = manager.handle_response(&original, &invite_response(183, "b2", &[]).with_rseq(1));
    assert!(matches!(result, Err(DialogError::Protocol { .. })));

    let fork = manager
        .registry()
        .dialogs_for_call(CALL_ID)
        .into_iter()
        .find(|d| !d.lock().is_original)
        .expect("fork kept alive");
    assert_eq!(fork.state(), DialogState::Early);

    sleep(Duration::from_millis(501)).await;
    assert_eq!(
        fork.lock().termination_reason,
        Some(TerminationReason::ForkedCallNoFinalResponse)
    );
    Ok(())
}

#[tokio::test]
async fn test_original_rejection_is_final() -> Result<(), DialogError> {
    let (manager, _rx) = forking_manager(Duration::from_secs(180));
    let dialog = invite_dialog(&manager);

    let disposition = manager.handle_response(&dialog, &invite_response(603, "b1", &[]))?;
    assert!(matches!(disposition, ResponseDisposition::Original));
    assert_eq!(
        dialog.lock().termination_reason,
        Some(TerminationReason::FinalResponse(603))
    );
    assert!(manager.get_dialog(dialog.id()).is_err());
    Ok(())
}
