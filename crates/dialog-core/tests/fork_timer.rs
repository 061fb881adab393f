//! Fork abandonment timer tests
//!
//! Run on a paused clock so the timer deadline can be approached to the
//! millisecond.

mod common;

use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use common::*;
use sipleg_dialog_core::{
    DialogError, DialogEvent, DialogState, ResponseDisposition, TerminationReason,
};

#[tokio::test(start_paused = true)]
async fn test_unanswered_fork_is_abandoned_at_deadline() -> Result<(), DialogError> {
    let (manager, mut rx) = forking_manager(Duration::from_millis(5000));
    let original = invite_dialog(&manager);
    manager.handle_response(&original, &invite_response(180, "b1", &[]))?;

    let ResponseDisposition::Forked { dialog: fork, .. } =
        manager.handle_response(&original, &invite_response(180, "b2", &[]))?
    else {
        panic!("expected a fork");
    };
    assert!(fork.lock().fork_timer_armed());
    drain(&mut rx);

    sleep(Duration::from_millis(4999)).await;
    assert_eq!(fork.state(), DialogState::Early);
    assert!(manager.get_dialog(fork.id()).is_ok());

    sleep(Duration::from_millis(2)).await;
    assert_eq!(fork.state(), DialogState::Terminated);
    assert_eq!(
        fork.lock().termination_reason,
        Some(TerminationReason::ForkedCallNoFinalResponse)
    );
    assert!(manager.get_dialog(fork.id()).unwrap_err().is_not_found());

    // Only the fork goes away
    assert_eq!(original.state(), DialogState::Early);
    assert_eq!(manager.dialog_count(), 1);

    let events = drain(&mut rx);
    assert!(events.contains(&DialogEvent::Terminated {
        dialog_id: fork.id(),
        reason: TerminationReason::ForkedCallNoFinalResponse,
    }));

    info!("✅ Fork abandoned after 5000 ms without a final response");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timer_is_not_refreshed_by_later_provisionals() -> Result<(), DialogError> {
    let (manager, _rx) = forking_manager(Duration::from_millis(5000));
    let original = invite_dialog(&manager);
    manager.handle_response(&original, &invite_response(180, "b1", &[]))?;
    manager.handle_response(&original, &invite_response(180, "b2", &[]))?;
    let fork = manager
        .registry()
        .dialogs_for_call(CALL_ID)
        .into_iter()
        .find(|d| !d.lock().is_original)
        .expect("fork registered");

    sleep(Duration::from_millis(3000)).await;
    manager.handle_response(&original, &invite_response(183, "b2", &[]))?;
    assert_eq!(fork.state(), DialogState::Early);

    sleep(Duration::from_millis(2001)).await;
    assert_eq!(fork.state(), DialogState::Terminated);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_2xx_disarms_timer() -> Result<(), DialogError> {
    let (manager, _rx) = forking_manager(Duration::from_millis(5000));
    let original = invite_dialog(&manager);
    manager.handle_response(&original, &invite_response(180, "b1", &[]))?;

    let ResponseDisposition::Forked { dialog: fork, .. } =
        manager.handle_response(&original, &invite_response(180, "b2", &[]))?
    else {
        panic!("expected a fork");
    };

    sleep(Duration::from_millis(1000)).await;
    manager.handle_response(&original, &invite_response(200, "b2", &[]))?;
    assert!(!fork.lock().fork_timer_armed());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(fork.state(), DialogState::Confirmed);
    assert!(fork.lock().termination_reason.is_none());
    assert_eq!(manager.dialog_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_never_arms() -> Result<(), DialogError> {
    let (manager, _rx) = forking_manager(Duration::ZERO);
    let original = invite_dialog(&manager);
    manager.handle_response(&original, &invite_response(180, "b1", &[]))?;

    let ResponseDisposition::Forked { dialog: fork, .. } =
        manager.handle_response(&original, &invite_response(180, "b2", &[]))?
    else {
        panic!("expected a fork");
    };
    assert!(!fork.lock().fork_timer_armed());

    sleep(Duration::from_secs(600)).await;
    assert_eq!(fork.state(), DialogState::Early);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_explicit_termination_beats_timer() -> Result<(), DialogError> {
    let (manager, mut rx) = forking_manager(Duration::from_millis(5000));
    let original = invite_dialog(&manager);
    manager.handle_response(&original, &invite_response(180, "b1", &[]))?;

    let ResponseDisposition::Forked { dialog: fork, .. } =
        manager.handle_response(&original, &invite_response(180, "b2", &[]))?
    else {
        panic!("expected a fork");
    };

    assert!(manager.terminate(&fork, TerminationReason::Normal));
    assert!(!fork.lock().fork_timer_armed());
    drain(&mut rx);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(fork.lock().termination_reason, Some(TerminationReason::Normal));
    assert!(drain(&mut rx).is_empty());
    Ok(())
}
