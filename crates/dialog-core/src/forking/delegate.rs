//! INVITE-layer callbacks

use crate::dialog::DialogHandle;
use crate::errors::DialogResult;
use crate::message::SipMessage;

/// Routines owned by the INVITE layer that dialog processing hands off to
///
/// Called with no dialog lock held. Both default to doing nothing.
pub trait InviteDelegate: Send + Sync {
    /// A reliable provisional response (carrying RSeq) was accepted on
    /// `dialog`; a PRACK is due
    fn reliable_provisional_received(
        &self,
        _dialog: &DialogHandle,
        _rseq: u32,
        _message: &dyn SipMessage,
    ) -> DialogResult<()> {
        Ok(())
    }

    /// A 2xx confirmed `dialog`; an ACK is due
    fn final_response_received(
        &self,
        _dialog: &DialogHandle,
        _message: &dyn SipMessage,
    ) -> DialogResult<()> {
        Ok(())
    }
}

/// Delegate that ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInviteDelegate;

impl InviteDelegate for NoopInviteDelegate {}
