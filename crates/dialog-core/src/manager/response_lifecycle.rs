//! Outbound Message Lifecycle
//!
//! Hooks the transaction layer calls just before a message leaves:
//!
//! ```text
//! UAC / UAS, in-dialog request:
//!   prepare_request()  → Request-URI from route-set, Route headers
//!
//! UAC, ACK for an INVITE final response:
//!   prepare_ack()      → Route headers unless the INVITE failed
//!
//! UAS, response to a dialog-creating request:
//!   prepare_response() → Record-Route copy, Early / Confirmed / Terminated
//! ```

use tracing::debug;

use crate::dialog::{DialogHandle, DialogState, Direction, TerminationReason};
use crate::errors::{DialogError, DialogResult};
use crate::message::{Method, SipMessage};
use crate::transaction::TransactionInfo;

use super::core::DialogManager;

impl DialogManager {
    /// Apply the dialog's routing to an outbound request
    ///
    /// The Request-URI becomes the route-set's effective target, or the
    /// remote target when there is no route-set. Route headers are added
    /// unless the request reuses its INVITE transaction's routing (CANCEL,
    /// ACK for a failure response).
    pub fn prepare_request(
        &self,
        dialog: &DialogHandle,
        request: &mut dyn SipMessage,
        tx: &dyn TransactionInfo,
    ) -> DialogResult<()> {
        let method = request
            .method()
            .ok_or_else(|| DialogError::bad_parameter("prepare_request called with a response"))?;

        let mut events = Vec::new();
        {
            let mut d = dialog.lock();
            if self.route_sets.bypasses_route_set(&d, request, tx) {
                debug!("Dialog {} sends {} without its route-set", d.id, method);
                return Ok(());
            }
            if d.state.is_terminated() {
                return Err(DialogError::illegal_action(&format!(
                    "cannot send {} on terminated dialog {}",
                    method, d.id
                )));
            }

            if !d.route_set.is_empty() {
                let (target, _) = self.route_sets.effective_request_target(&d)?;
                request.set_request_uri(target)?;
                self.route_sets.apply_to_outbound_request(&d, request, tx);
            } else if let Some(target) = d.remote_target.clone() {
                request.set_request_uri(target)?;
            }

            if !matches!(method, Method::Ack | Method::Cancel) {
                if let Some(cseq) = request.cseq() {
                    d.local_cseq = d.local_cseq.max(cseq.seq);
                }
            }

            if method == Method::Invite
                && d.direction == Direction::Outgoing
                && d.state == DialogState::Idle
            {
                events.extend(d.transition(DialogState::Inviting));
            }
        }
        self.observer.on_events(events);
        Ok(())
    }

    /// Prepare the ACK for a final response to the dialog's INVITE
    pub fn prepare_ack(
        &self,
        dialog: &DialogHandle,
        response_code: u16,
        ack: &mut dyn SipMessage,
    ) -> DialogResult<()> {
        let d = dialog.lock();
        if d.state == DialogState::Confirmed || response_code < 300 {
            if !d.route_set.is_empty() {
                let (target, _) = self.route_sets.effective_request_target(&d)?;
                ack.set_request_uri(target)?;
            } else if let Some(target) = d.remote_target.clone() {
                ack.set_request_uri(target)?;
            }
        }
        self.route_sets.apply_to_2xx_ack(&d, response_code, ack);
        Ok(())
    }

    /// Apply the dialog to an outbound response
    ///
    /// Copies the route-set into Record-Route headers of early responses and,
    /// on the UAS side of an INVITE, moves the dialog along with the response:
    /// 1xx to Early, 2xx to Confirmed, failure to Terminated.
    pub fn prepare_response(
        &self,
        dialog: &DialogHandle,
        response: &mut dyn SipMessage,
        tx: &dyn TransactionInfo,
    ) -> DialogResult<()> {
        let code = response
            .status_code()
            .ok_or_else(|| DialogError::bad_parameter("prepare_response called with a request"))?;

        let mut events = Vec::new();
        let mut terminate = false;
        {
            let mut d = dialog.lock();
            if d.state.is_terminated() {
                return Err(DialogError::illegal_action(&format!(
                    "cannot respond on terminated dialog {}",
                    d.id
                )));
            }

            self.route_sets.apply_to_outbound_response(&mut d, response, tx);

            if d.direction == Direction::Incoming && tx.method() == Method::Invite {
                match code {
                    101..=199 if d.state.is_pre_confirmed() => {
                        events.extend(d.transition(DialogState::Early));
                    }
                    200..=299 => {
                        events.extend(d.transition(DialogState::Confirmed));
                    }
                    300.. if d.state != DialogState::Confirmed => {
                        terminate = true;
                    }
                    _ => {}
                }
            }
        }
        self.observer.on_events(events);

        if terminate {
            self.terminate(dialog, TerminationReason::FinalResponse(code));
        }
        Ok(())
    }
}
