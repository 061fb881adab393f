//! SIP Response Handler for Dialog-Core
//!
//! Processes responses to requests sent on a dialog (RFC 3261 Sections 12.1.2
//! and 13.2.2.4).
//!
//! ## Original or fork
//!
//! A response is processed on the original dialog when its To-tag is the
//! original's remote tag, when it has no To-tag, or when the original has not
//! learned a remote tag yet (the first tagged 1xx/2xx assigns it, together
//! with the registry key). Any other To-tag means a proxy forked the request
//! and the response belongs to a forked dialog.
//!
//! ## Response categories handled
//!
//! - **100 Trying**: ignored
//! - **1xx Provisional**: provisional route-set, dialog moves to Early
//! - **2xx Success**: confirmed route-set, remote target from Contact,
//!   dialog moves to Confirmed
//! - **3xx-6xx**: terminates a dialog that is not yet confirmed
//!
//! Failures on the fork path abandon the fork and never touch the original.

use tracing::{debug, info, warn};

use crate::dialog::{DialogHandle, DialogState, TerminationReason};
use crate::errors::{DialogError, DialogResult};
use crate::events::DialogEvent;
use crate::manager::DialogManager;
use crate::message::{Method, SipMessage};

/// Where an inbound response was processed
#[derive(Debug, Clone)]
pub enum ResponseDisposition {
    /// Processed on the original dialog
    Original,
    /// Processed on a forked dialog
    Forked { dialog: DialogHandle, is_new: bool },
    /// Ignored (100 Trying, no matching original, forking disabled)
    Dropped,
}

/// Response-specific handling for DialogManager
impl DialogManager {
    /// Handle a response to a request sent on `original`
    pub fn handle_response(
        &self,
        original: &DialogHandle,
        response: &dyn SipMessage,
    ) -> DialogResult<ResponseDisposition> {
        let code = response
            .status_code()
            .ok_or_else(|| DialogError::bad_parameter("handle_response called with a request"))?;
        if code < 101 {
            debug!("Ignoring {} response on dialog {}", code, original.id());
            return Ok(ResponseDisposition::Dropped);
        }

        let to_tag = response.to_header().and_then(|to| to.tag()).map(str::to_string);
        let remote_tag = {
            let d = original.lock();
            if d.state.is_terminated() {
                return Err(DialogError::illegal_action(&format!(
                    "dialog {} is terminated",
                    d.id
                )));
            }
            d.remote_tag.clone()
        };

        // Only a dialog-establishing response may assign the remote tag
        let establishing = (101..300).contains(&code)
            && response.cseq().is_some_and(|cseq| cseq.method.creates_dialog());
        let on_original = match (&to_tag, &remote_tag) {
            (None, _) => true,
            (Some(tag), Some(remote)) => tag == remote,
            (Some(tag), None) if establishing => self.registry.assign_remote_tag(original, tag)?,
            (Some(_), None) => true,
        };

        if on_original {
            self.process_response_on_original(original, response, code, to_tag.is_some())?;
            return Ok(ResponseDisposition::Original);
        }

        self.process_forked_response(original, response, code)
    }

    /// Process a response on the original dialog
    fn process_response_on_original(
        &self,
        original: &DialogHandle,
        response: &dyn SipMessage,
        code: u16,
        tagged: bool,
    ) -> DialogResult<()> {
        let Some(cseq) = response.cseq() else {
            return Err(DialogError::bad_parameter("response has no CSeq header"));
        };
        let method = cseq.method.clone();

        self.observer.on_event(DialogEvent::MessageReceived {
            dialog_id: original.id(),
            status_code: code,
            method: method.clone(),
            cseq: cseq.seq,
        });

        let mut events = Vec::new();
        let mut confirmed = false;
        let mut terminate = None;
        {
            let mut d = original.lock();
            match method {
                Method::Invite | Method::Subscribe | Method::Refer
                    if (101..300).contains(&code) =>
                {
                    if code < 200 {
                        self.route_sets.initialize(&mut d, response, false)?;
                        if tagged && matches!(d.state, DialogState::Idle | DialogState::Inviting) {
                            d.update_remote_target(response);
                            events.extend(d.transition(DialogState::Early));
                        }
                    } else if d.state != DialogState::Confirmed {
                        self.route_sets.initialize(&mut d, response, true)?;
                        d.update_remote_target(response);
                        events.extend(d.transition(DialogState::Confirmed));
                        confirmed = method == Method::Invite;
                    } else {
                        debug!("Dialog {} already confirmed, {} retransmission", d.id, code);
                    }
                }
                Method::Invite if code >= 300 && d.state != DialogState::Confirmed => {
                    terminate = Some(TerminationReason::FinalResponse(code));
                }
                Method::Bye if code >= 200 => {
                    terminate = Some(TerminationReason::Normal);
                }
                _ => {}
            }
        }
        self.observer.on_events(events);

        if let Some(reason) = terminate {
            self.terminate(original, reason);
            return Ok(());
        }
        if confirmed {
            info!("Dialog {} confirmed by {} response", original.id(), code);
            self.delegate.final_response_received(original, response)?;
        }
        Ok(())
    }

    /// Process a response carrying a novel To-tag
    ///
    /// A fork is abandoned on failure only while it is new and has not
    /// processed a provisional response; otherwise it keeps its state and
    /// its timer.
    fn process_forked_response(
        &self,
        original: &DialogHandle,
        response: &dyn SipMessage,
        code: u16,
    ) -> DialogResult<ResponseDisposition> {
        let outcome = match self.forks.handle_forkable_response(original, response) {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return Ok(ResponseDisposition::Dropped),
            Err(e) => {
                warn!("Failed to create fork of dialog {}: {}", original.id(), e);
                return Err(e);
            }
        };

        let fork = outcome.dialog;
        let result = match code {
            101..=199 => self.forks.handle_provisional(&fork, response),
            200..=299 => self.forks.handle_first_2xx(&fork, response),
            _ => {
                self.terminate(&fork, TerminationReason::FinalResponse(code));
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("Forked dialog {} failed on {} response: {}", fork.id(), code, e);
            if outcome.is_new {
                self.forks.abandon_on_failure(&fork);
            }
            return Err(e);
        }

        Ok(ResponseDisposition::Forked {
            dialog: fork,
            is_new: outcome.is_new,
        })
    }
}
