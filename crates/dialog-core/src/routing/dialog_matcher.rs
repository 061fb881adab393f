//! Dialog Matching Logic
//!
//! Dialogs are identified by Call-ID plus the From- and To-tags of the
//! dialog-creating request (RFC 3261 Section 12). A key also records the
//! direction it was observed in, because the same dialog seen from the other
//! side carries its tags swapped.
//!
//! ## Wildcard rules
//!
//! A To-tag may be missing on either side while a dialog is being set up:
//!
//! - stored key without a To-tag: the candidate's To-tag is ignored in the
//!   same direction, its From-tag in the opposite direction
//! - candidate without a To-tag in the same direction: the stored To-tag is
//!   ignored
//!
//! Everything else compares exactly, swapped when directions differ.

use std::fmt;

use crate::dialog::Direction;
use crate::transaction::TransactionKey;

/// Registry key of a dialog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DialogKey {
    pub call_id: String,
    pub from_tag: Option<String>,
    pub to_tag: Option<String>,
    pub direction: Direction,
}

impl DialogKey {
    /// Key of an inbound response to a request we sent
    pub fn for_response(key: &TransactionKey) -> Self {
        Self::from_transaction(key, Direction::Outgoing)
    }

    /// Key of an inbound request
    pub fn for_request(key: &TransactionKey) -> Self {
        Self::from_transaction(key, Direction::Incoming)
    }

    pub fn from_transaction(key: &TransactionKey, direction: Direction) -> Self {
        Self {
            call_id: key.call_id.clone(),
            from_tag: key.from_tag.clone(),
            to_tag: key.to_tag.clone(),
            direction,
        }
    }

    /// Copy of the key with the To-tag removed
    pub fn without_to_tag(&self) -> Self {
        Self {
            to_tag: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for DialogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} ({})",
            self.call_id,
            self.from_tag.as_deref().unwrap_or("-"),
            self.to_tag.as_deref().unwrap_or("-"),
            self.direction
        )
    }
}

/// Whether `candidate` identifies the same dialog as the stored key
pub fn keys_match(stored: &DialogKey, candidate: &DialogKey) -> bool {
    if stored.call_id != candidate.call_id {
        return false;
    }

    let same_direction = stored.direction == candidate.direction;

    let mut ignore_candidate_to = false;
    let mut ignore_candidate_from = false;
    let mut ignore_stored_to = false;

    if stored.to_tag.is_none() {
        if same_direction {
            ignore_candidate_to = true;
        } else {
            ignore_candidate_from = true;
        }
    }
    if candidate.to_tag.is_none() && same_direction {
        ignore_stored_to = true;
    }

    if same_direction {
        let from_ok = ignore_candidate_from || stored.from_tag == candidate.from_tag;
        let to_ok = ignore_candidate_to || ignore_stored_to || stored.to_tag == candidate.to_tag;
        from_ok && to_ok
    } else {
        let from_ok = ignore_candidate_to || stored.from_tag == candidate.to_tag;
        let to_ok = ignore_candidate_from || stored.to_tag == candidate.from_tag;
        from_ok && to_ok
    }
}

/// Whether `candidate` belongs to the original outgoing dialog stored under
/// `stored`
///
/// The stored To-tag is ignored: every fork of an outgoing request shares the
/// original's Call-ID and From-tag.
pub fn matches_original(
    stored: &DialogKey,
    stored_is_original: bool,
    candidate: &DialogKey,
) -> bool {
    stored_is_original
        && stored.direction == Direction::Outgoing
        && keys_match(&stored.without_to_tag(), candidate)
}

/// Whether a fork identified by `candidate` is already stored under `stored`
///
/// Tags compare exactly: an entry still waiting for its To-tag never stands
/// in for a fork that has one.
pub fn fork_key_matches(stored: &DialogKey, candidate: &DialogKey) -> bool {
    if candidate.to_tag.is_some() && stored.to_tag.is_none() {
        return false;
    }
    keys_match(stored, candidate)
}
