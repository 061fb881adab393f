//! Dialog registry implementation

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::dialog::{DialogHandle, DialogId, OriginalRef, TerminationReason};
use crate::errors::{DialogError, DialogResult};
use crate::events::DialogObserver;
use crate::routing::{fork_key_matches, keys_match, matches_original, DialogKey};

#[derive(Debug, Clone)]
struct RegistryEntry {
    key: DialogKey,
    original: bool,
    handle: DialogHandle,
}

/// Result of [`DialogRegistry::insert_if_absent`]
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// The handle passed in was registered
    Inserted(DialogHandle),
    /// An equivalent dialog was already registered and is returned instead
    Existing(DialogHandle),
}

impl InsertOutcome {
    pub fn handle(&self) -> &DialogHandle {
        match self {
            InsertOutcome::Inserted(handle) | InsertOutcome::Existing(handle) => handle,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }

    pub fn into_handle(self) -> DialogHandle {
        match self {
            InsertOutcome::Inserted(handle) | InsertOutcome::Existing(handle) => handle,
        }
    }
}

/// Concurrent dialog index
///
/// Entries are bucketed by Call-ID so that matching only ever scans the
/// dialogs of one call. A second map gives direct access by [`DialogId`].
#[derive(Debug, Default)]
pub struct DialogRegistry {
    by_call: DashMap<String, Vec<RegistryEntry>>,
    by_id: DashMap<DialogId, DialogHandle>,
}

impl DialogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the original outgoing dialog a response belongs to
    ///
    /// The stored To-tag is ignored so that a response from any fork finds
    /// the original.
    pub fn find_original(&self, key: &DialogKey) -> Option<DialogHandle> {
        let entries = self.by_call.get(&key.call_id)?;
        entries
            .iter()
            .find(|e| matches_original(&e.key, e.original, key))
            .map(|e| e.handle.clone())
    }

    /// Find the dialog registered under an equivalent key
    pub fn find_exact(&self, key: &DialogKey) -> Option<DialogHandle> {
        let entries = self.by_call.get(&key.call_id)?;
        entries
            .iter()
            .find(|e| keys_match(&e.key, key))
            .map(|e| e.handle.clone())
    }

    /// Register `handle` unless an equivalent dialog exists
    ///
    /// Lookup and insertion happen under the same bucket lock, so two racing
    /// callers with the same key get the same winner. A fork (`original` is
    /// false) only matches entries that already carry a To-tag.
    pub fn insert_if_absent(
        &self,
        key: DialogKey,
        original: bool,
        handle: DialogHandle,
    ) -> InsertOutcome {
        let mut entries = self.by_call.entry(key.call_id.clone()).or_default();
        let duplicate = |e: &&RegistryEntry| {
            if original {
                keys_match(&e.key, &key)
            } else {
                fork_key_matches(&e.key, &key)
            }
        };
        if let Some(existing) = entries.iter().find(duplicate) {
            debug!("Dialog key {} already registered as {}", key, existing.handle.id());
            return InsertOutcome::Existing(existing.handle.clone());
        }

        debug!("Registering dialog {} under {}", handle.id(), key);
        self.by_id.insert(handle.id(), handle.clone());
        entries.push(RegistryEntry {
            key,
            original,
            handle: handle.clone(),
        });
        InsertOutcome::Inserted(handle)
    }

    /// Register `handle`, failing if an equivalent dialog exists
    pub fn insert(&self, key: DialogKey, original: bool, handle: DialogHandle) -> DialogResult<()> {
        match self.insert_if_absent(key, original, handle) {
            InsertOutcome::Inserted(_) => Ok(()),
            InsertOutcome::Existing(existing) => Err(DialogError::unknown(&format!(
                "a dialog with the same identity is already registered: {}",
                existing.id()
            ))),
        }
    }

    /// Replace the stored key of a registered dialog
    pub fn rekey(&self, handle: &DialogHandle, key: DialogKey) -> DialogResult<()> {
        let mut entries = self
            .by_call
            .get_mut(handle.call_id())
            .ok_or_else(|| {
                DialogError::not_found(&format!("dialog {} is not registered", handle.id()))
            })?;
        let entry = entries
            .iter_mut()
            .find(|e| e.handle.id() == handle.id())
            .ok_or_else(|| {
                DialogError::not_found(&format!("dialog {} is not registered", handle.id()))
            })?;
        if entry.key != key {
            debug!("Re-keying dialog {}: {} -> {}", handle.id(), entry.key, key);
            entry.key = key;
        }
        Ok(())
    }

    /// Give a registered dialog its remote tag and re-key it in one step
    ///
    /// The bucket guard is held while the dialog is locked, so no lookup can
    /// observe the tag without the matching key. A dialog that already has a
    /// remote tag keeps it. Returns whether the dialog's remote tag is `tag`.
    pub fn assign_remote_tag(&self, handle: &DialogHandle, tag: &str) -> DialogResult<bool> {
        let mut entries = self.by_call.get_mut(handle.call_id()).ok_or_else(|| {
            DialogError::not_found(&format!("dialog {} is not registered", handle.id()))
        })?;
        let entry = entries
            .iter_mut()
            .find(|e| e.handle.id() == handle.id())
            .ok_or_else(|| {
                DialogError::not_found(&format!("dialog {} is not registered", handle.id()))
            })?;

        let mut dialog = handle.lock();
        if dialog.remote_tag.is_none() {
            dialog.remote_tag = Some(tag.to_string());
            dialog.remote_party.set_tag(tag);
            debug!("Dialog {} learned remote tag {}", dialog.id, tag);
        }
        let key = dialog.key();
        if entry.key != key {
            debug!("Re-keying dialog {}: {} -> {}", dialog.id, entry.key, key);
            entry.key = key;
        }
        Ok(dialog.remote_tag.as_deref() == Some(tag))
    }

    /// Unregister a dialog
    pub fn remove(&self, id: DialogId) -> Option<DialogHandle> {
        let (_, handle) = self.by_id.remove(&id)?;

        let now_empty = match self.by_call.get_mut(handle.call_id()) {
            Some(mut entries) => {
                entries.retain(|e| e.handle.id() != id);
                entries.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_call.remove_if(handle.call_id(), |_, entries| entries.is_empty());
        }

        debug!("Removed dialog {} from registry", id);
        Some(handle)
    }

    pub fn get(&self, id: DialogId) -> Option<DialogHandle> {
        self.by_id.get(&id).map(|h| h.value().clone())
    }

    /// Resolve a fork's back-reference, if the original is still the same
    /// dialog it was when the fork was created
    pub fn resolve_original(&self, original: OriginalRef) -> Option<DialogHandle> {
        self.get(original.id)
            .filter(|handle| handle.generation() == original.generation)
    }

    /// All registered dialogs of one call
    pub fn dialogs_for_call(&self, call_id: &str) -> Vec<DialogHandle> {
        self.by_call
            .get(call_id)
            .map(|entries| entries.iter().map(|e| e.handle.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Terminate a dialog, unregister it, then notify
    ///
    /// Returns false if the dialog was already terminated.
    pub fn terminate(
        &self,
        handle: &DialogHandle,
        reason: TerminationReason,
        observer: &dyn DialogObserver,
    ) -> bool {
        let events = {
            let mut dialog = handle.lock();
            handle.terminate_locked(&mut dialog, reason)
        };
        self.remove(handle.id());

        if events.is_empty() {
            warn!("Dialog {} was already terminated", handle.id());
            return false;
        }
        observer.on_events(events);
        true
    }
}
