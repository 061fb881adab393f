//! Bounded storage for route-set entries
//!
//! Entries are addressed by [`HopIndex`] rather than by reference, so a
//! route-set is a plain list of indices into the arena that owns it.

use crate::errors::{DialogError, DialogResult};
use crate::message::RouteHop;

/// One hop of a route-set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSetEntry {
    pub hop: RouteHop,
    /// Loose router (`;lr`) as opposed to a strict RFC 2543 router
    pub loose: bool,
}

impl RouteSetEntry {
    pub fn new(hop: RouteHop) -> Self {
        let loose = hop.is_loose_routing();
        Self { hop, loose }
    }
}

/// Index of an entry inside a [`RouteArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HopIndex(u32);

/// Append-only entry storage with a hard size limit
#[derive(Debug, Clone)]
pub struct RouteArena {
    entries: Vec<RouteSetEntry>,
    limit: usize,
}

impl RouteArena {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
        }
    }

    /// Store an entry
    ///
    /// Fails with `OutOfResources` once the limit is reached or memory
    /// cannot be reserved. The arena is unchanged on failure.
    pub fn alloc(&mut self, entry: RouteSetEntry) -> DialogResult<HopIndex> {
        if self.entries.len() >= self.limit {
            return Err(DialogError::out_of_resources(&format!(
                "route arena limit of {} entries reached",
                self.limit
            )));
        }
        let index = u32::try_from(self.entries.len())
            .map_err(|_| DialogError::out_of_resources("route arena index overflow"))?;
        self.entries
            .try_reserve(1)
            .map_err(|e| {
                DialogError::out_of_resources(&format!("route arena allocation failed: {}", e))
            })?;
        self.entries.push(entry);
        Ok(HopIndex(index))
    }

    pub fn get(&self, index: HopIndex) -> Option<&RouteSetEntry> {
        self.entries.get(index.0 as usize)
    }

    /// Drop every entry allocated after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SipUri;

    fn entry(host: &str) -> RouteSetEntry {
        RouteSetEntry::new(RouteHop::new(SipUri::sip(host).with_lr()))
    }

    #[test]
    fn test_alloc_respects_limit() {
        let mut arena = RouteArena::new(2);
        let a = arena.alloc(entry("p1")).unwrap();
        arena.alloc(entry("p2")).unwrap();
        let err = arena.alloc(entry("p3")).unwrap_err();
        assert!(matches!(err, DialogError::OutOfResources { .. }));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a).map(|e| e.hop.uri().host.as_str()), Some("p1"));
    }

    #[test]
    fn test_entry_loose_flag_follows_lr() {
        assert!(entry("p1").loose);
        let strict = RouteSetEntry::new(RouteHop::new(SipUri::sip("p2")));
        assert!(!strict.loose);
    }
}
