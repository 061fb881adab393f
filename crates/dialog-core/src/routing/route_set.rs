//! Per-dialog route-set storage
//!
//! ```text
//! Unset ──1xx──► Provisional ──2xx──► Confirmed
//!                    │   ▲
//!                    └───┘ replaced only after an explicit discard
//! ```
//!
//! A provisional set owns a short-lived arena that is dropped as a whole when
//! the set is discarded or confirmed. A confirmed set indexes into the
//! dialog's persistent arena and never changes until the dialog ends.

use super::route_arena::{HopIndex, RouteArena, RouteSetEntry};

/// Observable route-set state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSetState {
    Unset,
    Provisional,
    Confirmed,
}

#[derive(Debug)]
enum Stage {
    Unset,
    Provisional { arena: RouteArena, hops: Vec<HopIndex> },
    Confirmed { hops: Vec<HopIndex> },
}

/// Ordered Route / Record-Route hops of a dialog
#[derive(Debug)]
pub struct RouteSet {
    persistent: RouteArena,
    stage: Stage,
}

impl RouteSet {
    pub fn new(max_entries: usize) -> Self {
        Self {
            persistent: RouteArena::new(max_entries),
            stage: Stage::Unset,
        }
    }

    pub fn state(&self) -> RouteSetState {
        match self.stage {
            Stage::Unset => RouteSetState::Unset,
            Stage::Provisional { .. } => RouteSetState::Provisional,
            Stage::Confirmed { .. } => RouteSetState::Confirmed,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.stage, Stage::Confirmed { .. })
    }

    pub fn len(&self) -> usize {
        match &self.stage {
            Stage::Unset => 0,
            Stage::Provisional { hops, .. } | Stage::Confirmed { hops } => hops.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in stored order
    pub fn iter(&self) -> RouteIter<'_> {
        match &self.stage {
            Stage::Unset => RouteIter {
                arena: None,
                hops: (&[] as &[HopIndex]).iter(),
            },
            Stage::Provisional { arena, hops } => RouteIter {
                arena: Some(arena),
                hops: hops.iter(),
            },
            Stage::Confirmed { hops } => RouteIter {
                arena: Some(&self.persistent),
                hops: hops.iter(),
            },
        }
    }

    pub fn first(&self) -> Option<&RouteSetEntry> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<&RouteSetEntry> {
        self.iter().next_back()
    }

    pub(crate) fn persistent_mut(&mut self) -> &mut RouteArena {
        &mut self.persistent
    }

    pub(crate) fn install_provisional(&mut self, arena: RouteArena, hops: Vec<HopIndex>) {
        self.stage = Stage::Provisional { arena, hops };
    }

    /// Hops must index into the persistent arena
    pub(crate) fn install_confirmed(&mut self, hops: Vec<HopIndex>) {
        self.stage = Stage::Confirmed { hops };
    }

    /// Drop a provisional set; returns whether one existed
    pub fn discard_provisional(&mut self) -> bool {
        if matches!(self.stage, Stage::Provisional { .. }) {
            self.stage = Stage::Unset;
            true
        } else {
            false
        }
    }

    /// Forget every entry, confirmed or not
    pub fn clear(&mut self) {
        self.stage = Stage::Unset;
        self.persistent.clear();
    }
}

/// Iterator over route-set entries
pub struct RouteIter<'a> {
    arena: Option<&'a RouteArena>,
    hops: std::slice::Iter<'a, HopIndex>,
}

impl<'a> Iterator for RouteIter<'a> {
    type Item = &'a RouteSetEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let arena = self.arena?;
        self.hops.by_ref().find_map(|i| arena.get(*i))
    }
}

impl DoubleEndedIterator for RouteIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let arena = self.arena?;
        self.hops.by_ref().rev().find_map(|i| arena.get(*i))
    }
}
