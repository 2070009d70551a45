//! Conflict arbitration for optimistic local edits.
//!
//! Locally produced fix-up patches sit in a pending queue until the next
//! flush. When remote patches arrive first, any pending patch whose target
//! node was touched — or wholly replaced via an ancestor — by a remote edit
//! is stale and gets dropped instead of being sent on top of the newer
//! state. Discard is always a safe degrade: at worst a local fix-up is lost,
//! never applied incorrectly.

use indexmap::IndexMap;

use crate::patch::{Origin, Patch, Path};
use tree_patch_path::is_prefix;

/// Pending local patches keyed by their target path.
///
/// Keys are the segment vectors themselves, so two distinct paths can never
/// collide through a shared string rendering. Queueing a second patch for
/// the same path replaces the first; iteration and
/// [`flush`](ConflictArbiter::flush) preserve insertion order.
#[derive(Debug, Default)]
pub struct ConflictArbiter {
    pending: IndexMap<Path, Patch>,
}

impl ConflictArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a local patch for the next flush. An earlier pending patch on
    /// the exact same path is superseded in place.
    pub fn queue(&mut self, patch: Patch) {
        self.pending.insert(patch.path().clone(), patch);
    }

    /// Drop every pending patch whose path a remote patch targeted at or
    /// above. A remote edit on a strict descendant leaves the pending patch
    /// alone; disjoint paths never interact.
    pub fn on_remote_patches(&mut self, remote: &[Patch]) {
        self.pending.retain(|_, pending| {
            !remote
                .iter()
                .any(|r| is_prefix(r.path(), pending.path()))
        });
    }

    /// Take all surviving pending patches, in insertion order, tagged for
    /// transmission.
    pub fn flush(&mut self) -> Vec<Patch> {
        self.pending
            .drain(..)
            .map(|(_, patch)| patch.with_origin(Origin::Local))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// The surviving pending patches, in insertion order, without draining.
    pub fn pending(&self) -> impl Iterator<Item = &Patch> {
        self.pending.values()
    }
}
