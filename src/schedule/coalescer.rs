use crate::foundation::core::OwnerId;
use smallvec::SmallVec;
use std::collections::HashSet;

/// Drain snapshot; sized for a typical screenful of owners.
pub(crate) type DrainedOwners = SmallVec<[OwnerId; 8]>;

/// Pending-owner set with insertion order.
///
/// Marking is idempotent: a second mark for an owner already pending merges
/// into the existing entry instead of queueing a duplicate, which is what
/// collapses a burst of same-tick refresh requests into one build. `drain`
/// swaps the whole set out atomically so new marks made while servicing the
/// snapshot land in the next cycle.
pub(crate) struct RefreshQueue {
    pending: HashSet<OwnerId>,
    order: Vec<OwnerId>,
    merged: u64,
}

impl RefreshQueue {
    pub(crate) fn new() -> Self {
        Self {
            pending: HashSet::new(),
            order: Vec::new(),
            merged: 0,
        }
    }

    /// Mark an owner pending. Returns `false` when it already was (merged).
    pub(crate) fn mark(&mut self, owner: OwnerId) -> bool {
        if self.pending.insert(owner) {
            self.order.push(owner);
            true
        } else {
            self.merged += 1;
            false
        }
    }

    /// Take every pending owner, in mark order, leaving the queue empty.
    pub(crate) fn drain(&mut self) -> DrainedOwners {
        self.pending.clear();
        std::mem::take(&mut self.order).into_iter().collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Requests dropped into an existing pending entry so far.
    pub(crate) fn merged(&self) -> u64 {
        self.merged
    }
}
