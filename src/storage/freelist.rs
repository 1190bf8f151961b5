//! Freelist
//!
//! LIFO stack of pages believed to have spare capacity.
//!
//! Entries carry the free-byte count observed when they were pushed. That
//! estimate is only a hint: the store re-reads a popped page and checks its
//! real capacity before writing into it.

use crate::config::FreeListPolicy;

use super::{PageId, RECORD_HEADER_SIZE};

/// A freelist entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSlot {
    pub page_id: PageId,
    /// Free bytes in the page when it was pushed
    pub free_bytes: usize,
}

/// Stack of reuse candidates
#[derive(Debug)]
pub struct FreeList {
    slots: Vec<FreeSlot>,
    policy: FreeListPolicy,
}

impl FreeList {
    pub fn new(policy: FreeListPolicy) -> Self {
        Self {
            slots: Vec::new(),
            policy,
        }
    }

    /// Push a page on top of the stack
    ///
    /// Pages with room for less than an empty record are not worth queueing
    /// and are ignored; returns whether the page was queued.
    pub fn push(&mut self, page_id: PageId, free_bytes: usize) -> bool {
        if free_bytes < RECORD_HEADER_SIZE {
            return false;
        }
        self.slots.push(FreeSlot {
            page_id,
            free_bytes,
        });
        true
    }

    /// Remove and return the most recently pushed page
    pub fn pop(&mut self) -> Option<FreeSlot> {
        self.slots.pop()
    }

    /// Pick a reuse candidate for a record of `needed` bytes
    ///
    /// `Legacy` takes the top of the stack regardless of its estimate.
    /// `Requeue` takes the most recently pushed page whose estimate fits,
    /// leaving smaller pages queued.
    pub fn pop_for(&mut self, needed: usize) -> Option<FreeSlot> {
        match self.policy {
            FreeListPolicy::Legacy => self.pop(),
            FreeListPolicy::Requeue => {
                let pos = self.slots.iter().rposition(|s| s.free_bytes >= needed)?;
                Some(self.slots.remove(pos))
            }
        }
    }

    /// Handle a candidate whose real capacity was too small
    ///
    /// Returns `true` if the page went back on the stack.
    pub fn reject(&mut self, page_id: PageId, actual_free: usize) -> bool {
        match self.policy {
            FreeListPolicy::Legacy => false,
            FreeListPolicy::Requeue => self.push(page_id, actual_free),
        }
    }

    /// Put back a slot that was popped for a write that then failed
    pub fn restore(&mut self, slot: FreeSlot) {
        self.slots.push(slot);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn policy(&self) -> FreeListPolicy {
        self.policy
    }

    /// Queued page ids, bottom of the stack first
    pub fn page_ids(&self) -> impl Iterator<Item = PageId> + '_ {
        self.slots.iter().map(|s| s.page_id)
    }
}
