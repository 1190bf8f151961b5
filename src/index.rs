//! Index Module
//!
//! In-memory map from key to the physical location of its latest record.
//!
//! The index is never persisted. It starts empty on every open (unless the
//! store is configured to rebuild it from pages) and is a pure point-lookup
//! structure: no iteration, range scan or deletion.

use std::collections::HashMap;

use crate::storage::PageId;

/// Physical address of a record header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordLocation {
    pub page_id: PageId,
    /// Offset of the record header within its page
    pub page_offset: u16,
}

/// Key → RecordLocation map, last write wins
#[derive(Debug, Default)]
pub struct Index {
    entries: HashMap<Vec<u8>, RecordLocation>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &[u8]) -> Option<RecordLocation> {
        self.entries.get(key).copied()
    }

    /// Point `key` at `location`, returning the location it replaced
    ///
    /// The replaced record stays on disk, unreachable.
    pub fn insert(&mut self, key: &[u8], location: RecordLocation) -> Option<RecordLocation> {
        if let Some(slot) = self.entries.get_mut(key) {
            return Some(std::mem::replace(slot, location));
        }
        self.entries.insert(key.to_vec(), location);
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
