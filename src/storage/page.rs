//! Page buffer
//!
//! In-memory copy of one page with header accessors and record packing.
//!
//! ## Layout
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header (4 bytes)                                         │
//! │   NumRecords: u16 (2) | FreeSpaceOffset: u16 (2)         │
//! ├──────────────────────────────────────────────────────────┤
//! │ Records (packed from offset 4)                           │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                 │
//! │   ... repeated NumRecords times ...                      │
//! ├──────────────────────────────────────────────────────────┤
//! │ Free space (FreeSpaceOffset .. 4096)                     │
//! └──────────────────────────────────────────────────────────┘
//! ```

use bytes::{Buf, BufMut};

use crate::error::Result;
use crate::WatermelonError;

use super::{PageId, HEADER_SIZE, PAGE_SIZE, RECORD_HEADER_SIZE};

/// Byte offset of the NumRecords header field
const NUM_RECORDS_OFFSET: usize = 0;

/// Byte offset of the FreeSpaceOffset header field
const FREE_SPACE_OFFSET: usize = 2;

/// Encoded size of a record: header + key + value
pub fn record_size(key: &[u8], value: &[u8]) -> usize {
    RECORD_HEADER_SIZE + key.len() + value.len()
}

/// One fixed-size page held in memory
///
/// The `dirty` flag is never persisted. It is set by every header mutation
/// and cleared by the pager after a successful write-back.
pub struct Page {
    id: PageId,
    data: Box<[u8; PAGE_SIZE]>,
    dirty: bool,
}

/// A record decoded in place from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Offset of the record header within the page
    pub offset: u16,
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl Record<'_> {
    /// Encoded size of this record within the page
    pub fn encoded_len(&self) -> usize {
        record_size(self.key, self.value)
    }
}

impl Page {
    /// Create an empty page: no records, free space starting right after the header
    ///
    /// The page starts dirty so the first write-back materializes it on disk.
    pub fn new(id: PageId) -> Self {
        let mut page = Self {
            id,
            data: Box::new([0u8; PAGE_SIZE]),
            dirty: false,
        };
        page.set_num_records(0);
        page.set_free_space_offset(HEADER_SIZE as u16);
        page
    }

    /// Wrap bytes read from disk (clean)
    pub fn from_bytes(id: PageId, data: Box<[u8; PAGE_SIZE]>) -> Self {
        Self {
            id,
            data,
            dirty: false,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    /// Raw page bytes, exactly as they are laid out on disk
    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // =========================================================================
    // Header Fields
    // =========================================================================

    pub fn num_records(&self) -> u16 {
        let mut src = &self.data[NUM_RECORDS_OFFSET..NUM_RECORDS_OFFSET + 2];
        src.get_u16_le()
    }

    pub fn set_num_records(&mut self, n: u16) {
        let mut dst = &mut self.data[NUM_RECORDS_OFFSET..NUM_RECORDS_OFFSET + 2];
        dst.put_u16_le(n);
        self.dirty = true;
    }

    pub fn free_space_offset(&self) -> u16 {
        let mut src = &self.data[FREE_SPACE_OFFSET..FREE_SPACE_OFFSET + 2];
        src.get_u16_le()
    }

    pub fn set_free_space_offset(&mut self, offset: u16) {
        let mut dst = &mut self.data[FREE_SPACE_OFFSET..FREE_SPACE_OFFSET + 2];
        dst.put_u16_le(offset);
        self.dirty = true;
    }

    /// True when FreeSpaceOffset lies within `[HEADER_SIZE, PAGE_SIZE]`
    ///
    /// An all-zero block (never written, or torn) fails this check.
    pub fn has_valid_header(&self) -> bool {
        let offset = self.free_space_offset() as usize;
        (HEADER_SIZE..=PAGE_SIZE).contains(&offset)
    }

    /// Bytes left for new records; 0 when the header is invalid
    pub fn free_space(&self) -> usize {
        if !self.has_valid_header() {
            return 0;
        }
        PAGE_SIZE - self.free_space_offset() as usize
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Append a record at the current free-space offset
    ///
    /// Returns the offset of the record header, i.e. the in-page half of the
    /// record's location.
    pub fn add_record(&mut self, key: &[u8], value: &[u8]) -> Result<u16> {
        let needed = record_size(key, value);
        let available = self.free_space();
        if needed > available {
            return Err(WatermelonError::InsufficientSpace { needed, available });
        }

        let count = self.num_records().checked_add(1).ok_or_else(|| {
            WatermelonError::Corruption(format!(
                "page {} record count is already at its maximum",
                self.id
            ))
        })?;

        // needed <= available < PAGE_SIZE, so every length below fits its field
        let offset = self.free_space_offset();
        let start = offset as usize;
        {
            let mut dst = &mut self.data[start..start + needed];
            dst.put_u32_le(key.len() as u32);
            dst.put_u32_le(value.len() as u32);
            dst.put_slice(key);
            dst.put_slice(value);
        }

        self.set_num_records(count);
        self.set_free_space_offset(offset + needed as u16);

        Ok(offset)
    }

    /// Decode the record whose header starts at `offset`
    ///
    /// The key is returned as stored; callers resolving a lookup do not
    /// compare it against the key they looked up.
    pub fn record_at(&self, offset: u16) -> Result<Record<'_>> {
        let start = offset as usize;
        if start < HEADER_SIZE || start + RECORD_HEADER_SIZE > PAGE_SIZE {
            return Err(WatermelonError::Corruption(format!(
                "record offset {} outside page {}",
                offset, self.id
            )));
        }

        let mut header = &self.data[start..start + RECORD_HEADER_SIZE];
        let key_len = header.get_u32_le() as usize;
        let val_len = header.get_u32_le() as usize;

        let key_start = start + RECORD_HEADER_SIZE;
        let value_start = key_start.checked_add(key_len);
        let value_end = value_start.and_then(|v| v.checked_add(val_len));

        match (value_start, value_end) {
            (Some(value_start), Some(value_end)) if value_end <= PAGE_SIZE => Ok(Record {
                offset,
                key: &self.data[key_start..value_start],
                value: &self.data[value_start..value_end],
            }),
            _ => Err(WatermelonError::Corruption(format!(
                "record at page {} offset {} overruns the page (key_len={}, val_len={})",
                self.id, offset, key_len, val_len
            ))),
        }
    }

    /// Iterate over the records packed in this page, in write order
    pub fn records(&self) -> RecordIter<'_> {
        RecordIter {
            page: self,
            next_offset: HEADER_SIZE,
            remaining: self.num_records(),
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("num_records", &self.num_records())
            .field("free_space_offset", &self.free_space_offset())
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Iterator over a page's records
///
/// Yields an error and stops if a record extends past the page's
/// FreeSpaceOffset or past the page itself.
pub struct RecordIter<'a> {
    page: &'a Page,
    next_offset: usize,
    remaining: u16,
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Result<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let limit = self.page.free_space_offset() as usize;
        let result = if self.next_offset >= limit {
            Err(WatermelonError::Corruption(format!(
                "page {} declares more records than it holds",
                self.page.id
            )))
        } else {
            // next_offset < limit <= PAGE_SIZE, so it fits in u16
            self.page
                .record_at(self.next_offset as u16)
                .and_then(|record| {
                    if self.next_offset + record.encoded_len() > limit {
                        Err(WatermelonError::Corruption(format!(
                            "record at page {} offset {} extends past free space",
                            self.page.id, self.next_offset
                        )))
                    } else {
                        Ok(record)
                    }
                })
        };

        match result {
            Ok(record) => {
                self.next_offset += record.encoded_len();
                self.remaining -= 1;
                Some(Ok(record))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}
