//! Storage Module
//!
//! Page-organized persistent storage in a single backing file.
//!
//! ## Responsibilities
//! - Pack variable-length records into fixed-size pages
//! - Read and write whole pages at page-aligned offsets
//! - Track pages with spare capacity for reuse
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Page 0 (4096 bytes)                    │
//! │ ┌──────────────┬─────────────────────┐ │
//! │ │NumRecords (2)│ FreeSpaceOffset (2) │ │
//! │ └──────────────┴─────────────────────┘ │
//! │ ┌────────┬────────┬─────┬───────────┐  │
//! │ │KeyLen  │ValLen  │ Key │   Value   │  │
//! │ └────────┴────────┴─────┴───────────┘  │
//! │ ... (packed records, then free space)  │
//! ├────────────────────────────────────────┤
//! │ Page 1 ...                             │
//! └────────────────────────────────────────┘
//! ```
//! All integers are little-endian. There is no file header: any sequence of
//! 4096-byte blocks is a valid store.

mod page;
mod pager;
mod freelist;

pub use page::{record_size, Page, Record, RecordIter};
pub use pager::PageFile;
pub use freelist::{FreeList, FreeSlot};

// =============================================================================
// Shared Constants (used by page, pager, engine)
// =============================================================================

/// Size of every page in the backing file
pub const PAGE_SIZE: usize = 4096;

/// Page header: NumRecords (2) + FreeSpaceOffset (2) = 4 bytes
pub const HEADER_SIZE: usize = 4;

/// Record header: KeyLen (4) + ValLen (4) = 8 bytes
pub const RECORD_HEADER_SIZE: usize = 8;

/// Largest encoded record that fits in an empty page
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - HEADER_SIZE;

/// Zero-based page number; byte offset in the file is `id * PAGE_SIZE`
pub type PageId = u64;
