//! # watermelondb
//!
//! A minimal single-file key-value store with:
//! - Fixed-size 4 KiB pages holding variable-length records
//! - A freelist for reusing partially filled pages
//! - An in-memory index for O(1) point lookups
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Store (engine)                         │
//! │                 open / put / get / close                     │
//! └──────────┬──────────────────┬──────────────────┬────────────┘
//!            │                  │                  │
//!            ▼                  ▼                  ▼
//!     ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//!     │    Index    │    │  FreeList   │    │  PageFile   │
//!     │ key → loc   │    │ (LIFO ids)  │    │ (pread/     │
//!     └─────────────┘    └─────────────┘    │  pwrite)    │
//!                                           └──────┬──────┘
//!                                                  │
//!                                                  ▼
//!                                           ┌─────────────┐
//!                                           │    Page     │
//!                                           │ [hdr|recs]  │
//!                                           └─────────────┘
//! ```
//!
//! The index lives only in memory. Reopening a file starts with an empty
//! index unless [`Config::rebuild_index_on_open`] is set.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod index;
pub mod engine;
pub mod shared;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{WatermelonError, Result};
pub use config::{Config, FreeListPolicy};
pub use engine::Store;
pub use index::RecordLocation;
pub use shared::SharedStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of watermelondb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
