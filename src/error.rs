//! Error types for watermelondb
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using WatermelonError
pub type Result<T> = std::result::Result<T, WatermelonError>;

/// Unified error type for watermelondb operations
#[derive(Debug, Error)]
pub enum WatermelonError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record / Page Errors
    // -------------------------------------------------------------------------
    #[error("Record too large: {size} bytes (max {max} per page)")]
    RecordTooLarge { size: usize, max: usize },

    #[error("Insufficient space in page: need {needed} bytes, {available} available")]
    InsufficientSpace { needed: usize, available: usize },

    #[error("Page corruption detected: {0}")]
    Corruption(String),

    #[error("Storage invariant violated: {0}")]
    Invariant(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
