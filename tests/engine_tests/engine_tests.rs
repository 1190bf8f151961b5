//! Tests for Store
//!
//! These tests verify:
//! - Basic put/get operations
//! - Last-write-wins overwrites
//! - Page allocation and freelist reuse
//! - Oversized record rejection
//! - Store lifecycle (open/close/reopen)
//! - Optional index rebuild at open

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use watermelondb::config::{Config, FreeListPolicy};
use watermelondb::engine::Store;
use watermelondb::storage::{HEADER_SIZE, MAX_RECORD_SIZE, PAGE_SIZE, RECORD_HEADER_SIZE};
use watermelondb::WatermelonError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open_path(temp_dir.path().join("watermelondata")).unwrap();
    (temp_dir, store)
}

fn setup_temp_store_with(policy: FreeListPolicy) -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("watermelondata"))
        .freelist_policy(policy)
        .build();
    let store = Store::open(config).unwrap();
    (temp_dir, store)
}

/// A value that makes `key` encode to exactly `size` bytes
fn value_for(key: &[u8], size: usize) -> Vec<u8> {
    vec![b'x'; size - RECORD_HEADER_SIZE - key.len()]
}

fn page_bytes(pages: u64) -> u64 {
    pages * PAGE_SIZE as u64
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_open_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("store.db");

    let store = Store::open_path(&path).unwrap();

    assert!(path.exists());
    assert_eq!(store.path(), path.as_path());
    assert_eq!(store.total_pages(), 0);
    assert_eq!(store.file_len().unwrap(), 0);
    assert!(store.is_empty());
}

#[test]
fn test_open_rejects_directory_path() {
    let temp_dir = TempDir::new().unwrap();

    let result = Store::open_path(temp_dir.path());

    assert!(matches!(result, Err(WatermelonError::Config(_))));
}

#[test]
fn test_put_get() {
    let (_temp, mut store) = setup_temp_store();

    store.put(b"hello", b"world").unwrap();

    assert_eq!(store.get(b"hello").unwrap(), b"world".to_vec());
}

#[test]
fn test_get_nonexistent_key() {
    let (_temp, store) = setup_temp_store();

    assert!(matches!(
        store.get(b"nonexistent"),
        Err(WatermelonError::KeyNotFound)
    ));
}

#[test]
fn test_put_overwrite() {
    let (_temp, mut store) = setup_temp_store();

    store.put(b"key", b"value1").unwrap();
    store.put(b"key", b"value2").unwrap();

    assert_eq!(store.get(b"key").unwrap(), b"value2".to_vec());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_multiple_keys() {
    let (_temp, mut store) = setup_temp_store();

    for i in 0..50 {
        let key = format!("key{}", i);
        let value = format!("value{}", i);
        store.put(key.as_bytes(), value.as_bytes()).unwrap();
    }

    for i in 0..50 {
        let key = format!("key{}", i);
        let expected = format!("value{}", i);
        assert_eq!(store.get(key.as_bytes()).unwrap(), expected.into_bytes());
    }
    assert_eq!(store.len(), 50);
}

#[test]
fn test_empty_key_and_value() {
    let (_temp, mut store) = setup_temp_store();

    store.put(b"", b"empty key").unwrap();
    store.put(b"empty value", b"").unwrap();

    assert_eq!(store.get(b"").unwrap(), b"empty key".to_vec());
    assert_eq!(store.get(b"empty value").unwrap(), Vec::<u8>::new());
}

#[test]
fn test_binary_values() {
    let (_temp, mut store) = setup_temp_store();
    let value: Vec<u8> = (0..=255).collect();

    store.put(b"bin", &value).unwrap();

    assert_eq!(store.get(b"bin").unwrap(), value);
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_two_small_records_share_page_zero() {
    let (_temp, mut store) = setup_temp_store();

    store.put(b"name", b"watermelonDB").unwrap();
    assert_eq!(store.file_len().unwrap(), page_bytes(1));

    store.put(b"hello", b"namaste").unwrap();

    assert_eq!(store.get(b"name").unwrap(), b"watermelonDB".to_vec());
    assert_eq!(store.get(b"hello").unwrap(), b"namaste".to_vec());
    assert_eq!(store.file_len().unwrap(), page_bytes(1));
    assert_eq!(store.total_pages(), 1);
}

#[test]
fn test_on_disk_layout_of_first_page() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("layout.db");
    let mut store = Store::open_path(&path).unwrap();

    store.put(b"name", b"watermelonDB").unwrap();
    store.close().unwrap();

    let raw = fs::read(&path).unwrap();
    assert_eq!(raw.len(), PAGE_SIZE);
    assert_eq!(&raw[0..2], &1u16.to_le_bytes());
    assert_eq!(&raw[2..4], &28u16.to_le_bytes());
    assert_eq!(&raw[4..8], &4u32.to_le_bytes());
    assert_eq!(&raw[8..12], &12u32.to_le_bytes());
    assert_eq!(&raw[12..16], b"name");
    assert_eq!(&raw[16..28], b"watermelonDB");
}

// =============================================================================
// Page Allocation Tests
// =============================================================================

#[test]
fn test_new_page_allocated_when_current_is_full() {
    let (_temp, mut store) = setup_temp_store();

    // Four 1000-byte records fit in one page (4 + 4000 <= 4096)
    for i in 0..4 {
        let key = format!("k{}", i);
        store.put(key.as_bytes(), &value_for(key.as_bytes(), 1000)).unwrap();
        assert_eq!(store.file_len().unwrap(), page_bytes(1));
    }

    // The fifth does not
    store.put(b"k4", &value_for(b"k4", 1000)).unwrap();
    assert_eq!(store.file_len().unwrap(), page_bytes(2));
    assert_eq!(store.total_pages(), 2);

    for i in 0..5 {
        let key = format!("k{}", i);
        assert_eq!(store.get(key.as_bytes()).unwrap(), value_for(key.as_bytes(), 1000));
    }
}

#[test]
fn test_file_length_stays_page_aligned() {
    let (_temp, mut store) = setup_temp_store();

    for i in 0..200 {
        let key = format!("key-{:04}", i);
        let value = vec![b'v'; (i * 37) % 700];
        store.put(key.as_bytes(), &value).unwrap();
        assert_eq!(store.file_len().unwrap() % PAGE_SIZE as u64, 0);
    }
    assert_eq!(store.file_len().unwrap(), page_bytes(store.total_pages()));
}

#[test]
fn test_page_left_off_freelist_when_nearly_full() {
    let (_temp, mut store) = setup_temp_store();

    store.put(b"big", &value_for(b"big", 3000)).unwrap();

    // 1092 bytes remain, less than the 3000-byte record just written
    assert_eq!(store.freelist_len(), 0);

    // A tiny record now needs a fresh page
    store.put(b"small", b"v").unwrap();
    assert_eq!(store.total_pages(), 2);
}

#[test]
fn test_legacy_policy_drops_rejected_page() {
    let (_temp, mut store) = setup_temp_store_with(FreeListPolicy::Legacy);

    // Page 0: 1000 + 1000 bytes, 2092 free, stays on the freelist
    store.put(b"a", &value_for(b"a", 1000)).unwrap();
    store.put(b"b", &value_for(b"b", 1000)).unwrap();
    assert_eq!(store.freelist_len(), 1);

    // 3000 does not fit page 0: it is popped, rejected and dropped
    store.put(b"c", &value_for(b"c", 3000)).unwrap();
    assert_eq!(store.total_pages(), 2);
    assert_eq!(store.freelist_len(), 0);

    // Page 0 is no longer considered even for a record that would fit
    store.put(b"d", &value_for(b"d", 500)).unwrap();
    assert_eq!(store.total_pages(), 3);
}

#[test]
fn test_requeue_policy_keeps_rejected_page() {
    let (_temp, mut store) = setup_temp_store_with(FreeListPolicy::Requeue);

    store.put(b"a", &value_for(b"a", 1000)).unwrap();
    store.put(b"b", &value_for(b"b", 1000)).unwrap();

    store.put(b"c", &value_for(b"c", 3000)).unwrap();
    assert_eq!(store.total_pages(), 2);
    assert_eq!(store.freelist_len(), 1);

    // Page 0 still has 2092 bytes and takes this record
    store.put(b"d", &value_for(b"d", 500)).unwrap();
    assert_eq!(store.total_pages(), 2);
    assert_eq!(store.file_len().unwrap(), page_bytes(2));

    for (key, size) in [(b"a", 1000), (b"b", 1000), (b"c", 3000), (b"d", 500)] {
        assert_eq!(store.get(key).unwrap(), value_for(key, size));
    }
}

// =============================================================================
// Oversized Record Tests
// =============================================================================

#[test]
fn test_largest_record_fits() {
    let (_temp, mut store) = setup_temp_store();
    let value = value_for(b"max", MAX_RECORD_SIZE);

    store.put(b"max", &value).unwrap();

    assert_eq!(store.get(b"max").unwrap(), value);
    assert_eq!(store.file_len().unwrap(), page_bytes(1));
}

#[test]
fn test_oversized_record_rejected() {
    let (_temp, mut store) = setup_temp_store();
    store.put(b"existing", b"value").unwrap();
    let len_before = store.file_len().unwrap();

    let value = vec![0u8; PAGE_SIZE - HEADER_SIZE - RECORD_HEADER_SIZE];
    let result = store.put(b"k", &value);

    match result {
        Err(WatermelonError::RecordTooLarge { size, max }) => {
            assert_eq!(size, MAX_RECORD_SIZE + 1);
            assert_eq!(max, MAX_RECORD_SIZE);
        }
        other => panic!("expected RecordTooLarge, got {:?}", other),
    }
    assert_eq!(store.file_len().unwrap(), len_before);
    assert!(matches!(store.get(b"k"), Err(WatermelonError::KeyNotFound)));
    assert_eq!(store.get(b"existing").unwrap(), b"value".to_vec());
}

#[test]
fn test_oversized_record_on_empty_store() {
    let (_temp, mut store) = setup_temp_store();

    let result = store.put(b"huge", &vec![1u8; 10_000]);

    assert!(matches!(result, Err(WatermelonError::RecordTooLarge { .. })));
    assert_eq!(store.file_len().unwrap(), 0);
    assert_eq!(store.total_pages(), 0);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_restart_loses_index() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("watermelondata");

    {
        let mut store = Store::open_path(&path).unwrap();
        store.put(b"a", b"1").unwrap();
        store.close().unwrap();
    }

    let store = Store::open_path(&path).unwrap();
    assert!(matches!(store.get(b"a"), Err(WatermelonError::KeyNotFound)));
    assert_eq!(store.total_pages(), 1);
    assert!(store.is_empty());
}

#[test]
fn test_reopen_appends_after_existing_pages() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("watermelondata");

    {
        let mut store = Store::open_path(&path).unwrap();
        store.put(b"a", b"1").unwrap();
        store.close().unwrap();
    }

    let mut store = Store::open_path(&path).unwrap();
    store.put(b"b", b"2").unwrap();

    // The freelist starts empty, so the old page is not reused
    assert_eq!(store.total_pages(), 2);
    assert_eq!(store.file_len().unwrap(), page_bytes(2));
    assert_eq!(store.get(b"b").unwrap(), b"2".to_vec());
}

#[test]
fn test_open_with_partial_trailing_page() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("watermelondata");
    fs::write(&path, vec![0u8; PAGE_SIZE + 10]).unwrap();

    let mut store = Store::open_path(&path).unwrap();
    assert_eq!(store.total_pages(), 1);

    store.put(b"k", b"v").unwrap();

    assert_eq!(store.file_len().unwrap(), page_bytes(2));
    assert_eq!(store.get(b"k").unwrap(), b"v".to_vec());
}

#[test]
fn test_sync_on_write() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("synced.db"))
        .sync_on_write(true)
        .build();
    let mut store = Store::open(config).unwrap();

    store.put(b"k", b"v").unwrap();

    assert!(store.config().sync_on_write);
    assert_eq!(store.get(b"k").unwrap(), b"v".to_vec());
}

// =============================================================================
// Index Rebuild Tests
// =============================================================================

fn reopen_with_rebuild(path: &Path) -> Store {
    let config = Config::builder()
        .path(path)
        .rebuild_index_on_open(true)
        .build();
    Store::open(config).unwrap()
}

#[test]
fn test_rebuild_index_recovers_keys() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("watermelondata");

    {
        let mut store = Store::open_path(&path).unwrap();
        for i in 0..20 {
            let key = format!("k{}", i);
            store.put(key.as_bytes(), &value_for(key.as_bytes(), 600)).unwrap();
        }
        store.close().unwrap();
    }

    let store = reopen_with_rebuild(&path);
    assert_eq!(store.len(), 20);
    for i in 0..20 {
        let key = format!("k{}", i);
        assert_eq!(store.get(key.as_bytes()).unwrap(), value_for(key.as_bytes(), 600));
    }
}

#[test]
fn test_rebuild_index_prefers_later_copy_in_page() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("watermelondata");

    {
        let mut store = Store::open_path(&path).unwrap();
        store.put(b"key", b"old").unwrap();
        store.put(b"key", b"new").unwrap();
        store.close().unwrap();
    }

    let store = reopen_with_rebuild(&path);
    assert_eq!(store.get(b"key").unwrap(), b"new".to_vec());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_rebuild_index_skips_invalid_pages() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("watermelondata");

    {
        let mut store = Store::open_path(&path).unwrap();
        store.put(b"keep", b"me").unwrap();
        store.close().unwrap();
    }

    // Append an all-zero page
    let mut raw = fs::read(&path).unwrap();
    raw.extend_from_slice(&[0u8; PAGE_SIZE]);
    fs::write(&path, &raw).unwrap();

    let store = reopen_with_rebuild(&path);
    assert_eq!(store.total_pages(), 2);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(b"keep").unwrap(), b"me".to_vec());
}

// =============================================================================
// Failed Put Tests
// =============================================================================

#[test]
fn test_failed_reuse_read_leaves_state_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("watermelondata");
    let mut store = Store::open_path(&path).unwrap();

    store.put(b"a", b"1").unwrap();
    assert_eq!(store.freelist_len(), 1);

    // Shrink the file behind the store's back so page 0 can no longer be read
    fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(0)
        .unwrap();

    let result = store.put(b"b", b"2");

    assert!(matches!(result, Err(WatermelonError::Io(_))));
    assert_eq!(store.freelist_len(), 1);
    assert_eq!(store.total_pages(), 1);
    assert_eq!(store.len(), 1);
    assert!(matches!(store.get(b"b"), Err(WatermelonError::KeyNotFound)));
}

#[cfg(target_os = "linux")]
#[test]
fn test_failed_new_page_write_leaves_state_unchanged() {
    // Every write to /dev/full fails with ENOSPC
    let mut store = Store::open_path("/dev/full").unwrap();
    assert_eq!(store.total_pages(), 0);

    let result = store.put(b"k", b"v");

    assert!(matches!(result, Err(WatermelonError::Io(_))));
    assert_eq!(store.total_pages(), 0);
    assert_eq!(store.freelist_len(), 0);
    assert!(store.is_empty());
    assert!(matches!(store.get(b"k"), Err(WatermelonError::KeyNotFound)));
}
