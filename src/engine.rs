//! Engine Module
//!
//! The store façade that coordinates pages, the freelist and the index.
//!
//! ## Responsibilities
//! - Choose a target page for each write (reuse or allocate)
//! - Persist the page synchronously on every put
//! - Keep the in-memory index pointing at each key's latest record
//! - Resolve gets through the index

use std::fs;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::index::{Index, RecordLocation};
use crate::storage::{record_size, FreeList, FreeSlot, Page, PageFile, MAX_RECORD_SIZE, PAGE_SIZE};
use crate::WatermelonError;

/// A single-file page store
///
/// ## Concurrency Model: single owner
///
/// - `put` takes `&mut self`; one logical owner holds the store at a time
/// - `get` takes `&self` and uses positioned reads, no cursor is shared
/// - For multi-threaded use, wrap the whole store in
///   [`SharedStore`](crate::SharedStore)
///
/// ## Durability
///
/// Every put writes its page before returning, so there is nothing to flush
/// on close. There is no write-ahead log: a crash mid-write can leave a torn
/// page.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Backing file (exclusively owned until close)
    file: PageFile,

    /// Key → latest record location (memory only)
    index: Index,

    /// Pages that may have room for another record
    freelist: FreeList,

    /// Pages ever allocated; the next new page gets this id
    total_pages: u64,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Create the parent directory if needed
    /// 2. Open/create the backing file
    /// 3. Derive `total_pages` from the file length
    /// 4. Start with an empty index and freelist (or rebuild the index, if configured)
    pub fn open(config: Config) -> Result<Self> {
        if config.path.as_os_str().is_empty() {
            return Err(WatermelonError::Config("store path is empty".to_string()));
        }
        if config.path.is_dir() {
            return Err(WatermelonError::Config(format!(
                "store path {} is a directory",
                config.path.display()
            )));
        }

        // Step 1: Parent directory
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Step 2: Backing file
        let file = PageFile::open(&config.path, config.sync_on_write)?;

        // Step 3: Page count from length
        let file_len = file.len()?;
        let total_pages = file_len / PAGE_SIZE as u64;
        let trailing = file_len % PAGE_SIZE as u64;
        if trailing != 0 {
            warn!(
                path = %config.path.display(),
                trailing_bytes = trailing,
                "backing file ends in a partial page; it will be overwritten by the next allocation"
            );
        }

        // Step 4: In-memory state
        let freelist = FreeList::new(config.freelist_policy);
        let mut store = Self {
            config,
            file,
            index: Index::new(),
            freelist,
            total_pages,
        };

        if store.config.rebuild_index_on_open {
            let recovered = store.rebuild_index()?;
            info!(
                records = recovered,
                keys = store.index.len(),
                "rebuilt index from pages"
            );
        }

        info!(
            path = %store.config.path.display(),
            total_pages = store.total_pages,
            "store opened"
        );

        Ok(store)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified backing file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().path(path.as_ref()).build();
        Self::open(config)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Reject records that cannot fit in an empty page
    /// 2. Pick a target page (freelist candidate or new page)
    /// 3. Append the record and write the page
    /// 4. Point the index at the new record
    /// 5. Requeue the page if it could take another record this size
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        // Step 1: Size check, before anything is mutated
        let size = record_size(key, value);
        if size > MAX_RECORD_SIZE {
            return Err(WatermelonError::RecordTooLarge {
                size,
                max: MAX_RECORD_SIZE,
            });
        }

        // Step 2: Target page
        let (mut page, reused) = self.select_page(size)?;

        // Step 3: Pack and persist
        // select_page already checked free_space() >= size
        let page_offset = match page.add_record(key, value) {
            Ok(offset) => offset,
            Err(WatermelonError::InsufficientSpace { needed, available }) => {
                error!(
                    page_id = page.id(),
                    needed, available, "page selected for write cannot hold the record"
                );
                if let Some(slot) = reused {
                    self.freelist.restore(slot);
                }
                return Err(WatermelonError::Invariant(format!(
                    "page {} was selected with {} free bytes for a {}-byte record",
                    page.id(),
                    available,
                    needed
                )));
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.file.write_page(&mut page) {
            if let Some(slot) = reused {
                self.freelist.restore(slot);
            }
            return Err(e);
        }
        if page.id() == self.total_pages {
            self.total_pages += 1;
        }

        // Step 4: Index
        let location = RecordLocation {
            page_id: page.id(),
            page_offset,
        };
        self.index.insert(key, location);

        // Step 5: Freelist
        let remaining = page.free_space();
        if remaining >= size && self.freelist.push(page.id(), remaining) {
            debug!(page_id = page.id(), remaining, "page pushed to freelist");
        }

        Ok(())
    }

    /// Get a value by key
    ///
    /// Returns `KeyNotFound` when the key has no entry in the index. The
    /// record is read from wherever the index points; its stored key is not
    /// re-checked.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let location = self
            .index
            .lookup(key)
            .ok_or(WatermelonError::KeyNotFound)?;

        let page = self.file.read_page(location.page_id)?;
        let record = page.record_at(location.page_offset)?;

        Ok(record.value.to_vec())
    }

    /// Close the store
    ///
    /// Pages were already written by each put; this only syncs and releases
    /// the file handle.
    pub fn close(self) -> Result<()> {
        self.file.sync()?;
        info!(
            path = %self.config.path.display(),
            total_pages = self.total_pages,
            "store closed"
        );
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Pages allocated so far
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Pages currently queued for reuse
    pub fn freelist_len(&self) -> usize {
        self.freelist.len()
    }

    /// Number of keys in the index
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Current length of the backing file in bytes
    pub fn file_len(&self) -> Result<u64> {
        self.file.len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Pick the page that will receive a record of `size` bytes
    ///
    /// Returns the page and, if it came off the freelist, its slot (so a
    /// failed write can put it back).
    fn select_page(&mut self, size: usize) -> Result<(Page, Option<FreeSlot>)> {
        if let Some(slot) = self.freelist.pop_for(size) {
            let page = match self.file.read_page(slot.page_id) {
                Ok(page) => page,
                Err(e) => {
                    self.freelist.restore(slot);
                    return Err(e);
                }
            };

            let available = page.free_space();
            if available >= size {
                debug!(page_id = slot.page_id, available, size, "reusing page from freelist");
                return Ok((page, Some(slot)));
            }

            let requeued = self.freelist.reject(slot.page_id, available);
            debug!(
                page_id = slot.page_id,
                available, size, requeued, "freelist candidate too full"
            );
        }

        let page_id = self.total_pages;
        debug!(page_id, size, "allocating new page");
        Ok((Page::new(page_id), None))
    }

    /// Scan every page and index the records found
    ///
    /// Records are indexed in (page, offset) order, so a key stored more than
    /// once resolves to its copy furthest into the file.
    fn rebuild_index(&mut self) -> Result<usize> {
        let mut recovered = 0;

        for page_id in 0..self.total_pages {
            let page = self.file.read_page(page_id)?;
            if !page.has_valid_header() {
                warn!(page_id, "skipping page with invalid header");
                continue;
            }

            for record in page.records() {
                match record {
                    Ok(record) => {
                        self.index.insert(
                            record.key,
                            RecordLocation {
                                page_id,
                                page_offset: record.offset,
                            },
                        );
                        recovered += 1;
                    }
                    Err(e) => {
                        warn!(page_id, error = %e, "stopping scan of corrupt page");
                        break;
                    }
                }
            }
        }

        Ok(recovered)
    }
}
