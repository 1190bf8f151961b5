//! Shared store
//!
//! A cloneable handle that puts one mutex around a whole [`Store`].
//!
//! Every operation holds the lock for its full duration, which also covers
//! the freelist: two threads can never pop and reuse the same page id.
//! There is no per-page locking.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::engine::Store;
use crate::error::Result;

/// Thread-safe handle to a store
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<Store>>,
}

impl SharedStore {
    pub fn new(store: Store) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Open a store and wrap it
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self::new(Store::open(config)?))
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.lock().put(key, value)
    }

    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.inner.lock().get(key)
    }

    /// Run several operations under a single lock acquisition
    pub fn with<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        let mut store = self.inner.lock();
        f(&mut store)
    }

    /// Recover the store once this is the last handle
    ///
    /// Returns `None` while other clones are still alive.
    pub fn into_inner(self) -> Option<Store> {
        Arc::try_unwrap(self.inner).ok().map(Mutex::into_inner)
    }
}
