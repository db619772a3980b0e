//! In-process memory pool

use crate::pool::{CacheItem, CachePool};
use crate::Result;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A process-local pool backed by a `HashMap`
///
/// Useful as the default pool in tests and short-lived processes. Values are
/// cloned out on fetch, so `M` must be `Clone`.
#[derive(Debug, Default)]
pub struct MemoryPool<M> {
    entries: RwLock<HashMap<String, M>>,
}

impl<M> MemoryPool<M> {
    /// Create an empty pool
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the pool is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<M: Clone> CachePool<M> for MemoryPool<M> {
    fn item(&self, key: &str) -> Result<CacheItem<M>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(match entries.get(key) {
            Some(value) => CacheItem::hit(key, value.clone()),
            None => CacheItem::miss(key),
        })
    }

    fn save(&self, item: CacheItem<M>) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let key = item.key().to_string();
        match item.into_value() {
            Some(value) => {
                entries.insert(key, value);
            }
            None => {
                entries.remove(&key);
            }
        }
        Ok(())
    }
}
