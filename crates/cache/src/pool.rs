//! Cache item and pool abstractions
//!
//! A pool lookup always yields an item: a miss yields an empty item that
//! still carries the key, so the caller can fill it with [`CacheItem::set`]
//! and hand it back to [`CachePool::save`]. Deletion rides the same surface,
//! saving an emptied item removes whatever the pool stored under that key.

use crate::Result;

/// A single cache entry in transit between a pool and its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem<M> {
    key: String,
    value: Option<M>,
}

impl<M> CacheItem<M> {
    /// Create an empty item for `key` (a cache miss)
    #[must_use]
    pub fn miss(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Create a populated item for `key` (a cache hit)
    #[must_use]
    pub fn hit(key: impl Into<String>, value: M) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
        }
    }

    /// The key this item is stored under
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the item holds a value
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow the stored value, if any
    #[must_use]
    pub fn get(&self) -> Option<&M> {
        self.value.as_ref()
    }

    /// Replace the stored value
    pub fn set(&mut self, value: M) {
        self.value = Some(value);
    }

    /// Empty the item; saving it afterwards deletes the pool entry
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Consume the item, yielding the stored value
    #[must_use]
    pub fn into_value(self) -> Option<M> {
        self.value
    }
}

/// A key/value pool holding one value per string key
///
/// Misses are not errors: [`CachePool::item`] returns `Ok` with an empty
/// item when the key is unknown. Errors are reserved for the pool itself
/// misbehaving (I/O, serialization).
pub trait CachePool<M> {
    /// Fetch the item stored under `key`
    fn item(&self, key: &str) -> Result<CacheItem<M>>;

    /// Persist `item` under its key
    fn save(&self, item: CacheItem<M>) -> Result<()>;
}

// A shared pool is a pool, so one instance can serve several consumers
impl<M, P: CachePool<M>> CachePool<M> for std::sync::Arc<P> {
    fn item(&self, key: &str) -> Result<CacheItem<M>> {
        (**self).item(key)
    }

    fn save(&self, item: CacheItem<M>) -> Result<()> {
        (**self).save(item)
    }
}
