//! Metadata factory with cache-coherent lazy loading
//!
//! The factory owns an adapter that knows how to list classes and derive
//! metadata for them, plus an optional cache pool. Metadata for a class is
//! derived at most once per factory: a memoized instance short-circuits
//! everything, a validated pool hit skips derivation, and anything else is
//! derived and persisted back through the pool so the next process starts
//! warm. The class list itself is discovered once per factory and memoized.

use crate::model::ClassName;
use crate::Result;
use classmap_cache::{CacheItem, CachePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Cache pool the factory persists metadata through
pub type MetadataPool<M> = Box<dyn CachePool<M> + Send + Sync>;

/// Discovers classes and derives their metadata
///
/// The metadata shape is adapter-defined. `validate_cached` decides whether
/// a pool-cached instance is still usable; returning `false` makes the
/// factory re-derive and overwrite the entry. The two hooks observe where a
/// returned instance came from.
pub trait MetadataAdapter {
    /// Concrete metadata shape this adapter produces
    type Metadata;

    /// List every class this adapter covers
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails
    fn class_names(&mut self) -> Result<Vec<ClassName>>;

    /// Derive fresh metadata for one class
    ///
    /// # Errors
    ///
    /// Returns an error if the class is unknown or derivation fails
    fn load_metadata(&mut self, class: &ClassName) -> Result<Self::Metadata>;

    /// Whether a pool-cached instance is still usable
    fn validate_cached(&self, _metadata: &Self::Metadata) -> bool {
        true
    }

    /// Called after a validated pool hit is adopted
    fn on_cache_hit(&mut self, _metadata: &Self::Metadata) {}

    /// Called after fresh metadata has been derived and persisted
    fn on_loaded(&mut self, _metadata: &Self::Metadata) {}
}

/// Lazily loads per-class metadata, memoizing in process and persisting
/// through an optional cache pool
pub struct MetadataFactory<A: MetadataAdapter> {
    adapter: A,
    cache: Option<MetadataPool<A::Metadata>>,
    class_names: Option<Vec<ClassName>>,
    loaded: HashMap<ClassName, Arc<A::Metadata>>,
}

impl<A: MetadataAdapter> MetadataFactory<A>
where
    A::Metadata: Clone,
{
    /// Create a factory without a cache pool
    ///
    /// Without a pool the factory still memoizes in process, so each class
    /// is derived at most once per factory lifetime.
    #[must_use]
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            cache: None,
            class_names: None,
            loaded: HashMap::new(),
        }
    }

    /// Attach a cache pool at construction time
    #[must_use]
    pub fn with_cache(mut self, pool: MetadataPool<A::Metadata>) -> Self {
        self.cache = Some(pool);
        self
    }

    /// Attach or replace the cache pool
    pub fn set_cache(&mut self, pool: MetadataPool<A::Metadata>) {
        self.cache = Some(pool);
    }

    /// The adapter this factory derives through
    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Every class name the adapter covers, discovered once and memoized
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter's discovery fails
    pub fn all_class_names(&mut self) -> Result<&[ClassName]> {
        if self.class_names.is_none() {
            let names = self.adapter.class_names()?;
            tracing::debug!(count = names.len(), "discovered class names");
            self.class_names = Some(names);
        }
        Ok(self.class_names.as_deref().unwrap_or_default())
    }

    /// Metadata for one class
    ///
    /// Resolution order: in-process memo, then a validated cache pool hit,
    /// then fresh derivation (persisted back to the pool). The returned
    /// `Arc` is shared with the memo, so repeated calls are cheap.
    ///
    /// # Errors
    ///
    /// Returns an error if derivation fails or the pool misbehaves
    pub fn metadata_for(&mut self, class: &ClassName) -> Result<Arc<A::Metadata>> {
        if let Some(metadata) = self.loaded.get(class) {
            return Ok(Arc::clone(metadata));
        }

        let key = class.cache_key();

        if let Some(pool) = &self.cache {
            let item = pool.item(&key)?;
            if let Some(cached) = item.into_value() {
                if self.adapter.validate_cached(&cached) {
                    tracing::debug!(class = %class, "metadata served from cache");
                    let metadata = Arc::new(cached);
                    self.adapter.on_cache_hit(&metadata);
                    self.loaded.insert(class.clone(), Arc::clone(&metadata));
                    return Ok(metadata);
                }
                tracing::debug!(class = %class, "cached metadata rejected, re-deriving");
            }
        }

        let metadata = self.adapter.load_metadata(class)?;
        if let Some(pool) = &self.cache {
            let mut item = CacheItem::miss(&key);
            item.set(metadata.clone());
            pool.save(item)?;
        }
        tracing::debug!(class = %class, "metadata derived");

        let metadata = Arc::new(metadata);
        self.adapter.on_loaded(&metadata);
        self.loaded.insert(class.clone(), Arc::clone(&metadata));
        Ok(metadata)
    }

    /// Metadata for every discovered class, in discovery order
    ///
    /// Warms the memo (and the pool) as a side effect.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery or any derivation fails
    pub fn all_metadata(&mut self) -> Result<Vec<Arc<A::Metadata>>> {
        let names = self.all_class_names()?.to_vec();
        names.iter().map(|name| self.metadata_for(name)).collect()
    }

    /// The in-process memo of everything loaded so far
    #[must_use]
    pub fn loaded_metadata(&self) -> &HashMap<ClassName, Arc<A::Metadata>> {
        &self.loaded
    }
}
