//! File-backed pool
//!
//! Entries are JSON envelopes stored in a two-level directory fan-out keyed
//! by the SHA-256 digest of the entry key, avoiding filesystem limits on
//! files per directory:
//!
//! ```text
//! {root}/
//!   ab/
//!     cd/
//!       abcdef123456....json
//! ```
//!
//! Reads are lenient: an unreadable or corrupt entry, or an entry whose
//! recorded key does not match the requested one, degrades to a miss with a
//! warning so a damaged cache heals itself on the next save. Writes go
//! through a temporary file and an atomic rename, so readers never observe
//! a partially written entry.

use crate::pool::{CacheItem, CachePool};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// On-disk entry envelope; the recorded key guards against digest collisions
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<M> {
    key: String,
    stored_at: DateTime<Utc>,
    value: M,
}

/// A pool persisting entries as JSON files under a root directory
pub struct DiskPool<M> {
    root: PathBuf,
    _value: PhantomData<fn() -> M>,
}

impl<M> std::fmt::Debug for DiskPool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskPool").field("root", &self.root).finish()
    }
}

impl<M> DiskPool<M> {
    /// Create a pool rooted at the given directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            _value: PhantomData,
        }
    }

    /// Create a pool at the resolved [`default_root`]
    ///
    /// # Errors
    ///
    /// Returns an error if no writable root directory can be found
    pub fn at_default_root() -> Result<Self> {
        Ok(Self::new(default_root()?))
    }

    /// The root directory entries are stored under
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage path for a key: `{root}/{aa}/{bb}/{digest}.json`
    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.root
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(format!("{digest}.json"))
    }

    fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(3).max_depth(3) {
            let entry = entry.map_err(|e| Error::io_no_path(e.into(), "walk"))?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json")
            {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    /// Number of stored entries
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be traversed
    pub fn entry_count(&self) -> Result<usize> {
        Ok(self.entry_paths()?.len())
    }

    /// Total size in bytes of all stored entries
    ///
    /// # Errors
    ///
    /// Returns an error if traversal or metadata reads fail
    pub fn total_size(&self) -> Result<u64> {
        let mut total = 0u64;
        for path in self.entry_paths()? {
            let meta = fs::metadata(&path).map_err(|e| Error::io(e, &path, "metadata"))?;
            total += meta.len();
        }
        Ok(total)
    }

    /// Remove every stored entry
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be removed or recreated
    pub fn clear(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)
                .map_err(|e| Error::io(e, &self.root, "remove_dir_all"))?;
        }
        fs::create_dir_all(&self.root).map_err(|e| Error::io(e, &self.root, "create_dir_all"))?;
        Ok(())
    }
}

impl<M: Serialize + DeserializeOwned> CachePool<M> for DiskPool<M> {
    fn item(&self, key: &str) -> Result<CacheItem<M>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(CacheItem::miss(key));
        }
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(key, path = %path.display(), %error, "unreadable cache entry, treating as miss");
                return Ok(CacheItem::miss(key));
            }
        };
        let envelope: Envelope<M> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(key, path = %path.display(), %error, "corrupt cache entry, treating as miss");
                return Ok(CacheItem::miss(key));
            }
        };
        if envelope.key != key {
            tracing::warn!(key, stored_key = %envelope.key, "cache entry key mismatch, treating as miss");
            return Ok(CacheItem::miss(key));
        }
        Ok(CacheItem::hit(key, envelope.value))
    }

    fn save(&self, item: CacheItem<M>) -> Result<()> {
        let path = self.entry_path(item.key());
        let key = item.key().to_string();
        let Some(value) = item.into_value() else {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| Error::io(e, &path, "remove_file"))?;
            }
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create_dir_all"))?;
        }

        let envelope = Envelope {
            key,
            stored_at: Utc::now(),
            value,
        };
        let bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| Error::serialization(format!("encoding cache entry: {e}")))?;

        // Write through a temporary file, then rename into place
        let tmp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path).map_err(|e| Error::io(e, &tmp_path, "create"))?;
        file.write_all(&bytes)
            .map_err(|e| Error::io(e, &tmp_path, "write"))?;
        file.sync_all().map_err(|e| Error::io(e, &tmp_path, "sync"))?;
        drop(file);
        fs::rename(&tmp_path, &path).map_err(|e| Error::io(e, &path, "rename"))?;

        Ok(())
    }
}

/// Inputs for resolving the default pool root
#[derive(Debug, Clone)]
struct RootInputs {
    override_dir: Option<PathBuf>,
    os_cache_dir: Option<PathBuf>,
    temp_dir: PathBuf,
}

fn default_root_from_inputs(inputs: RootInputs) -> Result<PathBuf> {
    // Resolution order (first writable wins):
    // 1) CLASSMAP_CACHE_DIR (explicit override)
    // 2) OS cache dir/classmap
    // 3) TMPDIR/classmap (fallback)
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = inputs.override_dir.filter(|p| !p.as_os_str().is_empty()) {
        candidates.push(dir);
    }
    if let Some(os_cache) = inputs.os_cache_dir {
        candidates.push(os_cache.join("classmap"));
    }
    candidates.push(inputs.temp_dir.join("classmap"));

    for path in candidates {
        // Some CI environments provide read-only cache directories under
        // $HOME, so an existing candidate still has to pass a write probe.
        if path.exists() {
            let probe = path.join(".write_probe");
            match fs::OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&probe)
            {
                Ok(_) => {
                    let _ = fs::remove_file(&probe);
                    return Ok(path);
                }
                Err(_) => continue,
            }
        }
        if fs::create_dir_all(&path).is_ok() {
            return Ok(path);
        }
    }
    Err(Error::configuration(
        "Failed to determine a writable cache directory",
    ))
}

/// Resolve the default root directory for disk pools
///
/// # Errors
///
/// Returns an error if no candidate directory is writable
pub fn default_root() -> Result<PathBuf> {
    let inputs = RootInputs {
        override_dir: std::env::var("CLASSMAP_CACHE_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from),
        os_cache_dir: dirs::cache_dir(),
        temp_dir: std::env::temp_dir(),
    };
    default_root_from_inputs(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Meta {
        name: String,
        fields: Vec<String>,
    }

    fn sample() -> Meta {
        Meta {
            name: "billing.Invoice".to_string(),
            fields: vec!["id".to_string(), "total".to_string()],
        }
    }

    #[test]
    fn unknown_key_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let pool: DiskPool<Meta> = DiskPool::new(tmp.path());
        let item = pool.item("absent").unwrap();
        assert!(!item.is_hit());
        assert_eq!(item.key(), "absent");
    }

    #[test]
    fn save_then_fetch_round_trips() {
        let tmp = TempDir::new().unwrap();
        let pool = DiskPool::new(tmp.path());

        let mut item = pool.item("billing__Invoice").unwrap();
        item.set(sample());
        pool.save(item).unwrap();

        let again = pool.item("billing__Invoice").unwrap();
        assert!(again.is_hit());
        assert_eq!(again.get(), Some(&sample()));
    }

    #[test]
    fn entries_are_sharded_two_levels() {
        let tmp = TempDir::new().unwrap();
        let pool: DiskPool<Meta> = DiskPool::new(tmp.path());

        let path = pool.entry_path("billing__Invoice");
        let digest = hex::encode(Sha256::digest(b"billing__Invoice"));
        let expected = tmp
            .path()
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(format!("{digest}.json"));
        assert_eq!(path, expected);
    }

    #[test]
    fn corrupt_entry_degrades_to_miss() {
        let tmp = TempDir::new().unwrap();
        let pool = DiskPool::new(tmp.path());
        pool.save(CacheItem::hit("k", sample())).unwrap();

        let path = pool.entry_path("k");
        fs::write(&path, b"not json at all").unwrap();

        let item = pool.item("k").unwrap();
        assert!(!item.is_hit());
    }

    #[test]
    fn key_mismatch_degrades_to_miss() {
        let tmp = TempDir::new().unwrap();
        let pool = DiskPool::new(tmp.path());
        pool.save(CacheItem::hit("original", sample())).unwrap();

        // Plant the entry written for "original" at the path for "other"
        let planted = pool.entry_path("other");
        fs::create_dir_all(planted.parent().unwrap()).unwrap();
        fs::copy(pool.entry_path("original"), &planted).unwrap();

        let item = pool.item("other").unwrap();
        assert!(!item.is_hit());
    }

    #[test]
    fn emptied_item_deletes_entry() {
        let tmp = TempDir::new().unwrap();
        let pool = DiskPool::new(tmp.path());
        pool.save(CacheItem::hit("k", sample())).unwrap();
        assert_eq!(pool.entry_count().unwrap(), 1);

        let mut item = pool.item("k").unwrap();
        item.clear();
        pool.save(item).unwrap();

        assert_eq!(pool.entry_count().unwrap(), 0);
        assert!(!pool.item("k").unwrap().is_hit());
    }

    #[test]
    fn save_overwrites_previous_value() {
        let tmp = TempDir::new().unwrap();
        let pool = DiskPool::new(tmp.path());
        pool.save(CacheItem::hit("k", sample())).unwrap();

        let mut updated = sample();
        updated.fields.push("tax".to_string());
        pool.save(CacheItem::hit("k", updated.clone())).unwrap();

        assert_eq!(pool.item("k").unwrap().get(), Some(&updated));
        assert_eq!(pool.entry_count().unwrap(), 1);
    }

    #[test]
    fn clear_and_sizes() {
        let tmp = TempDir::new().unwrap();
        let pool = DiskPool::new(tmp.path());
        pool.save(CacheItem::hit("a", sample())).unwrap();
        pool.save(CacheItem::hit("b", sample())).unwrap();

        assert_eq!(pool.entry_count().unwrap(), 2);
        assert!(pool.total_size().unwrap() > 0);

        pool.clear().unwrap();
        assert_eq!(pool.entry_count().unwrap(), 0);
        assert_eq!(pool.total_size().unwrap(), 0);
    }

    #[test]
    fn default_root_respects_override() {
        let tmp = TempDir::new().unwrap();
        let inputs = RootInputs {
            override_dir: Some(tmp.path().join("override")),
            os_cache_dir: Some(tmp.path().join("os-cache")),
            temp_dir: tmp.path().join("tmp"),
        };
        let root = default_root_from_inputs(inputs).unwrap();
        assert_eq!(root, tmp.path().join("override"));
    }

    #[test]
    fn default_root_falls_back_to_temp() {
        let tmp = TempDir::new().unwrap();
        let inputs = RootInputs {
            override_dir: None,
            os_cache_dir: None,
            temp_dir: tmp.path().to_path_buf(),
        };
        let root = default_root_from_inputs(inputs).unwrap();
        assert_eq!(root, tmp.path().join("classmap"));
        assert!(root.is_dir());
    }
}
