//! Shared cache of imported file contents.
//!
//! Keys are canonical paths. Locks are held for a single map operation only;
//! disk reads on a miss happen with no lock held, so two compiles missing the
//! same file may both read it and the last insert wins.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::{Result, SassError};

/// How many entries the cache may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Entries live for the lifetime of the cache.
    #[default]
    Unbounded,
    /// At most `max_entries`; the oldest inserted entry is evicted first.
    Bounded { max_entries: usize },
}

/// Concurrency-safe path → contents cache.
#[derive(Debug, Default)]
pub struct FileCache {
    policy: CachePolicy,
    entries: RwLock<HashMap<PathBuf, Arc<str>>>,
    order: Mutex<VecDeque<PathBuf>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl CachePolicy {
    /// `None` means unbounded.
    pub fn from_max_entries(max_entries: Option<usize>) -> Self {
        match max_entries {
            Some(max_entries) => CachePolicy::Bounded { max_entries },
            None => CachePolicy::Unbounded,
        }
    }
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CachePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Look up a cached entry.
    pub fn get(&self, path: &Path) -> Option<Arc<str>> {
        let found = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned();
        match found {
            Some(contents) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(contents)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store an entry, evicting per the policy.
    pub fn insert(&self, path: PathBuf, contents: Arc<str>) {
        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.clone(), contents);
        if previous.is_some() {
            return;
        }

        let CachePolicy::Bounded { max_entries } = self.policy else {
            return;
        };
        let victims: Vec<PathBuf> = {
            let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
            order.push_back(path);
            let excess = order.len().saturating_sub(max_entries);
            order.drain(..excess).collect()
        };
        for victim in victims {
            log::debug!("evicting {} from import cache", victim.display());
            self.entries
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&victim);
        }
    }

    /// Return cached contents, reading and caching the file on a miss.
    pub fn load(&self, path: &Path) -> Result<Arc<str>> {
        if let Some(contents) = self.get(path) {
            log::debug!("import cache hit: {}", path.display());
            return Ok(contents);
        }

        let bytes = fs::read(path).map_err(|e| SassError::io(path, e))?;
        let text = String::from_utf8(bytes).map_err(|e| SassError::io(path, e))?;
        let contents: Arc<str> = Arc::from(text);
        self.insert(path.to_path_buf(), Arc::clone(&contents));
        Ok(contents)
    }

    /// Drop one entry so the next load re-reads it from disk.
    pub fn invalidate(&self, path: &Path) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some();
        if removed {
            self.order
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|p| p != path);
        }
        removed
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookups answered from memory.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that went to disk.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_reads_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_var.scss");
        fs::write(&path, "$a: 1;").unwrap();

        let cache = FileCache::new();
        assert_eq!(&*cache.load(&path).unwrap(), "$a: 1;");

        // Changing the file does not change the cached entry.
        fs::write(&path, "$a: 2;").unwrap();
        assert_eq!(&*cache.load(&path).unwrap(), "$a: 1;");
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_invalidate_rereads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_var.scss");
        fs::write(&path, "old").unwrap();

        let cache = FileCache::new();
        cache.load(&path).unwrap();
        fs::write(&path, "new").unwrap();

        assert!(cache.invalidate(&path));
        assert!(!cache.invalidate(&path));
        assert_eq!(&*cache.load(&path).unwrap(), "new");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let cache = FileCache::new();
        let err = cache.load(Path::new("/nonexistent/_nope.scss")).unwrap_err();
        assert!(matches!(err, SassError::Io { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_bounded_policy_evicts_oldest() {
        let cache = FileCache::with_policy(CachePolicy::Bounded { max_entries: 2 });
        cache.insert(PathBuf::from("a"), Arc::from("1"));
        cache.insert(PathBuf::from("b"), Arc::from("2"));
        cache.insert(PathBuf::from("c"), Arc::from("3"));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(Path::new("a")));
        assert!(cache.contains(Path::new("b")));
        assert!(cache.contains(Path::new("c")));
    }

    #[test]
    fn test_unbounded_policy_grows() {
        let cache = FileCache::new();
        for i in 0..50 {
            cache.insert(PathBuf::from(format!("f{i}")), Arc::from("x"));
        }
        assert_eq!(cache.len(), 50);
    }

    #[test]
    fn test_concurrent_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.scss");
        fs::write(&path, "body { color: red; }").unwrap();

        let cache = FileCache::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..20 {
                        assert_eq!(&*cache.load(&path).unwrap(), "body { color: red; }");
                    }
                });
            }
        });
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits() + cache.misses(), 160);
    }
}
