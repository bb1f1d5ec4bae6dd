//! Reference-Counted Resource Cache
//!
//! A keyed map of shared resources. Each entry is an `Arc<Cached<R>>`; the
//! cache owns exactly one strong reference, holders own the rest. The `Arc`
//! strong count is the reference count, so it cannot underflow and the
//! resource is destroyed exactly when the last holder lets go.
//!
//! Invalidation never destroys a resource that is still held: it removes the
//! entry, clears the entry's `cached` flag, and drops only the cache's own
//! reference.

use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;

// ─── Cached Wrapper ──────────────────────────────────────────────────────────

/// A resource plus the flag telling whether a cache still indexes it.
pub struct Cached<R> {
    resource: R,
    cached: AtomicBool,
}

impl<R> Cached<R> {
    #[must_use]
    pub fn new(resource: R) -> Self {
        Self {
            resource,
            cached: AtomicBool::new(false),
        }
    }

    /// `true` while the owning cache still maps a key to this entry.
    #[inline]
    pub fn is_cached(&self) -> bool {
        self.cached.load(Ordering::Acquire)
    }

    #[inline]
    fn set_cached(&self, cached: bool) {
        self.cached.store(cached, Ordering::Release);
    }

    #[inline]
    pub fn resource(&self) -> &R {
        &self.resource
    }
}

impl<R> Deref for Cached<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for Cached<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cached")
            .field("resource", &self.resource)
            .field("cached", &self.is_cached())
            .finish()
    }
}

impl<R> Drop for Cached<R> {
    fn drop(&mut self) {
        log::trace!("Destroying {}", std::any::type_name::<R>());
    }
}

/// Takes an additional reference on a cached resource.
#[inline]
#[must_use]
pub fn add_ref<R>(entry: &Arc<Cached<R>>) -> Arc<Cached<R>> {
    Arc::clone(entry)
}

/// Gives up a reference. The resource is destroyed if it was the last one.
#[inline]
pub fn release<R>(entry: Arc<Cached<R>>) {
    drop(entry);
}

/// Live references to a cached resource, including the cache's own.
#[inline]
#[must_use]
pub fn ref_count<R>(entry: &Arc<Cached<R>>) -> usize {
    Arc::strong_count(entry)
}

// ─── Resource Cache ──────────────────────────────────────────────────────────

pub struct ResourceCache<K, R> {
    entries: FxHashMap<K, Arc<Cached<R>>>,
}

impl<K: Eq + Hash + Clone, R> Default for ResourceCache<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, R> ResourceCache<K, R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Returns the entry for `key`, building it with `factory` on a miss.
    ///
    /// A failing factory leaves the cache untouched.
    pub fn get_or_insert_with<E>(
        &mut self,
        key: K,
        factory: impl FnOnce() -> Result<R, E>,
    ) -> Result<Arc<Cached<R>>, E> {
        if let Some(entry) = self.entries.get(&key) {
            return Ok(Arc::clone(entry));
        }
        let resource = factory()?;
        Ok(self.insert(key, resource))
    }

    /// Inserts a freshly built resource, replacing (and invalidating) any
    /// previous entry under the same key.
    pub fn insert(&mut self, key: K, resource: R) -> Arc<Cached<R>> {
        let entry = Arc::new(Cached::new(resource));
        entry.set_cached(true);
        if let Some(previous) = self.entries.insert(key, Arc::clone(&entry)) {
            previous.set_cached(false);
        }
        entry
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<Arc<Cached<R>>> {
        self.entries.get(key).cloned()
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Drops the cache's reference to `key`. Returns `false` on a miss.
    pub fn invalidate(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                entry.set_cached(false);
                drop(entry);
                true
            }
            None => false,
        }
    }

    /// Invalidates every entry for which `pred(key, resource)` holds.
    ///
    /// Keys are collected first; nothing is released while the map is being
    /// iterated.
    pub fn invalidate_where(&mut self, mut pred: impl FnMut(&K, &R) -> bool) -> usize {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(key, entry)| pred(key, entry.resource()))
            .map(|(key, _)| key.clone())
            .collect();
        let removed: Vec<Arc<Cached<R>>> = doomed
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect();
        for entry in &removed {
            entry.set_cached(false);
        }
        removed.len()
    }

    pub fn clear(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.set_cached(false);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Arc<Cached<R>>)> {
        self.entries.iter()
    }

    /// Logs one line per entry at info level and returns the lines, sorted.
    ///
    /// `describe` receives the key, the entry and its live reference count
    /// excluding the cache's own.
    pub fn dump(&self, mut describe: impl FnMut(&K, &Cached<R>, usize) -> String) -> Vec<String> {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|(key, entry)| describe(key, &**entry, ref_count(entry) - 1))
            .collect();
        lines.sort();
        for line in &lines {
            log::info!("{line}");
        }
        lines
    }
}
