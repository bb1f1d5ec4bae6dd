use parking_lot::RwLock;
use slotmap::{Key, SlotMap};
use std::sync::Arc;

/// Handle-addressed asset container.
///
/// Assets are stored behind `Arc` so a compile pass can hold a material while
/// the owner replaces it; the pass keeps reading the version it started with.
pub struct AssetStorage<H: Key, T> {
    inner: RwLock<SlotMap<H, Arc<T>>>,
}

impl<H: Key, T> Default for AssetStorage<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Key, T> AssetStorage<H, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SlotMap::with_key()),
        }
    }

    /// [Write] Adds an asset and returns its handle.
    pub fn add(&self, asset: impl Into<T>) -> H {
        self.inner.write().insert(Arc::new(asset.into()))
    }

    /// [Write] Swaps in a new version of an existing asset.
    ///
    /// Returns `false` if the handle is stale.
    pub fn replace(&self, handle: H, asset: impl Into<T>) -> bool {
        let mut guard = self.inner.write();
        match guard.get_mut(handle) {
            Some(slot) => {
                *slot = Arc::new(asset.into());
                true
            }
            None => false,
        }
    }

    /// [Write] Removes an asset. Outstanding `Arc`s stay valid.
    pub fn remove(&self, handle: H) -> Option<Arc<T>> {
        self.inner.write().remove(handle)
    }

    /// [Read] Gets a single asset.
    pub fn get(&self, handle: H) -> Option<Arc<T>> {
        self.inner.read().get(handle).cloned()
    }

    pub fn contains(&self, handle: H) -> bool {
        self.inner.read().contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
