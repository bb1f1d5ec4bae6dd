//! Bytecode Dedup Cache
//!
//! Content-addressed store for compiled stage bytecode. Many materials
//! compile to byte-identical programs (every fallback to the default
//! material, for one); interning collapses them to one blob.
//!
//! Entries are immutable and only removed by [`BytecodeDedupCache::clear`].

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use xxhash_rust::xxh3::Xxh3;

/// Index of an interned blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BytecodeHandle(pub(crate) u32);

impl BytecodeHandle {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct BytecodeEntry {
    content_hash: u128,
    code: Arc<[u8]>,
    instruction_count: u32,
}

#[derive(Debug, Default)]
pub struct BytecodeDedupCache {
    entries: Vec<BytecodeEntry>,
    // Colliding blobs chain under the same hash
    lookup: FxHashMap<u128, SmallVec<[BytecodeHandle; 1]>>,
}

fn content_hash(code: &[u8], instruction_count: u32) -> u128 {
    let mut hasher = Xxh3::new();
    hasher.update(&instruction_count.to_le_bytes());
    hasher.update(code);
    hasher.digest128()
}

impl BytecodeDedupCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle of an identical blob, storing `code` if none exists.
    pub fn intern(&mut self, code: &[u8], instruction_count: u32) -> BytecodeHandle {
        let hash = content_hash(code, instruction_count);
        let chain = self.lookup.entry(hash).or_default();

        for &handle in chain.iter() {
            let entry = &self.entries[handle.index()];
            if entry.instruction_count == instruction_count && *entry.code == *code {
                return handle;
            }
        }

        if !chain.is_empty() {
            log::debug!("Bytecode hash collision on {hash:032x}");
        }

        let handle = BytecodeHandle(self.entries.len() as u32);
        self.entries.push(BytecodeEntry {
            content_hash: hash,
            code: Arc::from(code),
            instruction_count,
        });
        chain.push(handle);
        handle
    }

    /// The blob behind `handle`. Panics on a handle from another cache.
    #[must_use]
    pub fn get(&self, handle: BytecodeHandle) -> &Arc<[u8]> {
        &self.entries[handle.index()].code
    }

    #[must_use]
    pub fn instruction_count(&self, handle: BytecodeHandle) -> u32 {
        self.entries[handle.index()].instruction_count
    }

    #[must_use]
    pub fn content_hash(&self, handle: BytecodeHandle) -> u128 {
        self.entries[handle.index()].content_hash
    }

    #[must_use]
    pub fn contains(&self, handle: BytecodeHandle) -> bool {
        handle.index() < self.entries.len()
    }

    /// Live holders of the blob, excluding the cache itself.
    #[must_use]
    pub fn ref_count(&self, handle: BytecodeHandle) -> usize {
        Arc::strong_count(self.get(handle)) - 1
    }

    /// Iterates blobs in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (BytecodeHandle, &[u8], u32)> {
        self.entries.iter().enumerate().map(|(i, entry)| {
            (
                BytecodeHandle(i as u32),
                &*entry.code,
                entry.instruction_count,
            )
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every blob. Outstanding `Arc`s stay valid; handles do not.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lookup.clear();
    }
}
