//! The chunk table of a compile pass.

use serde::Serialize;

use super::types::{ChunkFlags, CodeType};
use super::user_input::UserInputId;

/// Index of a chunk inside its pass's [`CodeChunkTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub(crate) u32);

impl ChunkId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One compiled subexpression.
///
/// Chunks carrying a [`UserInputId`] have a CPU-side value; unless that input
/// embeds, their `text` is never emitted and the chunk is read through a
/// uniform slot instead.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeChunk {
    pub text: String,
    pub ty: CodeType,
    pub input: Option<UserInputId>,
    pub flags: ChunkFlags,
}

/// Append-only chunk storage; ids grow monotonically within a pass.
#[derive(Debug, Clone, Default)]
pub struct CodeChunkTable {
    chunks: Vec<CodeChunk>,
}

/// Serializable view of a chunk, used by source dumps.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkSnapshot {
    pub index: usize,
    pub text: String,
    pub ty: &'static str,
    pub user_input: Option<usize>,
}

impl CodeChunkTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: CodeChunk) -> ChunkId {
        let id = ChunkId(self.chunks.len() as u32);
        self.chunks.push(chunk);
        id
    }

    /// **Panics** if `id` was not issued by this table.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ChunkId) -> &CodeChunk {
        &self.chunks[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn last(&self) -> Option<&CodeChunk> {
        self.chunks.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CodeChunk> {
        self.chunks.iter()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<ChunkSnapshot> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| ChunkSnapshot {
                index,
                text: chunk.text.clone(),
                ty: chunk.ty.name(),
                user_input: chunk.input.map(UserInputId::index),
            })
            .collect()
    }
}
