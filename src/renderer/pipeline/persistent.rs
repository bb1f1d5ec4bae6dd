//! Persistent Program Cache
//!
//! Cross-session cache of compiled programs, keyed by the material's stable
//! id plus function and vertex layout. Every entry carries the content hash
//! of the source it was compiled from; a lookup with a different hash is a
//! miss, so stale programs are never returned.
//!
//! # File Format
//!
//! Little-endian throughout:
//!
//! ```text
//! magic "SGPC" | version u32 | record_count i32
//! record_count × {
//!     stable_id [u8; 16] | function u8 | layout u8 | source_hash u128
//!     vertex_index i32 | pixel_index i32 | binding_count i32
//!     binding_count × { name_len i32 | name | register_index i32 | register_count i32 | kind u8 }
//! }
//! blob_count i32
//! blob_count × { instruction_count i32 | len i32 | bytes }
//! ```

use std::io::{Read, Write};

use rustc_hash::FxHashMap;
use uuid::Uuid;

use super::bytecode::{BytecodeDedupCache, BytecodeHandle};
use super::shader_function::{ShaderFunction, VertexLayout};
use crate::errors::{Result, ShaderError};
use crate::renderer::core::binding::{BindingKind, UnresolvedBinding};

pub const PERSISTENT_CACHE_MAGIC: [u8; 4] = *b"SGPC";
pub const PERSISTENT_CACHE_VERSION: u32 = 1;

/// Identity of a program that survives process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersistentShaderId {
    pub stable_id: Uuid,
    pub function: ShaderFunction,
    pub layout: VertexLayout,
}

/// Interned stage bytecode plus the bindings still addressed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    pub vertex: BytecodeHandle,
    pub pixel: BytecodeHandle,
    pub bindings: Vec<UnresolvedBinding>,
}

#[derive(Debug, Clone)]
struct PersistentEntry {
    source_hash: u128,
    program: CompiledProgram,
}

#[derive(Debug, Default)]
pub struct PersistentProgramCache {
    entries: FxHashMap<PersistentShaderId, PersistentEntry>,
}

impl PersistentProgramCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored program for `id`, if it was compiled from the same source.
    pub fn lookup(&self, id: &PersistentShaderId, source_hash: u128) -> Option<&CompiledProgram> {
        let entry = self.entries.get(id)?;
        if entry.source_hash != source_hash {
            log::debug!(
                "Persistent program for {} {} on {} is stale ({:032x} != {source_hash:032x})",
                id.stable_id,
                id.function,
                id.layout,
                entry.source_hash
            );
            return None;
        }
        Some(&entry.program)
    }

    /// Records a program, replacing any previous entry for `id`.
    pub fn store(&mut self, id: PersistentShaderId, source_hash: u128, program: CompiledProgram) {
        self.entries.insert(
            id,
            PersistentEntry {
                source_hash,
                program,
            },
        );
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

    /// Drops every entry.
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    /// Writes every entry and the blobs they reference.
    ///
    /// Only referenced blobs are written, renumbered densely in first-use
    /// order. Records are sorted by id so equal caches produce equal files.
    pub fn save<W: Write>(&self, writer: &mut W, bytecode: &BytecodeDedupCache) -> Result<()> {
        let mut ids: Vec<&PersistentShaderId> = self.entries.keys().collect();
        ids.sort();

        let mut blob_order: Vec<BytecodeHandle> = Vec::new();
        let mut blob_index: FxHashMap<BytecodeHandle, i32> = FxHashMap::default();
        let mut index_of = |handle: BytecodeHandle| -> Result<i32> {
            if let Some(&index) = blob_index.get(&handle) {
                return Ok(index);
            }
            let index = to_i32(blob_order.len())?;
            blob_order.push(handle);
            blob_index.insert(handle, index);
            Ok(index)
        };

        writer.write_all(&PERSISTENT_CACHE_MAGIC)?;
        writer.write_all(&PERSISTENT_CACHE_VERSION.to_le_bytes())?;
        writer.write_all(&to_i32(ids.len())?.to_le_bytes())?;

        for id in ids {
            let entry = &self.entries[id];
            let program = &entry.program;

            writer.write_all(id.stable_id.as_bytes())?;
            writer.write_all(&[id.function.bits(), id.layout as u8])?;
            writer.write_all(&entry.source_hash.to_le_bytes())?;
            writer.write_all(&index_of(program.vertex)?.to_le_bytes())?;
            writer.write_all(&index_of(program.pixel)?.to_le_bytes())?;
            writer.write_all(&to_i32(program.bindings.len())?.to_le_bytes())?;

            for binding in &program.bindings {
                writer.write_all(&to_i32(binding.name.len())?.to_le_bytes())?;
                writer.write_all(binding.name.as_bytes())?;
                writer.write_all(&to_i32(binding.register_index as usize)?.to_le_bytes())?;
                writer.write_all(&to_i32(binding.register_count as usize)?.to_le_bytes())?;
                writer.write_all(&[binding.kind as u8])?;
            }
        }

        writer.write_all(&to_i32(blob_order.len())?.to_le_bytes())?;
        for handle in blob_order {
            let code = bytecode.get(handle);
            let instruction_count = bytecode.instruction_count(handle);
            writer.write_all(&to_i32(instruction_count as usize)?.to_le_bytes())?;
            writer.write_all(&to_i32(code.len())?.to_le_bytes())?;
            writer.write_all(code)?;
        }

        log::debug!("Saved {} persistent shader programs", self.entries.len());
        Ok(())
    }

    /// Reads a stream written by [`save`](Self::save), interning its blobs.
    ///
    /// Entries are merged over the current contents. On error nothing is
    /// merged, though blobs read so far may already be interned.
    pub fn load<R: Read>(&mut self, reader: &mut R, bytecode: &mut BytecodeDedupCache) -> Result<()> {
        let mut input = CacheReader { inner: reader };

        let magic: [u8; 4] = input.read_array()?;
        if magic != PERSISTENT_CACHE_MAGIC {
            return Err(corrupt(format!("bad magic {magic:?}")));
        }
        let version = input.read_u32()?;
        if version != PERSISTENT_CACHE_VERSION {
            return Err(corrupt(format!("unsupported version {version}")));
        }

        let record_count = input.read_count()?;
        let mut records = Vec::with_capacity(record_count.min(1024));
        for _ in 0..record_count {
            records.push(input.read_record()?);
        }

        let blob_count = input.read_count()?;
        let mut handles = Vec::with_capacity(blob_count.min(1024));
        for _ in 0..blob_count {
            let instruction_count = input.read_count()? as u32;
            let len = input.read_count()?;
            let code = input.read_bytes(len)?;
            handles.push(bytecode.intern(&code, instruction_count));
        }

        let resolve = |index: i32| -> Result<BytecodeHandle> {
            usize::try_from(index)
                .ok()
                .and_then(|i| handles.get(i).copied())
                .ok_or_else(|| corrupt(format!("blob index {index} out of range")))
        };

        let mut loaded = Vec::with_capacity(records.len());
        for record in records {
            let program = CompiledProgram {
                vertex: resolve(record.vertex_index)?,
                pixel: resolve(record.pixel_index)?,
                bindings: record.bindings,
            };
            loaded.push((record.id, record.source_hash, program));
        }

        let count = loaded.len();
        for (id, source_hash, program) in loaded {
            self.store(id, source_hash, program);
        }
        log::debug!("Loaded {count} persistent shader programs");
        Ok(())
    }
}

fn corrupt(message: impl Into<String>) -> ShaderError {
    ShaderError::PersistentCacheCorrupt(message.into())
}

fn to_i32(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| corrupt(format!("value {value} does not fit the format")))
}

struct RawRecord {
    id: PersistentShaderId,
    source_hash: u128,
    vertex_index: i32,
    pixel_index: i32,
    bindings: Vec<UnresolvedBinding>,
}

struct CacheReader<'a, R> {
    inner: &'a mut R,
}

impl<R: Read> CacheReader<'_, R> {
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => corrupt("truncated stream"),
            _ => ShaderError::Io(e),
        })?;
        Ok(buf)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    fn read_u128(&mut self) -> Result<u128> {
        Ok(u128::from_le_bytes(self.read_array()?))
    }

    /// A non-negative `i32`.
    fn read_count(&mut self) -> Result<usize> {
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| corrupt(format!("negative count {value}")))
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = self
            .inner
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut buf)?;
        if read != len {
            return Err(corrupt("truncated stream"));
        }
        Ok(buf)
    }

    fn read_record(&mut self) -> Result<RawRecord> {
        let stable_id = Uuid::from_bytes(self.read_array()?);
        let function_bits = self.read_u8()?;
        let function = ShaderFunction::from_bits(function_bits)
            .ok_or_else(|| corrupt(format!("unknown shader function {function_bits:#04x}")))?;
        let layout_bits = self.read_u8()?;
        let layout = VertexLayout::from_bits(layout_bits)
            .ok_or_else(|| corrupt(format!("unknown vertex layout {layout_bits}")))?;
        let source_hash = self.read_u128()?;
        let vertex_index = self.read_i32()?;
        let pixel_index = self.read_i32()?;

        let binding_count = self.read_count()?;
        let mut bindings = Vec::with_capacity(binding_count.min(64));
        for _ in 0..binding_count {
            let name_len = self.read_count()?;
            let name = String::from_utf8(self.read_bytes(name_len)?)
                .map_err(|_| corrupt("binding name is not UTF-8"))?;
            let register_index = self.read_count()? as u32;
            let register_count = self.read_count()? as u32;
            let kind_bits = self.read_u8()?;
            let kind = BindingKind::from_u8(kind_bits)
                .ok_or_else(|| corrupt(format!("unknown binding kind {kind_bits}")))?;
            bindings.push(UnresolvedBinding {
                name,
                kind,
                register_index,
                register_count,
            });
        }

        Ok(RawRecord {
            id: PersistentShaderId {
                stable_id,
                function,
                layout,
            },
            source_hash,
            vertex_index,
            pixel_index,
            bindings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::pipeline::shader_function::BaseFunction;

    fn id(n: u128) -> PersistentShaderId {
        PersistentShaderId {
            stable_id: Uuid::from_u128(n),
            function: BaseFunction::Emissive.into(),
            layout: VertexLayout::Local,
        }
    }

    fn program(bytecode: &mut BytecodeDedupCache) -> CompiledProgram {
        CompiledProgram {
            vertex: bytecode.intern(b"vs", 4),
            pixel: bytecode.intern(b"ps", 7),
            bindings: vec![UnresolvedBinding {
                name: "UserVectorInputs".to_string(),
                kind: BindingKind::PixelConstant,
                register_index: 0,
                register_count: 2,
            }],
        }
    }

    #[test]
    fn stale_hash_is_a_miss() {
        let mut bytecode = BytecodeDedupCache::new();
        let mut cache = PersistentProgramCache::new();
        cache.store(id(1), 42, program(&mut bytecode));

        assert!(cache.lookup(&id(1), 42).is_some());
        assert!(cache.lookup(&id(1), 43).is_none());
        assert!(cache.lookup(&id(2), 42).is_none());
    }

    #[test]
    fn save_then_load_into_fresh_caches() {
        let mut bytecode = BytecodeDedupCache::new();
        let mut cache = PersistentProgramCache::new();
        cache.store(id(1), 7, program(&mut bytecode));

        let mut bytes = Vec::new();
        cache.save(&mut bytes, &bytecode).unwrap();
        assert_eq!(&bytes[..4], b"SGPC");

        let mut loaded_bytecode = BytecodeDedupCache::new();
        let mut loaded = PersistentProgramCache::new();
        loaded
            .load(&mut bytes.as_slice(), &mut loaded_bytecode)
            .unwrap();

        let entry = loaded.lookup(&id(1), 7).unwrap();
        assert_eq!(&**loaded_bytecode.get(entry.pixel), b"ps");
        assert_eq!(loaded_bytecode.instruction_count(entry.pixel), 7);
        assert_eq!(entry.bindings[0].register_count, 2);
    }

    #[test]
    fn truncated_stream_is_corrupt() {
        let mut bytecode = BytecodeDedupCache::new();
        let mut cache = PersistentProgramCache::new();
        cache.store(id(1), 7, program(&mut bytecode));

        let mut bytes = Vec::new();
        cache.save(&mut bytes, &bytecode).unwrap();
        bytes.truncate(bytes.len() - 1);

        let result = PersistentProgramCache::new()
            .load(&mut bytes.as_slice(), &mut BytecodeDedupCache::new());
        assert!(matches!(result, Err(ShaderError::PersistentCacheCorrupt(_))));
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let bytes = b"NOPE\x01\x00\x00\x00\x00\x00\x00\x00".to_vec();
        let result = PersistentProgramCache::new()
            .load(&mut bytes.as_slice(), &mut BytecodeDedupCache::new());
        assert!(matches!(result, Err(ShaderError::PersistentCacheCorrupt(_))));
    }
}
