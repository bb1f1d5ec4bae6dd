//! Shader Compilation Context
//!
//! Owner of every shader cache and of the collaborators a compile needs.
//!
//! # Request Flow
//!
//! ```text
//! get_cached_shader(function, material, layout)
//!   ├─ ResourceCache hit ─────────────────────────────► Arc<Cached<ShaderObject>>
//!   └─ miss: request_compile
//!        ├─ code generation for the next candidate     (owning thread)
//!        ├─ persistent lookup                          (owning thread)
//!        ├─ platform compile                           (CompileWorker)
//!        ├─ on failure: back to code generation with
//!        │  the next candidate, same ticket            (owning thread)
//!        └─ finish: intern bytecode, persistent write-through,
//!           resolve textures, insert into the cache    (owning thread)
//! ```
//!
//! Candidates are the requested material, then the default material. The
//! default is only generated once the requested material has failed.
//!
//! `request_compile` / `poll` / `wait` expose the same flow in two phases so
//! a frame loop can keep rendering while a background worker compiles.

use std::io::{Read, Write};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::bytecode::BytecodeDedupCache;
use super::fallback::{FallbackCompileDriver, material_defines};
use super::persistent::{CompiledProgram, PersistentProgramCache, PersistentShaderId};
use super::platform::{PlatformCompiler, StageProfiles, compile_program};
use super::shader_function::{BaseFunction, FunctionFlags, ShaderFunction, VertexLayout};
use super::shader_gen::{ShaderGenerator, UserShaderParams, source_hash};
use super::shader_object::{BoundTextures, LinkedProgram, ShaderKey, ShaderObject};
use super::worker::{CompileJob, CompileWorker, JobResult, ProgramSource, StageJob};
use crate::assets::{Assets, MaterialHandle, TextureHandle};
use crate::errors::{Result, ShaderError};
use crate::renderer::compiler::{CompiledMaterial, compile_material};
use crate::renderer::core::{Cached, GpuTexture, ResourceCache, ResourceFactories};
use crate::renderer::settings::RendererConfig;
use crate::resources::{Material, ShaderDefines, TextureKind};
use crate::utils::interner;

/// Handle of an outstanding two-phase compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompileTicket(u64);

impl CompileTicket {
    #[inline]
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub enum CompileStatus {
    Pending,
    Ready(Arc<Cached<ShaderObject>>),
    Failed(ShaderError),
}

/// One function's line of a [`CompileReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub function: String,
    pub instruction_count: Option<u32>,
    pub errors: Vec<String>,
}

/// Result of compiling a material for every function it supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileReport {
    pub material: String,
    pub entries: Vec<ReportEntry>,
}

impl CompileReport {
    /// `"<function>: <n> instructions"`, or one `"<function>: <error>"` per error.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match entry.instruction_count {
                Some(count) => lines.push(format!("{}: {count} instructions", entry.function)),
                None => lines.extend(
                    entry
                        .errors
                        .iter()
                        .map(|error| format!("{}: {error}", entry.function)),
                ),
            }
        }
        lines
    }
}

// ─── Candidate Preparation ───────────────────────────────────────────────────

/// Owning-thread half of a prepared candidate.
struct PreparedCandidate {
    material: MaterialHandle,
    name: String,
    compiled: CompiledMaterial,
    persistent_id: Option<PersistentShaderId>,
    source_hash: u128,
    cached: Option<CompiledProgram>,
    sh_basis: Option<TextureHandle>,
}

struct PendingCompile {
    key: ShaderKey,
    object: ShaderObject,
    material_name: String,
    driver: FallbackCompileDriver<MaterialHandle>,
    /// The candidate currently on the worker.
    attempt: PreparedCandidate,
}

enum TicketState {
    Hit(Arc<Cached<ShaderObject>>),
    Compiling(Box<PendingCompile>),
    /// No candidate got through code generation.
    Failed(ShaderError),
}

// ─── Context ─────────────────────────────────────────────────────────────────

pub struct ShaderCompilationContext {
    config: RendererConfig,
    assets: Assets,
    default_material: MaterialHandle,
    compiler: Arc<dyn PlatformCompiler>,
    factories: ResourceFactories,

    // ---- Caches ----
    shaders: ResourceCache<ShaderKey, ShaderObject>,
    textures: ResourceCache<TextureHandle, GpuTexture>,
    bytecode: BytecodeDedupCache,
    persistent: PersistentProgramCache,

    // ---- Two-phase compiles ----
    worker: CompileWorker,
    tickets: FxHashMap<u64, TicketState>,
    completed: FxHashMap<u64, JobResult>,
    next_ticket: u64,
}

impl ShaderCompilationContext {
    /// Sets up the caches and registers the default material in `assets`.
    pub fn new(
        config: RendererConfig,
        assets: Assets,
        compiler: Arc<dyn PlatformCompiler>,
        factories: ResourceFactories,
    ) -> Result<Self> {
        let profiles = StageProfiles {
            vertex: config.vertex_profile.clone(),
            pixel: config.pixel_profile.clone(),
        };
        let worker = CompileWorker::new(config.compile_mode, Arc::clone(&compiler), profiles)?;
        interner::preload_common_defines();
        let default_material = assets.materials.add(Material::default_material());

        log::debug!(
            "Shader compilation context ready ({:?}, {} / {})",
            config.compile_mode,
            config.vertex_profile,
            config.pixel_profile
        );

        Ok(Self {
            config,
            assets,
            default_material,
            compiler,
            factories,
            shaders: ResourceCache::new(),
            textures: ResourceCache::new(),
            bytecode: BytecodeDedupCache::new(),
            persistent: PersistentProgramCache::new(),
            worker,
            tickets: FxHashMap::default(),
            completed: FxHashMap::default(),
            next_ticket: 0,
        })
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    /// Handle of the material every failed candidate falls back to.
    #[inline]
    #[must_use]
    pub fn default_material(&self) -> MaterialHandle {
        self.default_material
    }

    #[must_use]
    pub fn shader_cache(&self) -> &ResourceCache<ShaderKey, ShaderObject> {
        &self.shaders
    }

    #[must_use]
    pub fn texture_cache(&self) -> &ResourceCache<TextureHandle, GpuTexture> {
        &self.textures
    }

    #[must_use]
    pub fn bytecode(&self) -> &BytecodeDedupCache {
        &self.bytecode
    }

    #[must_use]
    pub fn persistent(&self) -> &PersistentProgramCache {
        &self.persistent
    }

    // ── Synchronous Query ────────────────────────────────────────────────────

    /// The shader implementing `function` for `material` on `layout`.
    ///
    /// A hit returns the cached object; a miss compiles synchronously.
    pub fn get_cached_shader(
        &mut self,
        function: impl Into<ShaderFunction>,
        material: MaterialHandle,
        layout: VertexLayout,
    ) -> Result<Arc<Cached<ShaderObject>>> {
        let key = ShaderKey::new(function, material, layout);
        if let Some(hit) = self.shaders.get(&key) {
            return Ok(hit);
        }
        log::debug!(
            "Shader cache miss: {} for material {} on {}",
            key.function,
            material.resource_index(),
            layout
        );
        let ticket = self.request_compile(key.function, material, layout)?;
        self.wait(ticket)
    }

    // ── Two-Phase API ────────────────────────────────────────────────────────

    /// Generates code for the first candidate that gets through code
    /// generation and queues its platform compile.
    pub fn request_compile(
        &mut self,
        function: impl Into<ShaderFunction>,
        material: MaterialHandle,
        layout: VertexLayout,
    ) -> Result<CompileTicket> {
        let key = ShaderKey::new(function, material, layout);
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        if let Some(hit) = self.shaders.get(&key) {
            self.tickets.insert(ticket, TicketState::Hit(hit));
            return Ok(CompileTicket(ticket));
        }

        let requested = self.material(material)?;
        let mut object = ShaderObject::new(
            key,
            format!("{} {} on {}", requested.name, key.function, layout),
        );
        object.begin_compile();

        let mut candidates = vec![material];
        if material != self.default_material {
            candidates.push(self.default_material);
        }
        let mut driver = FallbackCompileDriver::new(candidates);

        let state = match self.next_attempt(key, &mut driver)? {
            Some((stage, attempt)) => {
                self.worker.submit(CompileJob { ticket, stage })?;
                TicketState::Compiling(Box::new(PendingCompile {
                    key,
                    object,
                    material_name: requested.name.clone(),
                    driver,
                    attempt,
                }))
            }
            None => {
                object.fail();
                TicketState::Failed(exhausted(&requested.name, key, driver.into_errors()))
            }
        };
        self.tickets.insert(ticket, state);
        Ok(CompileTicket(ticket))
    }

    /// Checks a ticket without blocking.
    ///
    /// A `Ready` or `Failed` status consumes the ticket; polling it again is
    /// an [`ShaderError::UnknownTicket`].
    pub fn poll(&mut self, ticket: CompileTicket) -> Result<CompileStatus> {
        match self.tickets.get(&ticket.0) {
            None => return Err(ShaderError::UnknownTicket(ticket.0)),
            Some(TicketState::Compiling(_)) => {}
            Some(TicketState::Hit(_) | TicketState::Failed(_)) => {
                return match self.tickets.remove(&ticket.0) {
                    Some(TicketState::Hit(hit)) => Ok(CompileStatus::Ready(hit)),
                    Some(TicketState::Failed(err)) => Ok(CompileStatus::Failed(err)),
                    _ => Err(ShaderError::UnknownTicket(ticket.0)),
                };
            }
        }

        for result in self.worker.drain()? {
            self.completed.insert(result.ticket, result);
        }
        Ok(self.try_finish(ticket))
    }

    /// Blocks until the ticket resolves.
    pub fn wait(&mut self, ticket: CompileTicket) -> Result<Arc<Cached<ShaderObject>>> {
        loop {
            match self.poll(ticket)? {
                CompileStatus::Ready(shader) => return Ok(shader),
                CompileStatus::Failed(err) => return Err(err),
                CompileStatus::Pending => match self.worker.wait_next()? {
                    Some(result) => {
                        self.completed.insert(result.ticket, result);
                    }
                    None => return Err(ShaderError::UnknownTicket(ticket.0)),
                },
            }
        }
    }

    /// Number of tickets that have not been consumed yet.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.tickets.len()
    }

    fn try_finish(&mut self, ticket: CompileTicket) -> CompileStatus {
        let Some(result) = self.completed.remove(&ticket.0) else {
            return CompileStatus::Pending;
        };
        let Some(TicketState::Compiling(pending)) = self.tickets.remove(&ticket.0) else {
            return CompileStatus::Failed(ShaderError::UnknownTicket(ticket.0));
        };
        match self.finish(*pending, result) {
            Ok(Some(shader)) => CompileStatus::Ready(shader),
            Ok(None) => CompileStatus::Pending,
            Err(err) => CompileStatus::Failed(err),
        }
    }

    /// Completes a ticket whose platform compile came back.
    ///
    /// A failed candidate hands the ticket to the next one and yields
    /// `None`.
    fn finish(
        &mut self,
        pending: PendingCompile,
        result: JobResult,
    ) -> Result<Option<Arc<Cached<ShaderObject>>>> {
        let PendingCompile {
            key,
            mut object,
            material_name,
            mut driver,
            attempt: prepared,
        } = pending;

        let source = match result.outcome {
            Ok(source) => source,
            Err(errors) => {
                driver.fail(&prepared.name, errors);
                let next = match self.next_attempt(key, &mut driver) {
                    Ok(next) => next,
                    Err(err) => {
                        object.fail();
                        return Err(err);
                    }
                };
                let Some((stage, attempt)) = next else {
                    object.fail();
                    return Err(exhausted(&material_name, key, driver.into_errors()));
                };
                self.worker.submit(CompileJob {
                    ticket: result.ticket,
                    stage,
                })?;
                self.tickets.insert(
                    result.ticket,
                    TicketState::Compiling(Box::new(PendingCompile {
                        key,
                        object,
                        material_name,
                        driver,
                        attempt,
                    })),
                );
                return Ok(None);
            }
        };

        // A concurrent ticket for the same key may have finished first
        if let Some(existing) = self.shaders.get(&key) {
            return Ok(Some(existing));
        }

        let program = match source {
            ProgramSource::Persistent => match prepared.cached {
                Some(program) => {
                    log::debug!("Persistent hit for {}", object.description());
                    program
                }
                None => {
                    object.fail();
                    return Err(ShaderError::UnknownTicket(result.ticket));
                }
            },
            ProgramSource::Fresh(output) => {
                let vertex = self
                    .bytecode
                    .intern(&output.vertex.code, output.vertex.instruction_count);
                let pixel = self
                    .bytecode
                    .intern(&output.pixel.code, output.pixel.instruction_count);
                let mut bindings = output.vertex.parameters;
                bindings.extend(output.pixel.parameters);
                let program = CompiledProgram {
                    vertex,
                    pixel,
                    bindings,
                };
                if let Some(id) = prepared.persistent_id {
                    self.persistent
                        .store(id, prepared.source_hash, program.clone());
                }
                program
            }
        };

        let textures = match self.resolve_textures(&prepared.compiled.textures, prepared.sh_basis) {
            Ok(textures) => textures,
            Err(err) => {
                object.fail();
                log::error!("{}: {err}", object.description());
                return Err(err);
            }
        };

        let linked = LinkedProgram {
            candidate: prepared.name,
            source_material: prepared.material,
            vertex_code: Arc::clone(self.bytecode.get(program.vertex)),
            pixel_code: Arc::clone(self.bytecode.get(program.pixel)),
            pixel_instruction_count: self.bytecode.instruction_count(program.pixel),
            program,
        };
        object.cache(prepared.compiled, linked, textures, driver.into_errors());
        Ok(Some(self.shaders.insert(key, object)))
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn material(&self, handle: MaterialHandle) -> Result<Arc<Material>> {
        self.assets
            .materials
            .get(handle)
            .ok_or_else(|| ShaderError::MissingAsset(format!("material {}", handle.resource_index())))
    }

    fn program_defines(&self, function: ShaderFunction, material: &Material) -> ShaderDefines {
        let mut defines = self.config.base_defines();
        defines.merge(&material_defines(material));
        if function.base().is_mesh_function() {
            let flags = function.flags();
            defines.set_flag("USE_FP_BLENDING", flags.contains(FunctionFlags::USE_FP_BLENDING));
            defines.set_flag("OPAQUELAYER", flags.contains(FunctionFlags::OPAQUE_LAYER));
        }
        defines
    }

    /// Prepares candidates in order until one gets through code generation.
    /// Generation errors are recorded on the driver.
    fn next_attempt(
        &self,
        key: ShaderKey,
        driver: &mut FallbackCompileDriver<MaterialHandle>,
    ) -> Result<Option<(StageJob, PreparedCandidate)>> {
        while let Some((_, handle)) = driver.next_candidate() {
            let material = self.material(handle)?;
            match self.prepare_candidate(key.function, key.layout, handle, &material) {
                Ok(prepared) => return Ok(Some(prepared)),
                Err(errors) => driver.fail(&material.name, errors),
            }
        }
        Ok(None)
    }

    /// Code generation and persistent lookup for one candidate.
    fn prepare_candidate(
        &self,
        function: ShaderFunction,
        layout: VertexLayout,
        handle: MaterialHandle,
        material: &Material,
    ) -> std::result::Result<(StageJob, PreparedCandidate), Vec<String>> {
        let compiled = compile_material(material, &self.assets.textures)?;
        let params = UserShaderParams::new(material, &compiled);
        let source = ShaderGenerator::generate_shader(function, layout, &params)
            .map_err(|err| vec![err.to_string()])?;
        if self.config.dump_generated_source {
            log::debug!("{source}");
        }

        let defines = self.program_defines(function, material);
        let hash = source_hash(&source, &defines);
        let persistent_id = material.stable_id.map(|stable_id| PersistentShaderId {
            stable_id,
            function,
            layout,
        });
        let cached = persistent_id
            .as_ref()
            .and_then(|id| self.persistent.lookup(id, hash))
            .cloned();

        let stage = StageJob {
            source: Arc::from(source),
            defines,
            persistent_hit: cached.is_some(),
        };
        Ok((
            stage,
            PreparedCandidate {
                material: handle,
                name: material.name.clone(),
                compiled,
                persistent_id,
                source_hash: hash,
                cached,
                sh_basis: material.shm.map(|shm| shm.basis),
            },
        ))
    }

    /// One reference per texture, built through the registered factories on
    /// a miss. The SH basis must be a cubemap.
    fn resolve_textures(
        &mut self,
        handles: &[TextureHandle],
        sh_basis: Option<TextureHandle>,
    ) -> Result<BoundTextures> {
        let mut user = Vec::with_capacity(handles.len());
        for &handle in handles {
            user.push(self.resolve_texture(handle)?);
        }

        let sh_basis = match sh_basis {
            Some(handle) => {
                let basis = self.resolve_texture(handle)?;
                if basis.kind != TextureKind::TextureCube {
                    return Err(ShaderError::NotACubemap(basis.label.clone()));
                }
                Some(basis)
            }
            None => None,
        };
        Ok(BoundTextures { user, sh_basis })
    }

    fn resolve_texture(&mut self, handle: TextureHandle) -> Result<Arc<Cached<GpuTexture>>> {
        let textures = &self.assets.textures;
        let factories = &self.factories;
        self.textures.get_or_insert_with(handle, || {
            let texture = textures
                .get(handle)
                .ok_or_else(|| ShaderError::MissingAsset(format!("texture {handle:?}")))?;
            factories.create_texture(&texture)
        })
    }

    // ── Invalidation ─────────────────────────────────────────────────────────

    /// Drops every cached shader requested for `material` or built from it
    /// as a fallback. Returns how many.
    pub fn material_changed(&mut self, material: MaterialHandle) -> usize {
        let removed = self.shaders.invalidate_where(|key, shader| {
            key.material == material || shader.source_material() == Some(material)
        });
        log::debug!(
            "Material {} changed, invalidated {removed} shaders",
            material.resource_index()
        );
        removed
    }

    /// Drops every cached shader compiled for `layout`. Returns how many.
    pub fn vertex_layout_changed(&mut self, layout: VertexLayout) -> usize {
        let removed = self.shaders.invalidate_where(|key, _| key.layout == layout);
        log::debug!("Vertex layout {layout} changed, invalidated {removed} shaders");
        removed
    }

    /// Drops the runtime texture. Shaders holding it keep their reference
    /// until they are rebuilt.
    pub fn texture_changed(&mut self, texture: TextureHandle) -> bool {
        self.textures.invalidate(&texture)
    }

    /// Flushes the runtime shader and texture caches.
    pub fn clear(&mut self) {
        self.shaders.clear();
        self.textures.clear();
    }

    // ── Persistent Cache ─────────────────────────────────────────────────────

    pub fn save_persistent_cache<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.persistent.save(writer, &self.bytecode)
    }

    pub fn load_persistent_cache<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        self.persistent.load(reader, &mut self.bytecode)
    }

    pub fn flush_persistent_cache(&mut self) {
        self.persistent.flush();
    }

    // ── Diagnostics ──────────────────────────────────────────────────────────

    /// Logs and returns one line per cached shader.
    pub fn dump(&self) -> Vec<String> {
        self.shaders.dump(|key, entry, refs| {
            format!(
                "{}: MaterialResourceIndex={}, Function={}, Cached={}, NumRefs={}",
                entry.description(),
                key.material.resource_index(),
                key.function.bits(),
                u8::from(entry.is_cached()),
                refs
            )
        })
    }

    /// Compiles `material` for every base function it supports on
    /// [`VertexLayout::Local`], without fallback and without touching the
    /// runtime cache.
    pub fn compile_material_report(&self, handle: MaterialHandle) -> Result<CompileReport> {
        let material = self.material(handle)?;
        let profiles = StageProfiles {
            vertex: self.config.vertex_profile.clone(),
            pixel: self.config.pixel_profile.clone(),
        };

        let mut entries = Vec::new();
        for base in BaseFunction::ALL {
            if !base.supports(&material) {
                continue;
            }
            let function = ShaderFunction::from(base);
            let outcome = self
                .prepare_candidate(function, VertexLayout::Local, handle, &material)
                .and_then(|(stage, prepared)| match prepared.cached {
                    Some(program) => Ok(self.bytecode.instruction_count(program.pixel)),
                    None => compile_program(
                        self.compiler.as_ref(),
                        &stage.source,
                        &stage.defines,
                        &profiles,
                    )
                    .map(|output| output.pixel.instruction_count),
                });

            entries.push(match outcome {
                Ok(count) => ReportEntry {
                    function: base.name().to_string(),
                    instruction_count: Some(count),
                    errors: Vec::new(),
                },
                Err(errors) => ReportEntry {
                    function: base.name().to_string(),
                    instruction_count: None,
                    errors,
                },
            });
        }

        let report = CompileReport {
            material: material.name.clone(),
            entries,
        };
        for line in report.lines() {
            log::info!("{line}");
        }
        Ok(report)
    }
}

fn exhausted(material: &str, key: ShaderKey, errors: Vec<String>) -> ShaderError {
    let err = ShaderError::FallbackExhausted {
        material: material.to_string(),
        function: key.function.description(),
        errors,
    };
    log::error!("{err}");
    err
}
