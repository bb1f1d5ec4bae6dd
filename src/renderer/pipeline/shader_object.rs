//! Shader Objects
//!
//! A [`ShaderObject`] is one (function, material, vertex layout) combination
//! bound to its compiled bytecode, the CPU-side inputs feeding its uniform
//! arrays and the textures its samplers read.

use std::sync::Arc;

use super::persistent::CompiledProgram;
use super::shader_function::{ShaderFunction, VertexLayout};
use crate::assets::MaterialHandle;
use crate::renderer::compiler::{CompiledMaterial, EvalContext, UserInputId, UserInputs};
use crate::renderer::core::binding::{MaterialParameters, RenderDevice};
use crate::renderer::core::{Cached, GpuTexture};
use crate::resources::MaterialInstance;

/// Identity of a shader object in the runtime cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderKey {
    pub function: ShaderFunction,
    pub material: MaterialHandle,
    pub layout: VertexLayout,
}

impl ShaderKey {
    #[must_use]
    pub fn new(function: impl Into<ShaderFunction>, material: MaterialHandle, layout: VertexLayout) -> Self {
        Self {
            function: function.into(),
            material,
            layout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderState {
    Uncompiled,
    Compiling,
    Ready,
    Failed,
}

/// Bytecode of the winning candidate, ready to be bound.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    /// Name of the material that actually compiled.
    pub candidate: String,
    /// Handle of the material that actually compiled.
    pub source_material: MaterialHandle,
    pub program: CompiledProgram,
    pub vertex_code: Arc<[u8]>,
    pub pixel_code: Arc<[u8]>,
    pub pixel_instruction_count: u32,
}

/// Runtime textures a program samples.
#[derive(Debug, Default)]
pub struct BoundTextures {
    pub user: Vec<Arc<Cached<GpuTexture>>>,
    /// SH basis cubemap of SHM materials, bound to both basis samplers.
    pub sh_basis: Option<Arc<Cached<GpuTexture>>>,
}

pub struct ShaderObject {
    key: ShaderKey,
    description: String,
    state: ShaderState,
    linked: Option<LinkedProgram>,
    user_inputs: UserInputs,
    scalar_inputs: Vec<UserInputId>,
    vector_inputs: Vec<UserInputId>,
    textures: BoundTextures,
    parameters: MaterialParameters,
    errors: Vec<String>,
}

impl ShaderObject {
    #[must_use]
    pub fn new(key: ShaderKey, description: impl Into<String>) -> Self {
        Self {
            key,
            description: description.into(),
            state: ShaderState::Uncompiled,
            linked: None,
            user_inputs: UserInputs::new(),
            scalar_inputs: Vec::new(),
            vector_inputs: Vec::new(),
            textures: BoundTextures::default(),
            parameters: MaterialParameters::default(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn begin_compile(&mut self) {
        self.state = ShaderState::Compiling;
    }

    /// Takes ownership of the winning candidate's program and inputs.
    ///
    /// Parameters are resolved from the program's bindings here, once.
    /// `errors` are those of the candidates that failed before the winner.
    pub(crate) fn cache(
        &mut self,
        compiled: CompiledMaterial,
        linked: LinkedProgram,
        textures: BoundTextures,
        errors: Vec<String>,
    ) {
        self.parameters = MaterialParameters::resolve(&linked.program.bindings);
        self.user_inputs = compiled.user_inputs;
        self.scalar_inputs = compiled.scalar_inputs;
        self.vector_inputs = compiled.vector_inputs;
        self.textures = textures;
        self.errors = errors;
        self.linked = Some(linked);
        self.state = ShaderState::Ready;
    }

    pub(crate) fn fail(&mut self) {
        self.linked = None;
        self.textures = BoundTextures::default();
        self.state = ShaderState::Failed;
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> ShaderKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ShaderState {
        self.state
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the material that compiled: the requested one or a fallback.
    #[must_use]
    pub fn candidate(&self) -> Option<&str> {
        self.linked.as_ref().map(|l| l.candidate.as_str())
    }

    /// Material the program was built from; differs from the key's material
    /// after a fallback.
    #[must_use]
    pub fn source_material(&self) -> Option<MaterialHandle> {
        self.linked.as_ref().map(|l| l.source_material)
    }

    /// Compile errors collected on the way to the winning candidate. Empty
    /// when the requested material compiled.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    #[must_use]
    pub fn program(&self) -> Option<&CompiledProgram> {
        self.linked.as_ref().map(|l| &l.program)
    }

    #[must_use]
    pub fn pixel_instruction_count(&self) -> u32 {
        self.linked.as_ref().map_or(0, |l| l.pixel_instruction_count)
    }

    #[must_use]
    pub fn parameters(&self) -> &MaterialParameters {
        &self.parameters
    }

    #[must_use]
    pub fn textures(&self) -> &[Arc<Cached<GpuTexture>>] {
        &self.textures.user
    }

    #[must_use]
    pub fn sh_basis(&self) -> Option<&Arc<Cached<GpuTexture>>> {
        self.textures.sh_basis.as_ref()
    }

    #[must_use]
    pub fn user_inputs(&self) -> &UserInputs {
        &self.user_inputs
    }

    #[must_use]
    pub fn scalar_inputs(&self) -> &[UserInputId] {
        &self.scalar_inputs
    }

    #[must_use]
    pub fn vector_inputs(&self) -> &[UserInputId] {
        &self.vector_inputs
    }

    /// Sets the program and uploads the material's parameters.
    ///
    /// Values are evaluated from `instance` and the two clocks. Every array
    /// is capped by the register range the compiler reported; arrays the
    /// compiler optimized away are skipped. Objects that are not ready bind
    /// nothing.
    pub fn bind(
        &self,
        device: &mut dyn RenderDevice,
        instance: Option<&MaterialInstance>,
        object_time: f32,
        scene_time: f32,
    ) {
        let (ShaderState::Ready, Some(linked)) = (self.state, &self.linked) else {
            return;
        };
        device.set_program(&linked.vertex_code, &linked.pixel_code);

        let ctx = EvalContext {
            instance,
            object_time,
            scene_time,
        };

        if let Some(samplers) = self.parameters.user_textures {
            for (slot, texture) in
                (samplers.register_index..).zip(self.textures.user.iter().take(samplers.register_count as usize))
            {
                device.set_sampler(slot, texture.resource());
            }
        }

        if let Some(basis) = &self.textures.sh_basis {
            for sampler in [self.parameters.sh_basis_texture, self.parameters.sh_sky_basis_texture]
                .into_iter()
                .flatten()
            {
                device.set_sampler(sampler.register_index, basis.resource());
            }
        }

        if let Some(registers) = self.parameters.user_vector_inputs {
            for (register, &input) in (registers.register_index..)
                .zip(self.vector_inputs.iter().take(registers.register_count as usize))
            {
                let value = self.user_inputs.evaluate(input, &ctx);
                device.set_pixel_constant(register, value.to_array());
            }
        }

        if let Some(registers) = self.parameters.user_scalar_inputs {
            for (register, group) in (registers.register_index..)
                .zip(self.scalar_inputs.chunks(4).take(registers.register_count as usize))
            {
                let mut packed = [0.0f32; 4];
                for (lane, &input) in packed.iter_mut().zip(group) {
                    *lane = self.user_inputs.evaluate(input, &ctx).x;
                }
                device.set_pixel_constant(register, packed);
            }
        }
    }
}

impl std::fmt::Debug for ShaderObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderObject")
            .field("description", &self.description)
            .field("state", &self.state)
            .field("candidate", &self.candidate())
            .field("textures", &self.textures.user.len())
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}
