//! Shared fixtures for the integration tests: a fake platform compiler that
//! reports the parameter arrays of the generated source, a device that
//! records what gets bound, and a few materials.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use shadegraph::renderer::core::{
    BindingKind, GpuTexture, RenderDevice, ResourceFactories, UnresolvedBinding,
};
use shadegraph::renderer::pipeline::{PIXEL_ENTRY_POINT, StageOutput, StageRequest};
use glam::Vec4;

use shadegraph::resources::{
    BinaryOp, ChannelMask, ExpressionInput, MaterialProperty, PixelFormat, ShmSource, TextureKind,
};
use shadegraph::{
    Assets, Material, MaterialHandle, PlatformCompiler, RendererConfig, ShaderCompilationContext,
    Texture, TextureHandle,
};

// ============================================================================
// MockCompiler
// ============================================================================

/// Compiles every stage to `"<entry>:<source>"` and counts calls.
///
/// Sources containing `reject` fail with a compiler diagnostic. SHM programs
/// report the two SH basis samplers right after the user textures.
#[derive(Clone, Default)]
pub struct MockCompiler {
    pub calls: Arc<AtomicUsize>,
    pub reject: Option<&'static str>,
}

impl MockCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(marker: &'static str) -> Self {
        Self {
            reject: Some(marker),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Value of `#define <name> <n>` in a generated source, or zero.
pub fn define_value(source: &str, name: &str) -> u32 {
    source
        .lines()
        .filter_map(|line| line.strip_prefix("#define "))
        .filter_map(|rest| rest.strip_prefix(name))
        .find_map(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

fn binding(name: &str, kind: BindingKind, register_index: u32, register_count: u32) -> UnresolvedBinding {
    UnresolvedBinding {
        name: name.to_string(),
        kind,
        register_index,
        register_count,
    }
}

impl PlatformCompiler for MockCompiler {
    fn compile_stage(&self, request: &StageRequest<'_>) -> Result<StageOutput, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(marker) = self.reject
            && request.source.contains(marker)
        {
            return Err(format!(
                "error X3004: undeclared identifier '{marker}'\nerror X3000: {} failed",
                request.entry_point
            ));
        }

        let mut parameters = Vec::new();
        if request.entry_point == PIXEL_ENTRY_POINT {
            let textures = define_value(request.source, "NUM_USER_TEXTURES");
            let vectors = define_value(request.source, "NUM_USER_VECTOR_INPUTS");
            let scalars = define_value(request.source, "NUM_USER_SCALAR_INPUTS");
            if textures > 0 {
                parameters.push(binding("UserTextures", BindingKind::PixelSampler, 0, textures));
            }
            if vectors > 0 {
                parameters.push(binding("UserVectorInputs", BindingKind::PixelConstant, 0, vectors));
            }
            if scalars > 0 {
                parameters.push(binding(
                    "UserScalarInputs",
                    BindingKind::PixelConstant,
                    vectors,
                    scalars,
                ));
            }
            if request.defines.get("SHADER_SHM") == Some("1") {
                parameters.push(binding("SHBasisTexture", BindingKind::PixelSampler, textures, 1));
                parameters.push(binding(
                    "SHSkyBasisTexture",
                    BindingKind::PixelSampler,
                    textures + 1,
                    1,
                ));
            }
        }

        Ok(StageOutput {
            code: format!("{}:{}", request.entry_point, request.source).into_bytes(),
            instruction_count: request.source.lines().count() as u32,
            parameters,
        })
    }
}

// ============================================================================
// RecordingDevice
// ============================================================================

#[derive(Default)]
pub struct RecordingDevice {
    pub programs: usize,
    pub samplers: Vec<(u32, String)>,
    pub constants: Vec<(u32, [f32; 4])>,
}

impl RenderDevice for RecordingDevice {
    fn set_program(&mut self, _vertex: &[u8], _pixel: &[u8]) {
        self.programs += 1;
    }

    fn set_sampler(&mut self, slot: u32, texture: &GpuTexture) {
        self.samplers.push((slot, texture.label.clone()));
    }

    fn set_pixel_constant(&mut self, register: u32, value: [f32; 4]) {
        self.constants.push((register, value));
    }
}

// ============================================================================
// Context Setup
// ============================================================================

pub fn context_with(
    config: RendererConfig,
    assets: &Assets,
    compiler: &MockCompiler,
) -> ShaderCompilationContext {
    let _ = env_logger::builder().is_test(true).try_init();
    ShaderCompilationContext::new(
        config,
        assets.clone(),
        Arc::new(compiler.clone()),
        ResourceFactories::headless(),
    )
    .expect("context setup")
}

pub fn context(assets: &Assets, compiler: &MockCompiler) -> ShaderCompilationContext {
    context_with(RendererConfig::default(), assets, compiler)
}

// ============================================================================
// Materials
// ============================================================================

/// `Emissive = Clamp(Texture.rgb * Tint.rgb, 0, 1) * Glow`
pub fn textured_material(assets: &Assets) -> (MaterialHandle, TextureHandle) {
    let texture = assets
        .textures
        .add(Texture::new("RockDiffuse", TextureKind::Texture2D, PixelFormat::Dxt1));

    let mut material = Material::new("Rock");
    let graph = &mut material.graph;
    let sample = graph.texture_sample(texture, None);
    let tint = graph.vector_parameter("Tint");
    let product = graph.binary(
        BinaryOp::Mul,
        ExpressionInput::masked(sample, ChannelMask::RGB),
        ExpressionInput::masked(tint, ChannelMask::RGB),
    );
    let zero = graph.constant(0.0);
    let one = graph.constant(1.0);
    let clamped = graph.clamp(product, Some(zero.into()), Some(one.into()));
    let glow = graph.scalar_parameter("Glow");
    let emissive = graph.binary(BinaryOp::Mul, clamped, glow);
    material.set_input(MaterialProperty::EmissiveColor, ExpressionInput::from(emissive));

    (assets.materials.add(material), texture)
}

/// `Diffuse = float3 + float4`, rejected by the material compiler.
pub fn broken_material(assets: &Assets) -> MaterialHandle {
    let mut material = Material::new("Broken");
    let a = material.graph.constant3(1.0, 1.0, 1.0);
    let b = material.graph.constant4(Vec4::ONE);
    let sum = material.graph.binary(BinaryOp::Add, a, b);
    material.set_input(MaterialProperty::DiffuseColor, ExpressionInput::from(sum));
    assets.materials.add(material)
}

/// An SHM material: 2D coefficients plus the SH basis cubemap.
pub fn shm_material(assets: &Assets, basis_kind: TextureKind) -> (MaterialHandle, TextureHandle) {
    let coefficients = assets
        .textures
        .add(Texture::new("TreeSHM", TextureKind::Texture2D, PixelFormat::A8R8G8B8));
    let basis = assets
        .textures
        .add(Texture::new("SHBasis", basis_kind, PixelFormat::A8R8G8B8));

    let mut material = Material::new("Tree");
    material.shm = Some(ShmSource {
        coefficients,
        scale: Vec4::splat(2.0),
        bias: Vec4::splat(-1.0),
        basis,
    });
    (assets.materials.add(material), basis)
}
