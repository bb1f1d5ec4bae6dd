//! Shader Object Tests
//!
//! Tests for:
//! - ShaderObject::bind: samplers, vector registers, packed scalar registers
//! - SH basis cubemap on both basis samplers of SHM materials
//! - Evaluation of parameters and clocks at bind time
//! - Descriptions and resolved parameter ranges

mod common;

use glam::Vec4;

use common::{MockCompiler, RecordingDevice, context, shm_material, textured_material};
use shadegraph::resources::{ExpressionInput, MaterialProperty, TextureKind};
use shadegraph::{Assets, BaseFunction, Material, MaterialInstance, VertexLayout};

// ============================================================================
// Binding
// ============================================================================

#[test]
fn bind_uploads_textures_vectors_and_packed_scalars() -> anyhow::Result<()> {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let (rock, _) = textured_material(&assets);

    let shader = ctx.get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)?;
    assert_eq!(shader.vector_inputs().len(), 1);
    assert_eq!(shader.scalar_inputs().len(), 1);

    let mut instance = MaterialInstance::new();
    instance.set_vector("Tint", Vec4::new(0.5, 0.25, 1.0, 1.0));
    instance.set_scalar("Glow", 2.0);

    let mut device = RecordingDevice::default();
    shader.bind(&mut device, Some(&instance), 0.0, 0.0);

    assert_eq!(device.programs, 1);
    assert_eq!(device.samplers, vec![(0, "RockDiffuse".to_string())]);
    assert_eq!(
        device.constants,
        vec![(0, [0.5, 0.25, 1.0, 1.0]), (1, [2.0, 0.0, 0.0, 0.0])]
    );
    Ok(())
}

#[test]
fn missing_instance_values_bind_as_zero() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let (rock, _) = textured_material(&assets);

    let shader = ctx
        .get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    let mut device = RecordingDevice::default();
    shader.bind(&mut device, None, 0.0, 0.0);

    assert_eq!(
        device.constants,
        vec![(0, [0.0, 0.0, 0.0, 0.0]), (1, [0.0, 0.0, 0.0, 0.0])]
    );
}

#[test]
fn plain_material_binds_only_its_program() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let rock = assets.materials.add(Material::new("Rock"));

    let shader = ctx
        .get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    let mut device = RecordingDevice::default();
    shader.bind(&mut device, None, 1.0, 2.0);

    assert_eq!(device.programs, 1);
    assert!(device.samplers.is_empty());
    assert!(device.constants.is_empty());
}

#[test]
fn shm_material_binds_the_sh_basis_to_both_samplers() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let (tree, _) = shm_material(&assets, TextureKind::TextureCube);

    let shader = ctx
        .get_cached_shader(BaseFunction::PointLight, tree, VertexLayout::Local)
        .unwrap();
    let parameters = shader.parameters();
    assert_eq!(parameters.sh_basis_texture.map(|b| b.register_index), Some(1));
    assert_eq!(parameters.sh_sky_basis_texture.map(|b| b.register_index), Some(2));

    let mut device = RecordingDevice::default();
    shader.bind(&mut device, None, 0.0, 0.0);
    assert_eq!(
        device.samplers,
        vec![
            (0, "TreeSHM".to_string()),
            (1, "SHBasis".to_string()),
            (2, "SHBasis".to_string()),
        ]
    );
}

#[test]
fn non_shm_material_skips_the_basis_samplers() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let (rock, _) = textured_material(&assets);

    let shader = ctx
        .get_cached_shader(BaseFunction::PointLight, rock, VertexLayout::Local)
        .unwrap();
    assert!(shader.sh_basis().is_none());
    assert_eq!(shader.parameters().sh_basis_texture, None);
}

#[test]
fn clocks_are_read_at_bind_time() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);

    let mut pulse = Material::new("Pulse");
    let time = pulse.graph.time(false);
    pulse.set_input(MaterialProperty::Opacity, ExpressionInput::from(time));
    let pulse = assets.materials.add(pulse);

    let shader = ctx
        .get_cached_shader(BaseFunction::Emissive, pulse, VertexLayout::Local)
        .unwrap();

    let mut device = RecordingDevice::default();
    shader.bind(&mut device, None, 3.0, 7.0);
    shader.bind(&mut device, None, 4.5, 7.0);

    assert_eq!(device.programs, 2);
    assert_eq!(
        device.constants,
        vec![(0, [3.0, 0.0, 0.0, 0.0]), (0, [4.5, 0.0, 0.0, 0.0])]
    );
}

// ============================================================================
// Accessors
// ============================================================================

#[test]
fn description_names_material_function_and_layout() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let (rock, _) = textured_material(&assets);

    let shader = ctx
        .get_cached_shader(BaseFunction::DepthOnly, rock, VertexLayout::Foliage)
        .unwrap();
    assert_eq!(shader.description(), "Rock DepthOnly on Foliage");
    assert_eq!(shader.key().layout, VertexLayout::Foliage);
}

#[test]
fn parameters_follow_the_reported_registers() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let (rock, _) = textured_material(&assets);

    let shader = ctx
        .get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    let parameters = shader.parameters();

    let samplers = parameters.user_textures.unwrap();
    assert_eq!((samplers.register_index, samplers.register_count), (0, 1));
    let vectors = parameters.user_vector_inputs.unwrap();
    assert_eq!((vectors.register_index, vectors.register_count), (0, 1));
    let scalars = parameters.user_scalar_inputs.unwrap();
    assert_eq!((scalars.register_index, scalars.register_count), (1, 1));
    assert!(shader.pixel_instruction_count() > 0);
}
