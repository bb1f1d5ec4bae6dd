//! Persistent Program Cache Tests
//!
//! Tests for:
//! - Write-through of freshly compiled programs for materials with a stable id
//! - Save / load across contexts: hits skip the platform compiler
//! - Staleness: changed sources or defines recompile and replace the entry
//! - Corrupt streams and flushing

mod common;

use glam::Vec4;
use uuid::Uuid;

use common::{MockCompiler, RecordingDevice, context, context_with};
use shadegraph::resources::{ExpressionInput, MaterialInput, MaterialProperty};
use shadegraph::{
    Assets, BaseFunction, Material, MaterialHandle, MaterialInstance, RendererConfig, ShaderError,
    ShadingGraph, VertexLayout,
};

const ROCK_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_0000_0000_0000_0000_0001);

fn tinted(name: &str, parameter: &str) -> Material {
    let mut material = Material::new(name);
    let tint = material.graph.vector_parameter(parameter);
    material.set_input(MaterialProperty::EmissiveColor, ExpressionInput::from(tint));
    material
}

fn stable_material(assets: &Assets) -> MaterialHandle {
    assets
        .materials
        .add(tinted("Rock", "Tint").with_stable_id(ROCK_ID))
}

/// Compiles Rock for two functions and returns the saved cache.
fn saved_cache() -> Vec<u8> {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let rock = stable_material(&assets);

    ctx.get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    ctx.get_cached_shader(BaseFunction::DepthOnly, rock, VertexLayout::Local)
        .unwrap();
    assert_eq!(ctx.persistent().len(), 2);

    let mut bytes = Vec::new();
    ctx.save_persistent_cache(&mut bytes).unwrap();
    bytes
}

// ============================================================================
// Write-Through
// ============================================================================

#[test]
fn only_materials_with_a_stable_id_are_persisted() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let rock = stable_material(&assets);
    let sand = assets.materials.add(tinted("Sand", "Tint"));

    ctx.get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    ctx.get_cached_shader(BaseFunction::Emissive, sand, VertexLayout::Local)
        .unwrap();

    assert_eq!(ctx.persistent().len(), 1);
}

#[test]
fn fallback_programs_are_not_persisted_for_the_requested_material() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);

    let foreign = {
        let mut other = ShadingGraph::new();
        other.constant(0.0);
        other.constant(1.0)
    };
    let mut broken = Material::new("Broken").with_stable_id(ROCK_ID);
    broken.set_input(MaterialProperty::Opacity, ExpressionInput::from(foreign));
    let broken = assets.materials.add(broken);

    let shader = ctx
        .get_cached_shader(BaseFunction::Emissive, broken, VertexLayout::Local)
        .unwrap();
    assert_eq!(shader.candidate(), Some("DefaultMaterial"));
    assert!(ctx.persistent().is_empty());
}

// ============================================================================
// Save & Load
// ============================================================================

#[test]
fn loaded_programs_skip_the_platform_compiler() {
    let bytes = saved_cache();

    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let rock = stable_material(&assets);
    ctx.load_persistent_cache(&mut bytes.as_slice()).unwrap();
    assert_eq!(ctx.persistent().len(), 2);
    assert_eq!(ctx.bytecode().len(), 4);

    let shader = ctx
        .get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    assert_eq!(compiler.calls(), 0);
    assert_eq!(shader.candidate(), Some("Rock"));

    // Bindings survive the round trip
    let mut instance = MaterialInstance::new();
    instance.set_vector("Tint", Vec4::new(1.0, 0.5, 0.0, 1.0));
    let mut device = RecordingDevice::default();
    shader.bind(&mut device, Some(&instance), 0.0, 0.0);
    assert_eq!(device.programs, 1);
    assert_eq!(device.constants, vec![(0, [1.0, 0.5, 0.0, 1.0])]);
}

#[test]
fn saving_twice_produces_identical_streams() {
    let bytes = saved_cache();

    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    ctx.load_persistent_cache(&mut bytes.as_slice()).unwrap();

    let mut resaved = Vec::new();
    ctx.save_persistent_cache(&mut resaved).unwrap();
    assert_eq!(bytes, resaved);
}

#[test]
fn changed_graph_recompiles_and_replaces_the_entry() {
    let bytes = saved_cache();

    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let rock = assets
        .materials
        .add(tinted("Rock", "Glow").with_stable_id(ROCK_ID));
    ctx.load_persistent_cache(&mut bytes.as_slice()).unwrap();

    // Only the parameter name changed; it never reaches the source
    ctx.get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    assert_eq!(compiler.calls(), 0);

    let mut edited = tinted("Rock", "Tint").with_stable_id(ROCK_ID);
    edited.set_input(MaterialProperty::Opacity, MaterialInput::Constant(Vec4::splat(0.5)));
    assets.materials.replace(rock, edited);
    ctx.material_changed(rock);

    ctx.get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    assert_eq!(compiler.calls(), 2);
    assert_eq!(ctx.persistent().len(), 2);
}

#[test]
fn changed_defines_miss_the_loaded_entry() {
    let bytes = saved_cache();

    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let config = RendererConfig::default().with_fp_filtering(true);
    let mut ctx = context_with(config, &assets, &compiler);
    let rock = stable_material(&assets);
    ctx.load_persistent_cache(&mut bytes.as_slice()).unwrap();

    ctx.get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    assert_eq!(compiler.calls(), 2);
    // The stale entry is replaced, not duplicated
    assert_eq!(ctx.persistent().len(), 2);
}

// ============================================================================
// Corruption & Flush
// ============================================================================

#[test]
fn truncated_cache_is_rejected_without_merging() {
    let bytes = saved_cache();

    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let result = ctx.load_persistent_cache(&mut &bytes[..bytes.len() - 3]);

    assert!(matches!(result, Err(ShaderError::PersistentCacheCorrupt(_))));
    assert!(ctx.persistent().is_empty());
}

#[test]
fn foreign_stream_is_rejected() {
    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);

    let result = ctx.load_persistent_cache(&mut b"DXBC\x01\x00\x00\x00".as_slice());
    assert!(matches!(result, Err(ShaderError::PersistentCacheCorrupt(_))));
}

#[test]
fn flush_forces_recompilation() {
    let bytes = saved_cache();

    let assets = Assets::new();
    let compiler = MockCompiler::new();
    let mut ctx = context(&assets, &compiler);
    let rock = stable_material(&assets);
    ctx.load_persistent_cache(&mut bytes.as_slice()).unwrap();
    ctx.flush_persistent_cache();
    assert!(ctx.persistent().is_empty());

    ctx.get_cached_shader(BaseFunction::Emissive, rock, VertexLayout::Local)
        .unwrap();
    assert_eq!(compiler.calls(), 2);
    assert_eq!(ctx.persistent().len(), 1);
}
