use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use shadegraph::renderer::compiler::compile_material;
use shadegraph::renderer::core::ResourceFactories;
use shadegraph::renderer::pipeline::{ShaderGenerator, StageOutput, StageRequest, UserShaderParams};
use shadegraph::resources::{
    BinaryOp, ChannelMask, ExpressionInput, MaterialProperty, PixelFormat, TextureKind,
};
use shadegraph::{
    Assets, BaseFunction, Material, MaterialHandle, PlatformCompiler, RendererConfig,
    ShaderCompilationContext, Texture, VertexLayout,
};

/// Returns the source as bytecode; the benches measure everything around it.
struct PassthroughCompiler;

impl PlatformCompiler for PassthroughCompiler {
    fn compile_stage(&self, request: &StageRequest<'_>) -> Result<StageOutput, String> {
        Ok(StageOutput {
            code: request.source.as_bytes().to_vec(),
            instruction_count: 1,
            parameters: Vec::new(),
        })
    }
}

fn layered_material(assets: &Assets) -> MaterialHandle {
    let texture = assets
        .textures
        .add(Texture::new("Detail", TextureKind::Texture2D, PixelFormat::Dxt5));

    let mut material = Material::new("Layered");
    let graph = &mut material.graph;
    let sample = graph.texture_sample(texture, None);
    let tint = graph.vector_parameter("Tint");
    let tinted = graph.binary(
        BinaryOp::Mul,
        ExpressionInput::masked(sample, ChannelMask::RGB),
        ExpressionInput::masked(tint, ChannelMask::RGB),
    );
    let time = graph.time(false);
    let speed = graph.scalar_parameter("Speed");
    let phase = graph.binary(BinaryOp::Mul, time, speed);
    let pulse = graph.binary(BinaryOp::Mul, tinted, phase);
    let zero = graph.constant(0.0);
    let one = graph.constant(1.0);
    let emissive = graph.clamp(pulse, Some(zero.into()), Some(one.into()));
    material.set_input(MaterialProperty::EmissiveColor, ExpressionInput::from(emissive));
    material.set_input(MaterialProperty::DiffuseColor, ExpressionInput::masked(sample, ChannelMask::RGB));

    assets.materials.add(material)
}

fn benchmark_compile(c: &mut Criterion) {
    let assets = Assets::new();
    let handle = layered_material(&assets);
    let material = assets.materials.get(handle).expect("material was just added");

    c.bench_function("compile_material", |b| {
        b.iter(|| black_box(compile_material(black_box(&material), &assets.textures)))
    });

    let compiled = compile_material(&material, &assets.textures).expect("material compiles");
    let params = UserShaderParams::new(&material, &compiled);
    c.bench_function("generate_shader", |b| {
        b.iter(|| {
            black_box(ShaderGenerator::generate_shader(
                BaseFunction::PointLight.into(),
                VertexLayout::Local,
                black_box(&params),
            ))
        })
    });
}

fn benchmark_cache(c: &mut Criterion) {
    let assets = Assets::new();
    let handle = layered_material(&assets);
    let mut ctx = ShaderCompilationContext::new(
        RendererConfig::default(),
        assets,
        Arc::new(PassthroughCompiler),
        ResourceFactories::headless(),
    )
    .expect("context setup");

    c.bench_function("get_cached_shader_miss", |b| {
        b.iter(|| {
            ctx.material_changed(handle);
            black_box(ctx.get_cached_shader(BaseFunction::Emissive, handle, VertexLayout::Local))
        })
    });

    ctx.get_cached_shader(BaseFunction::Emissive, handle, VertexLayout::Local)
        .expect("shader compiles");
    c.bench_function("get_cached_shader_hit", |b| {
        b.iter(|| {
            black_box(ctx.get_cached_shader(BaseFunction::Emissive, handle, VertexLayout::Local))
        })
    });
}

criterion_group!(benches, benchmark_compile, benchmark_cache);
criterion_main!(benches);
