#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Material shader compilation.
//!
//! Compiles material expression graphs into shader programs and caches the
//! results at three levels: refcounted runtime objects, deduplicated
//! bytecode and a persistent cross-session program cache.
//!
//! ```rust,ignore
//! use shadegraph::renderer::core::ResourceFactories;
//! use shadegraph::{Assets, BaseFunction, Material, RendererConfig, ShaderCompilationContext, VertexLayout};
//!
//! let assets = Assets::new();
//! let material = assets.materials.add(Material::new("Rock"));
//! let mut ctx = ShaderCompilationContext::new(
//!     RendererConfig::default(),
//!     assets,
//!     Arc::new(MyCompiler),
//!     ResourceFactories::headless(),
//! )?;
//! let shader = ctx.get_cached_shader(BaseFunction::Emissive, material, VertexLayout::Local)?;
//! shader.bind(&mut device, Some(&instance), object_time, scene_time);
//! ```

pub mod assets;
pub mod errors;
pub mod renderer;
pub mod resources;
pub mod utils;

pub use assets::{AssetStorage, Assets, MaterialHandle, TextureHandle};
pub use errors::{Result, ShaderError};
pub use renderer::pipeline::{BaseFunction, FunctionFlags, ShaderFunction, VertexLayout};
pub use renderer::{
    CompileMode, CompileStatus, CompileTicket, PlatformCompiler, RendererConfig,
    ShaderCompilationContext, ShaderKey, ShaderObject,
};
pub use resources::{Material, MaterialInstance, ShaderDefines, ShadingGraph, Texture};
pub use utils::interner;

