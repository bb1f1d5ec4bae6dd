//! Shader Renderer Core
//!
//! - [`compiler`]: material graph to shader code
//! - [`pipeline`]: generation, compilation and the shader caches
//! - [`core`]: refcounted resource caches, resource kinds and bindings
//! - [`settings`]: device capabilities and compile options

pub mod compiler;
pub mod core;
pub mod pipeline;
pub mod settings;

pub use pipeline::{
    CompileStatus, CompileTicket, PlatformCompiler, ShaderCompilationContext, ShaderKey,
    ShaderObject,
};
pub use settings::{CompileMode, RendererConfig};
