//! Shader Pipeline
//!
//! Everything between a compiled material and a bindable program:
//!
//! - [`shader_function`]: shader functions and vertex layouts
//! - [`shader_gen`] / [`templates`]: source generation from the embedded templates
//! - [`fallback`]: candidate ordering and error aggregation
//! - [`platform`]: the native compiler boundary
//! - [`bytecode`] / [`persistent`]: bytecode dedup and the cross-session cache
//! - [`shader_object`]: cached programs and parameter binding
//! - [`worker`] / [`context`]: request handling and the owning context

pub mod bytecode;
pub mod context;
pub mod fallback;
pub mod persistent;
pub mod platform;
pub mod shader_function;
pub mod shader_gen;
pub mod shader_object;
pub mod templates;
pub mod worker;

pub use bytecode::{BytecodeDedupCache, BytecodeHandle};
pub use context::{
    CompileReport, CompileStatus, CompileTicket, ReportEntry, ShaderCompilationContext,
};
pub use fallback::{FallbackCompileDriver, FallbackSuccess, material_defines, merge_errors};
pub use persistent::{CompiledProgram, PersistentProgramCache, PersistentShaderId};
pub use platform::{
    PIXEL_ENTRY_POINT, PlatformCompiler, ProgramOutput, StageOutput, StageProfiles,
    StageRequest, VERTEX_ENTRY_POINT, compile_program,
};
pub use shader_function::{BaseFunction, FunctionFlags, ShaderFunction, VertexLayout};
pub use shader_gen::{ShaderGenerator, UserShaderParams, source_hash};
pub use shader_object::{BoundTextures, LinkedProgram, ShaderKey, ShaderObject, ShaderState};
pub use worker::CompileWorker;
