//! Material Expression Compiler
//!
//! Turns a material's shading graph into per-slot shader code plus the list
//! of uniforms, textures and interpolators that code reads.
//!
//! - [`types`]: chunk value types and flags
//! - [`code_chunk`]: the append-only chunk table of a pass
//! - [`user_input`]: CPU-evaluable inputs behind uniforms
//! - [`expression_compiler`]: compiler operations and the guard stack
//! - [`properties`]: slot types and defaults

pub mod code_chunk;
pub mod expression_compiler;
mod graph;
pub mod properties;
pub mod types;
pub mod user_input;

pub use code_chunk::{ChunkId, ChunkSnapshot, CodeChunk, CodeChunkTable};
pub use expression_compiler::{
    CompileError, CompileResult, CompiledMaterial, MaterialCompiler, compile_material,
};
pub use properties::{slot_default, slot_type};
pub use types::{ChunkFlags, CodeType};
pub use user_input::{EvalContext, FoldedOp, RoundingOp, UserInput, UserInputId, UserInputs};
