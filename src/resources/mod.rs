//! Authored Resources
//!
//! CPU-side descriptions the shader system compiles from:
//!
//! - [`ShadingGraph`]: expression node arena of a material
//! - [`Material`] / [`MaterialInstance`]: slot bindings and per-object values
//! - [`Texture`]: dimensionality and texel encoding
//! - [`ShaderDefines`]: interned macro sets passed to the platform compiler

pub mod color;
pub mod expression;
pub mod material;
pub mod shader_defines;
pub mod texture;

pub use expression::{
    BinaryOp, ChannelMask, ExpressionId, ExpressionInput, ExpressionKind, ExpressionNode,
    ShadingGraph, UnaryOp,
};
pub use material::{
    BlendMode, Material, MaterialInput, MaterialInputs, MaterialInstance, MaterialProperty,
    ShmSource,
};
pub use shader_defines::ShaderDefines;
pub use texture::{PixelFormat, Texture, TextureKind};
