//! Runtime resource plumbing shared by the shader caches.

pub mod binding;
pub mod resource_cache;
pub mod resource_kind;

pub use binding::{
    BindingKind, MaterialParameters, ParameterBinding, RenderDevice, UnresolvedBinding,
};
pub use resource_cache::{Cached, ResourceCache, add_ref, ref_count, release};
pub use resource_kind::{GpuTexture, ResourceFactories, ResourceKind, TextureFactory};
