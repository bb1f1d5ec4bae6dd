//! Asset Stores
//!
//! Materials and textures are owned here and addressed by slotmap handles.
//! Handles double as the process-local identity the shader caches key on.

pub mod storage;

use std::sync::Arc;

use slotmap::{Key, new_key_type};

use crate::resources::{Material, Texture};

pub use storage::AssetStorage;

new_key_type! {
    pub struct MaterialHandle;
    pub struct TextureHandle;
}

impl MaterialHandle {
    /// Process-local resource index, as printed in cache dumps.
    #[inline]
    #[must_use]
    pub fn resource_index(self) -> u64 {
        self.data().as_ffi()
    }
}

/// All assets the shader system reads.
#[derive(Clone, Default)]
pub struct Assets {
    pub materials: Arc<AssetStorage<MaterialHandle, Material>>,
    pub textures: Arc<AssetStorage<TextureHandle, Texture>>,
}

impl Assets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
