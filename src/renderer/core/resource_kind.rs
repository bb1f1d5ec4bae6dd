//! Runtime resource kinds and their registered constructors.
//!
//! Device objects are built by closures registered once per [`ResourceKind`]
//! when the compilation context is set up. Texture cache misses dispatch on
//! the texture's dimensionality.

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

use crate::errors::{Result, ShaderError};
use crate::resources::{PixelFormat, Texture, TextureKind};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(0);

pub fn generate_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture2D,
    TextureCube,
    Texture3D,
    Buffer,
    VertexLayout,
    Shader,
}

impl ResourceKind {
    #[must_use]
    pub fn for_texture(kind: TextureKind) -> Self {
        match kind {
            TextureKind::Texture2D => Self::Texture2D,
            TextureKind::TextureCube => Self::TextureCube,
            TextureKind::Texture3D => Self::Texture3D,
        }
    }
}

/// A device-side texture as handed to samplers.
#[derive(Debug)]
pub struct GpuTexture {
    pub id: u64,
    pub label: String,
    pub kind: TextureKind,
    pub format: PixelFormat,
}

impl GpuTexture {
    #[must_use]
    pub fn new(texture: &Texture) -> Self {
        Self {
            id: generate_resource_id(),
            label: texture.name.clone(),
            kind: texture.kind,
            format: texture.format,
        }
    }
}

pub type TextureFactory = Box<dyn Fn(&Texture) -> Result<GpuTexture> + Send + Sync>;

/// Per-kind constructors for runtime resources.
#[derive(Default)]
pub struct ResourceFactories {
    textures: FxHashMap<ResourceKind, TextureFactory>,
}

impl ResourceFactories {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructors that wrap the texture description without touching a
    /// device, for every texture kind.
    #[must_use]
    pub fn headless() -> Self {
        let mut factories = Self::new();
        for kind in [
            ResourceKind::Texture2D,
            ResourceKind::TextureCube,
            ResourceKind::Texture3D,
        ] {
            factories.register_texture(kind, |texture| Ok(GpuTexture::new(texture)));
        }
        factories
    }

    pub fn register_texture(
        &mut self,
        kind: ResourceKind,
        factory: impl Fn(&Texture) -> Result<GpuTexture> + Send + Sync + 'static,
    ) {
        self.textures.insert(kind, Box::new(factory));
    }

    #[must_use]
    pub fn is_registered(&self, kind: ResourceKind) -> bool {
        self.textures.contains_key(&kind)
    }

    pub fn create_texture(&self, texture: &Texture) -> Result<GpuTexture> {
        let kind = ResourceKind::for_texture(texture.kind);
        let factory = self
            .textures
            .get(&kind)
            .ok_or(ShaderError::ResourceKindUnregistered(kind))?;
        factory(texture)
    }
}
