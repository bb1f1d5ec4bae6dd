//! Texture asset descriptions.
//!
//! The compiler only needs to know what a texture *is* (its dimensionality and
//! how its texels are encoded); GPU objects are built by the runtime resource
//! cache from the same description.

use serde::{Deserialize, Serialize};

/// Dimensionality of a texture, which decides the sampler type in generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureKind {
    Texture2D,
    TextureCube,
    Texture3D,
}

/// Storage format of a texture's texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    A8R8G8B8,
    Dxt1,
    Dxt3,
    Dxt5,
    G8,
    G16,
    FloatRgba,
}

impl PixelFormat {
    /// Formats the sampler hardware cannot read as sRGB; sampling code must
    /// apply the gamma curve itself.
    #[inline]
    #[must_use]
    pub fn requires_gamma_correction(self) -> bool {
        matches!(self, PixelFormat::G8 | PixelFormat::G16)
    }
}

/// A texture asset as seen by the material compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    pub kind: TextureKind,
    pub format: PixelFormat,
    /// Texels are authored in sRGB.
    pub srgb: bool,
    /// Texels hold a shared-exponent (RGBE) encoding.
    pub rgbe: bool,
}

impl Texture {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TextureKind, format: PixelFormat) -> Self {
        Self {
            name: name.into(),
            kind,
            format,
            srgb: false,
            rgbe: false,
        }
    }

    #[must_use]
    pub fn with_srgb(mut self, srgb: bool) -> Self {
        self.srgb = srgb;
        self
    }

    #[must_use]
    pub fn with_rgbe(mut self, rgbe: bool) -> Self {
        self.rgbe = rgbe;
        self
    }
}
