//! Value types of generated shader code.

use std::fmt;

use bitflags::bitflags;

use crate::resources::TextureKind;

/// The type of a code chunk.
///
/// `Float` is the width-agnostic scalar that parameters and literals produce;
/// it is compatible with every vector width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeType {
    Float,
    Float1,
    Float2,
    Float3,
    Float4,
    Texture2D,
    TextureCube,
    Texture3D,
}

const NUMERIC_BITS: u8 = 0b1111;

impl CodeType {
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Float1 => 1,
            Self::Float2 => 2,
            Self::Float3 => 4,
            Self::Float4 => 8,
            Self::Float => NUMERIC_BITS,
            Self::Texture2D => 16,
            Self::TextureCube => 32,
            Self::Texture3D => 64,
        }
    }

    /// Two types are compatible when their bitmasks overlap.
    #[inline]
    #[must_use]
    pub const fn is_compatible(self, other: CodeType) -> bool {
        self.bits() & other.bits() != 0
    }

    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.bits() & NUMERIC_BITS != 0
    }

    /// Component count of a numeric type; `None` for textures.
    #[must_use]
    pub const fn num_components(self) -> Option<u32> {
        match self {
            Self::Float | Self::Float1 => Some(1),
            Self::Float2 => Some(2),
            Self::Float3 => Some(3),
            Self::Float4 => Some(4),
            Self::Texture2D | Self::TextureCube | Self::Texture3D => None,
        }
    }

    /// The vector type with `n` components. One component maps to `Float`.
    #[must_use]
    pub const fn vector(n: u32) -> Option<CodeType> {
        match n {
            1 => Some(Self::Float),
            2 => Some(Self::Float2),
            3 => Some(Self::Float3),
            4 => Some(Self::Float4),
            _ => None,
        }
    }

    #[must_use]
    pub const fn for_texture(kind: TextureKind) -> CodeType {
        match kind {
            TextureKind::Texture2D => Self::Texture2D,
            TextureKind::TextureCube => Self::TextureCube,
            TextureKind::Texture3D => Self::Texture3D,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Float1 => "float1",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Texture2D => "texture2D",
            Self::TextureCube => "textureCube",
            Self::Texture3D => "texture3D",
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Sampling fix-ups a texture chunk carries into `texture_sample`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChunkFlags: u8 {
        const RGBE_4BIT_EXPONENT        = 1 << 0;
        const RGBE_8BIT_EXPONENT        = 1 << 1;
        const REQUIRES_GAMMA_CORRECTION = 1 << 2;
    }
}
