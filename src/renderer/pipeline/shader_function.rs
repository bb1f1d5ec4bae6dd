//! Shader functions and vertex layouts.
//!
//! A [`ShaderFunction`] names *what* a program renders (a light type, depth,
//! hit proxies, ...). Together with the material and the [`VertexLayout`] it
//! forms the identity of a compiled shader.

use std::fmt;

use bitflags::bitflags;

use crate::resources::{BlendMode, Material};

// ─── Base Functions ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BaseFunction {
    PointLight = 0,
    DirectionalLight = 1,
    SpotLight = 2,
    DepthOnly = 3,
    Emissive = 4,
    UnlitTranslucency = 5,
    Unlit = 6,
    VertexLighting = 7,
    ShadowDepth = 8,
    Wireframe = 9,
    WireframeHitProxy = 10,
    HitProxy = 11,
    ShadowDepthTest = 12,
    LightFunction = 13,
    TranslucentLayer = 14,
}

impl BaseFunction {
    pub const ALL: [BaseFunction; 15] = [
        Self::PointLight,
        Self::DirectionalLight,
        Self::SpotLight,
        Self::DepthOnly,
        Self::Emissive,
        Self::UnlitTranslucency,
        Self::Unlit,
        Self::VertexLighting,
        Self::ShadowDepth,
        Self::Wireframe,
        Self::WireframeHitProxy,
        Self::HitProxy,
        Self::ShadowDepthTest,
        Self::LightFunction,
        Self::TranslucentLayer,
    ];

    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::PointLight => "PointLight",
            Self::DirectionalLight => "DirectionalLight",
            Self::SpotLight => "SpotLight",
            Self::DepthOnly => "DepthOnly",
            Self::Emissive => "Emissive",
            Self::UnlitTranslucency => "UnlitTranslucency",
            Self::Unlit => "Unlit",
            Self::VertexLighting => "VertexLighting",
            Self::ShadowDepth => "ShadowDepth",
            Self::Wireframe => "Wireframe",
            Self::WireframeHitProxy => "WireframeHitProxy",
            Self::HitProxy => "HitProxy",
            Self::ShadowDepthTest => "ShadowDepthTest",
            Self::LightFunction => "LightFunction",
            Self::TranslucentLayer => "TranslucentLayer",
        }
    }

    /// Template file holding the function's entry points.
    #[must_use]
    pub fn source_file(self) -> &'static str {
        match self {
            Self::PointLight | Self::DirectionalLight | Self::SpotLight => "light.hlsl",
            Self::DepthOnly | Self::ShadowDepth | Self::ShadowDepthTest => "depth.hlsl",
            Self::Emissive => "emissive.hlsl",
            Self::Unlit | Self::UnlitTranslucency | Self::TranslucentLayer | Self::Wireframe => {
                "unlit.hlsl"
            }
            Self::VertexLighting => "vertex_lighting.hlsl",
            Self::HitProxy | Self::WireframeHitProxy => "hit_proxy.hlsl",
            Self::LightFunction => "light_function.hlsl",
        }
    }

    /// Whether the function draws meshes with this material.
    ///
    /// Light functions project the material onto light volumes and ignore
    /// the mesh-blending flags.
    #[must_use]
    pub fn is_mesh_function(self) -> bool {
        self != Self::LightFunction
    }

    /// Whether a program for this function makes sense for `material`.
    #[must_use]
    pub fn supports(self, material: &Material) -> bool {
        let translucent = matches!(
            material.blend_mode,
            BlendMode::Translucent | BlendMode::Additive
        );
        match self {
            Self::PointLight | Self::DirectionalLight | Self::SpotLight | Self::VertexLighting => {
                !material.unlit
            }
            Self::Unlit => material.unlit,
            Self::UnlitTranslucency | Self::TranslucentLayer => translucent,
            Self::DepthOnly | Self::ShadowDepth | Self::ShadowDepthTest => !translucent,
            Self::Emissive
            | Self::Wireframe
            | Self::WireframeHitProxy
            | Self::HitProxy
            | Self::LightFunction => true,
        }
    }
}

bitflags! {
    /// Modifier bits stored above the base function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct FunctionFlags: u8 {
        const USE_FP_BLENDING = 0x40;
        const OPAQUE_LAYER    = 0x80;
    }
}

// ─── Shader Function ─────────────────────────────────────────────────────────

/// A base function plus modifier flags, packed as `base | flags` in one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderFunction {
    base: BaseFunction,
    flags: FunctionFlags,
}

impl ShaderFunction {
    pub const BASE_MASK: u8 = 0x3f;

    #[must_use]
    pub const fn new(base: BaseFunction) -> Self {
        Self {
            base,
            flags: FunctionFlags::empty(),
        }
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: FunctionFlags) -> Self {
        self.flags = self.flags.union(flags);
        self
    }

    #[inline]
    #[must_use]
    pub fn base(self) -> BaseFunction {
        self.base
    }

    #[inline]
    #[must_use]
    pub fn flags(self) -> FunctionFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub fn bits(self) -> u8 {
        self.base as u8 | self.flags.bits()
    }

    /// Unpacks a byte written by [`bits`](Self::bits).
    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        let base = BaseFunction::from_bits(bits & Self::BASE_MASK)?;
        let flags = FunctionFlags::from_bits(bits & !Self::BASE_MASK)?;
        Some(Self { base, flags })
    }

    /// Human-readable name, e.g. `Emissive|OpaqueLayer`.
    #[must_use]
    pub fn description(self) -> String {
        let mut out = self.base.name().to_string();
        if self.flags.contains(FunctionFlags::USE_FP_BLENDING) {
            out.push_str("|FPBlending");
        }
        if self.flags.contains(FunctionFlags::OPAQUE_LAYER) {
            out.push_str("|OpaqueLayer");
        }
        out
    }
}

impl From<BaseFunction> for ShaderFunction {
    fn from(base: BaseFunction) -> Self {
        Self::new(base)
    }
}

impl fmt::Display for ShaderFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

// ─── Vertex Layouts ──────────────────────────────────────────────────────────

/// Vertex factory a program is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum VertexLayout {
    Local = 0,
    Terrain = 1,
    Foliage = 2,
    Particle = 3,
    ParticleSubUV = 4,
    Null = 5,
}

impl VertexLayout {
    pub const ALL: [VertexLayout; 6] = [
        Self::Local,
        Self::Terrain,
        Self::Foliage,
        Self::Particle,
        Self::ParticleSubUV,
        Self::Null,
    ];

    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::Terrain => "Terrain",
            Self::Foliage => "Foliage",
            Self::Particle => "Particle",
            Self::ParticleSubUV => "ParticleSubUV",
            Self::Null => "Null",
        }
    }
}

impl fmt::Display for VertexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
