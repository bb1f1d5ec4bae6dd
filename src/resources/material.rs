//! Materials and material instances.
//!
//! A [`Material`] owns its [`ShadingGraph`] and binds graph outputs to the
//! fixed set of [`MaterialProperty`] slots. A [`MaterialInstance`] supplies the
//! per-object parameter values that uniform inputs read at bind time.

use glam::Vec4;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::assets::TextureHandle;
use crate::resources::expression::{ExpressionInput, ShadingGraph};

/// How a material's output is combined with the frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    Masked,
    Translucent,
    Additive,
}

/// Output slots every material shader fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialProperty {
    Normal,
    EmissiveColor,
    DiffuseColor,
    SpecularColor,
    SpecularPower,
    Opacity,
    OpacityMask,
    Distortion,
    TwoSidedLightingMask,
    Shm,
}

impl MaterialProperty {
    /// Slots in the order they are compiled and substituted into the template.
    pub const ALL: [MaterialProperty; 10] = [
        MaterialProperty::Normal,
        MaterialProperty::EmissiveColor,
        MaterialProperty::DiffuseColor,
        MaterialProperty::SpecularColor,
        MaterialProperty::SpecularPower,
        MaterialProperty::Opacity,
        MaterialProperty::OpacityMask,
        MaterialProperty::Distortion,
        MaterialProperty::TwoSidedLightingMask,
        MaterialProperty::Shm,
    ];

    /// Position in [`MaterialProperty::ALL`].
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::EmissiveColor => "EmissiveColor",
            Self::DiffuseColor => "DiffuseColor",
            Self::SpecularColor => "SpecularColor",
            Self::SpecularPower => "SpecularPower",
            Self::Opacity => "Opacity",
            Self::OpacityMask => "OpacityMask",
            Self::Distortion => "Distortion",
            Self::TwoSidedLightingMask => "TwoSidedLightingMask",
            Self::Shm => "SHM",
        }
    }
}

/// What a material slot is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MaterialInput {
    /// Falls back to the slot's default value.
    #[default]
    Unbound,
    /// An authored literal, compiled with as many components as the slot needs.
    Constant(Vec4),
    Expression(ExpressionInput),
}

impl From<ExpressionInput> for MaterialInput {
    fn from(input: ExpressionInput) -> Self {
        MaterialInput::Expression(input)
    }
}

/// Spherical-harmonic map coefficients sampled into the SHM slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShmSource {
    pub coefficients: TextureHandle,
    pub scale: Vec4,
    pub bias: Vec4,
    /// Optimized SH basis cubemap, bound to both `SHBasisTexture` and
    /// `SHSkyBasisTexture`.
    pub basis: TextureHandle,
}

/// Slot bindings of a material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialInputs {
    pub normal: MaterialInput,
    pub emissive_color: MaterialInput,
    pub diffuse_color: MaterialInput,
    pub specular_color: MaterialInput,
    pub specular_power: MaterialInput,
    pub opacity: MaterialInput,
    pub opacity_mask: MaterialInput,
    pub distortion: MaterialInput,
    pub two_sided_lighting_mask: MaterialInput,
    /// Multiplied with the two-sided mask; not a slot of its own.
    pub two_sided_lighting_color: MaterialInput,
}

/// A compilable material asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub graph: ShadingGraph,
    pub inputs: MaterialInputs,
    pub shm: Option<ShmSource>,
    pub blend_mode: BlendMode,
    pub two_sided: bool,
    pub unlit: bool,
    pub non_directional_lighting: bool,
    pub opacity_mask_clip_value: f32,
    /// Author-assigned identity used by the persistent program cache.
    pub stable_id: Option<Uuid>,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: ShadingGraph::new(),
            inputs: MaterialInputs::default(),
            shm: None,
            blend_mode: BlendMode::Opaque,
            two_sided: false,
            unlit: false,
            non_directional_lighting: false,
            opacity_mask_clip_value: 0.3333,
            stable_id: None,
        }
    }

    /// The engine's built-in material: every slot at its default, so it
    /// compiles for any shader function.
    #[must_use]
    pub fn default_material() -> Self {
        Self::new("DefaultMaterial")
    }

    /// The binding of a slot. `Shm` is driven by [`Material::shm`] instead and
    /// always reports [`MaterialInput::Unbound`].
    #[must_use]
    pub fn input(&self, property: MaterialProperty) -> MaterialInput {
        match property {
            MaterialProperty::Normal => self.inputs.normal,
            MaterialProperty::EmissiveColor => self.inputs.emissive_color,
            MaterialProperty::DiffuseColor => self.inputs.diffuse_color,
            MaterialProperty::SpecularColor => self.inputs.specular_color,
            MaterialProperty::SpecularPower => self.inputs.specular_power,
            MaterialProperty::Opacity => self.inputs.opacity,
            MaterialProperty::OpacityMask => self.inputs.opacity_mask,
            MaterialProperty::Distortion => self.inputs.distortion,
            MaterialProperty::TwoSidedLightingMask => self.inputs.two_sided_lighting_mask,
            MaterialProperty::Shm => MaterialInput::Unbound,
        }
    }

    pub fn set_input(&mut self, property: MaterialProperty, input: impl Into<MaterialInput>) {
        let input = input.into();
        let slot = match property {
            MaterialProperty::Normal => &mut self.inputs.normal,
            MaterialProperty::EmissiveColor => &mut self.inputs.emissive_color,
            MaterialProperty::DiffuseColor => &mut self.inputs.diffuse_color,
            MaterialProperty::SpecularColor => &mut self.inputs.specular_color,
            MaterialProperty::SpecularPower => &mut self.inputs.specular_power,
            MaterialProperty::Opacity => &mut self.inputs.opacity,
            MaterialProperty::OpacityMask => &mut self.inputs.opacity_mask,
            MaterialProperty::Distortion => &mut self.inputs.distortion,
            MaterialProperty::TwoSidedLightingMask => &mut self.inputs.two_sided_lighting_mask,
            MaterialProperty::Shm => {
                log::warn!("Material '{}': the SHM slot is set through `shm`", self.name);
                return;
            }
        };
        *slot = input;
    }

    #[must_use]
    pub fn with_stable_id(mut self, id: Uuid) -> Self {
        self.stable_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }
}

/// Per-object parameter values read by uniform inputs.
#[derive(Debug, Clone, Default)]
pub struct MaterialInstance {
    pub vector_values: FxHashMap<String, Vec4>,
    pub scalar_values: FxHashMap<String, f32>,
}

impl MaterialInstance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_vector(&mut self, name: &str, value: Vec4) {
        self.vector_values.insert(name.to_string(), value);
    }

    pub fn set_scalar(&mut self, name: &str, value: f32) {
        self.scalar_values.insert(name.to_string(), value);
    }

    #[must_use]
    pub fn vector(&self, name: &str) -> Option<Vec4> {
        self.vector_values.get(name).copied()
    }

    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<f32> {
        self.scalar_values.get(name).copied()
    }
}
