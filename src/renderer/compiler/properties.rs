//! Output slot types and defaults.

use glam::Vec4;

use crate::resources::MaterialProperty;
use crate::resources::color::{BLACK, default_grey};

use super::types::CodeType;

/// The type every slot is force-cast to before substitution.
#[must_use]
pub fn slot_type(property: MaterialProperty) -> CodeType {
    match property {
        MaterialProperty::Normal
        | MaterialProperty::EmissiveColor
        | MaterialProperty::DiffuseColor
        | MaterialProperty::SpecularColor
        | MaterialProperty::TwoSidedLightingMask => CodeType::Float3,
        MaterialProperty::SpecularPower
        | MaterialProperty::Opacity
        | MaterialProperty::OpacityMask => CodeType::Float1,
        MaterialProperty::Distortion => CodeType::Float2,
        MaterialProperty::Shm => CodeType::Float4,
    }
}

/// Number of components a literal binding of the slot is compiled with.
#[must_use]
pub fn slot_components(property: MaterialProperty) -> u8 {
    match slot_type(property) {
        CodeType::Float2 => 2,
        CodeType::Float3 => 3,
        CodeType::Float4 => 4,
        _ => 1,
    }
}

/// Value of an unbound slot. The two-sided mask and SHM slots are composed
/// by the compiler instead and report zero here.
#[must_use]
pub fn slot_default(property: MaterialProperty) -> Vec4 {
    match property {
        MaterialProperty::Normal => Vec4::new(0.0, 0.0, 1.0, 0.0),
        MaterialProperty::EmissiveColor => BLACK,
        MaterialProperty::DiffuseColor | MaterialProperty::SpecularColor => default_grey(),
        MaterialProperty::SpecularPower => Vec4::new(15.0, 0.0, 0.0, 0.0),
        MaterialProperty::Opacity | MaterialProperty::OpacityMask => Vec4::new(1.0, 0.0, 0.0, 0.0),
        MaterialProperty::Distortion
        | MaterialProperty::TwoSidedLightingMask
        | MaterialProperty::Shm => Vec4::ZERO,
    }
}
