//! Shader Parameter Bindings
//!
//! Defines how compiled programs expose their parameters and the device
//! interface the shader objects bind through.

use serde::Serialize;

use super::resource_kind::GpuTexture;

/// Register file a parameter lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum BindingKind {
    VertexConstant = 0,
    PixelConstant = 1,
    PixelSampler = 2,
}

impl BindingKind {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::VertexConstant),
            1 => Some(Self::PixelConstant),
            2 => Some(Self::PixelSampler),
            _ => None,
        }
    }
}

/// A parameter as reported by the platform compiler, still addressed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedBinding {
    pub name: String,
    pub kind: BindingKind,
    pub register_index: u32,
    pub register_count: u32,
}

/// A resolved register range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterBinding {
    pub register_index: u32,
    pub register_count: u32,
}

/// The parameter arrays of a material program, plus the SH basis samplers
/// of SHM materials.
///
/// A parameter the compiler optimized away stays `None` and is skipped at
/// bind time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialParameters {
    pub user_textures: Option<ParameterBinding>,
    pub user_vector_inputs: Option<ParameterBinding>,
    pub user_scalar_inputs: Option<ParameterBinding>,
    pub sh_basis_texture: Option<ParameterBinding>,
    pub sh_sky_basis_texture: Option<ParameterBinding>,
}

impl MaterialParameters {
    /// Maps bindings by case-insensitive name.
    #[must_use]
    pub fn resolve(bindings: &[UnresolvedBinding]) -> Self {
        let find = |name: &str, kind: BindingKind| {
            bindings
                .iter()
                .find(|b| b.kind == kind && b.name.eq_ignore_ascii_case(name))
                .map(|b| ParameterBinding {
                    register_index: b.register_index,
                    register_count: b.register_count,
                })
        };
        Self {
            user_textures: find("UserTextures", BindingKind::PixelSampler),
            user_vector_inputs: find("UserVectorInputs", BindingKind::PixelConstant),
            user_scalar_inputs: find("UserScalarInputs", BindingKind::PixelConstant),
            sh_basis_texture: find("SHBasisTexture", BindingKind::PixelSampler),
            sh_sky_basis_texture: find("SHSkyBasisTexture", BindingKind::PixelSampler),
        }
    }
}

/// The slice of a render device the shader objects drive.
pub trait RenderDevice {
    fn set_program(&mut self, vertex: &[u8], pixel: &[u8]);

    fn set_sampler(&mut self, slot: u32, texture: &GpuTexture);

    fn set_pixel_constant(&mut self, register: u32, value: [f32; 4]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str, kind: BindingKind, index: u32, count: u32) -> UnresolvedBinding {
        UnresolvedBinding {
            name: name.to_string(),
            kind,
            register_index: index,
            register_count: count,
        }
    }

    #[test]
    fn resolve_ignores_case_and_stage() {
        let bindings = vec![
            binding("uservectorinputs", BindingKind::PixelConstant, 4, 2),
            binding("UserScalarInputs", BindingKind::VertexConstant, 0, 1),
            binding("USERTEXTURES", BindingKind::PixelSampler, 0, 3),
        ];
        let params = MaterialParameters::resolve(&bindings);

        assert_eq!(
            params.user_vector_inputs,
            Some(ParameterBinding {
                register_index: 4,
                register_count: 2
            })
        );
        assert_eq!(params.user_scalar_inputs, None);
        assert_eq!(params.user_textures.map(|b| b.register_count), Some(3));
        assert_eq!(params.sh_basis_texture, None);
    }

    #[test]
    fn resolve_finds_sh_basis_samplers() {
        let bindings = vec![
            binding("UserTextures", BindingKind::PixelSampler, 0, 1),
            binding("SHBasisTexture", BindingKind::PixelSampler, 1, 1),
            binding("shskybasistexture", BindingKind::PixelSampler, 2, 1),
        ];
        let params = MaterialParameters::resolve(&bindings);

        assert_eq!(params.sh_basis_texture.map(|b| b.register_index), Some(1));
        assert_eq!(params.sh_sky_basis_texture.map(|b| b.register_index), Some(2));
    }
}
