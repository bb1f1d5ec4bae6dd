//! Shader Code Generator
//!
//! Substitutes a compiled material into the user shader template and renders
//! the function file that includes it.

use serde::Serialize;
use xxhash_rust::xxh3::Xxh3;

use super::shader_function::{ShaderFunction, VertexLayout};
use super::templates::get_env;
use crate::errors::Result;
use crate::renderer::compiler::CompiledMaterial;
use crate::resources::{Material, MaterialProperty, ShaderDefines};

pub const USER_SHADER_TEMPLATE: &str = "user_shader_template.hlsl";

/// Bumped whenever the placeholder set or its order changes.
pub const USER_SHADER_TEMPLATE_VERSION: u32 = 1;

/// Placeholders of the user shader template, in substitution order.
pub const USER_SHADER_PLACEHOLDERS: [&str; 15] = [
    "num_user_textures",
    "num_user_tex_coords",
    "num_user_vector_inputs",
    "num_user_scalar_inputs",
    "normal",
    "emissive_color",
    "diffuse_color",
    "specular_color",
    "specular_power",
    "opacity",
    "opacity_mask",
    "opacity_mask_clip_value",
    "distortion",
    "two_sided_lighting_mask",
    "shm",
];

/// Values substituted into the user shader template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserShaderParams {
    pub num_user_textures: usize,
    pub num_user_tex_coords: u32,
    pub num_user_vector_inputs: usize,
    /// Register count: scalars are packed four per register.
    pub num_user_scalar_inputs: usize,
    pub normal: String,
    pub emissive_color: String,
    pub diffuse_color: String,
    pub specular_color: String,
    pub specular_power: String,
    pub opacity: String,
    pub opacity_mask: String,
    pub opacity_mask_clip_value: String,
    pub distortion: String,
    pub two_sided_lighting_mask: String,
    pub shm: String,
}

impl UserShaderParams {
    #[must_use]
    pub fn new(material: &Material, compiled: &CompiledMaterial) -> Self {
        let slot = |property| compiled.slot(property).to_string();
        Self {
            num_user_textures: compiled.textures.len(),
            num_user_tex_coords: compiled.num_tex_coords,
            num_user_vector_inputs: compiled.vector_inputs.len(),
            num_user_scalar_inputs: compiled.num_scalar_registers(),
            normal: slot(MaterialProperty::Normal),
            emissive_color: slot(MaterialProperty::EmissiveColor),
            diffuse_color: slot(MaterialProperty::DiffuseColor),
            specular_color: slot(MaterialProperty::SpecularColor),
            specular_power: slot(MaterialProperty::SpecularPower),
            opacity: slot(MaterialProperty::Opacity),
            opacity_mask: slot(MaterialProperty::OpacityMask),
            opacity_mask_clip_value: format!("{:.5}", material.opacity_mask_clip_value),
            distortion: slot(MaterialProperty::Distortion),
            two_sided_lighting_mask: slot(MaterialProperty::TwoSidedLightingMask),
            shm: slot(MaterialProperty::Shm),
        }
    }
}

#[derive(Serialize)]
struct ShaderContext<'a> {
    #[serde(flatten)]
    params: &'a UserShaderParams,
    function: &'static str,
    vertex_layout: &'static str,
}

pub struct ShaderGenerator;

impl ShaderGenerator {
    /// Renders only the generated material block.
    pub fn generate_user_block(params: &UserShaderParams) -> Result<String> {
        let template = get_env()?.get_template(USER_SHADER_TEMPLATE)?;
        Ok(template.render(params)?)
    }

    /// Renders the complete source of `function` for `layout`.
    pub fn generate_shader(
        function: ShaderFunction,
        layout: VertexLayout,
        params: &UserShaderParams,
    ) -> Result<String> {
        let base = function.base();
        let ctx = ShaderContext {
            params,
            function: base.name(),
            vertex_layout: layout.name(),
        };
        let template = get_env()?.get_template(base.source_file())?;
        let source = normalize_newlines(&template.render(&ctx)?);

        Ok(format!(
            "// === Generated {} shader for {layout} vertices ===\n{source}",
            function.description()
        ))
    }
}

/// Content hash of a generated program: template version, source and defines.
#[must_use]
pub fn source_hash(source: &str, defines: &ShaderDefines) -> u128 {
    let mut hasher = Xxh3::new();
    hasher.update(&USER_SHADER_TEMPLATE_VERSION.to_le_bytes());
    hasher.update(source.as_bytes());
    for (key, value) in defines.to_map() {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hasher.digest128()
}

/// Collapses runs of blank lines left behind by template blocks.
pub(crate) fn normalize_newlines(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_newline = false;
    for c in s.chars() {
        if c == '\n' {
            if !last_was_newline {
                result.push('\n');
                last_was_newline = true;
            }
        } else {
            result.push(c);
            last_was_newline = false;
        }
    }
    result
}
