//! Lowering of graph nodes and material slots onto compiler operations.

use std::f32::consts::TAU;

use glam::Vec4;

use crate::resources::color::WHITE;
use crate::resources::{
    BinaryOp, ExpressionId, ExpressionInput, ExpressionKind, MaterialInput, MaterialProperty,
    UnaryOp,
};

use super::code_chunk::ChunkId;
use super::expression_compiler::{CompileResult, MaterialCompiler};
use super::properties::{slot_components, slot_default};
use super::types::CodeType;

impl MaterialCompiler<'_> {
    /// Compiles the value bound to a slot, or the slot's default.
    pub fn compile_property(&mut self, property: MaterialProperty) -> CompileResult {
        let material = self.material();
        match property {
            MaterialProperty::TwoSidedLightingMask => {
                let inputs = &material.inputs;
                let mask = self.compile_binding(inputs.two_sided_lighting_mask, Vec4::ZERO, 1)?;
                let mask = self.force_cast(mask, CodeType::Float)?;
                let color = self.compile_binding(inputs.two_sided_lighting_color, WHITE, 3)?;
                self.mul(mask, color)
            }
            MaterialProperty::Shm => match material.shm {
                Some(shm) => {
                    let coefficients = self.texture(shm.coefficients)?;
                    let uv = self.texture_coordinate(0);
                    let sample = self.texture_sample(coefficients, uv)?;
                    let scale = self.literal(shm.scale, 4);
                    let scaled = self.mul(sample, scale)?;
                    let bias = self.literal(shm.bias, 4);
                    self.add(scaled, bias)
                }
                None => Ok(self.constant(0.0)),
            },
            _ => self.compile_binding(
                material.input(property),
                slot_default(property),
                slot_components(property),
            ),
        }
    }

    fn compile_binding(
        &mut self,
        input: MaterialInput,
        default: Vec4,
        components: u8,
    ) -> CompileResult {
        match input {
            MaterialInput::Unbound => Ok(self.literal(default, components)),
            MaterialInput::Constant(value) => Ok(self.literal(value, components)),
            MaterialInput::Expression(input) => self.compile_input(input),
        }
    }

    fn literal(&mut self, v: Vec4, components: u8) -> ChunkId {
        match components {
            1 => self.constant(v.x),
            2 => self.constant2(v.x, v.y),
            3 => self.constant3(v.x, v.y, v.z),
            _ => self.constant4(v.x, v.y, v.z, v.w),
        }
    }

    /// Compiles the node an edge points at, then applies the edge's mask.
    pub fn compile_input(&mut self, input: ExpressionInput) -> CompileResult {
        if input.node.index() >= self.material().graph.len() {
            return self.error(format!("Missing expression {}", input.node.index()));
        }
        let chunk = self.guarded(input.node, |c| c.compile_expression(input.node))?;
        match input.mask {
            Some(mask) => self.component_mask(chunk, mask),
            None => Ok(chunk),
        }
    }

    fn required(
        &mut self,
        input: Option<ExpressionInput>,
        caption: &str,
        which: &str,
    ) -> CompileResult {
        match input {
            Some(input) => self.compile_input(input),
            None => self.error(format!("Missing {caption} input{which}")),
        }
    }

    fn compile_expression(&mut self, id: ExpressionId) -> CompileResult {
        let kind = &self.material().graph.node(id).kind;
        let caption = kind.caption();

        match kind {
            ExpressionKind::Constant { value, components } => match *components {
                1..=4 => Ok(self.literal(*value, *components)),
                n => self.error(format!("Constant has {n} components")),
            },
            ExpressionKind::ScalarParameter { name } => Ok(self.scalar_parameter(name)),
            ExpressionKind::VectorParameter { name } => Ok(self.vector_parameter(name)),
            ExpressionKind::Time { absolute: true } => Ok(self.scene_time()),
            ExpressionKind::Time { absolute: false } => Ok(self.object_time()),
            ExpressionKind::TextureSample {
                texture,
                coordinates,
            } => {
                let Some(handle) = *texture else {
                    return self.error("Missing TextureSample input texture");
                };
                let texture = self.texture(handle)?;
                let uv = match *coordinates {
                    Some(coordinates) => self.compile_input(coordinates)?,
                    None => self.texture_coordinate(0),
                };
                self.texture_sample(texture, uv)
            }
            ExpressionKind::TextureCoordinate { index, tiling } => {
                let uv = self.texture_coordinate(*index);
                let tiling = self.constant(*tiling);
                self.mul(uv, tiling)
            }
            ExpressionKind::VertexColor => Ok(self.vertex_color()),
            ExpressionKind::CameraVector => Ok(self.camera_vector()),
            ExpressionKind::ReflectionVector => Ok(self.reflection_vector()),
            ExpressionKind::Unary { op, input } => {
                let x = self.required(*input, caption, "")?;
                match *op {
                    UnaryOp::SquareRoot => self.square_root(x),
                    UnaryOp::Floor => self.floor(x),
                    UnaryOp::Ceil => self.ceil(x),
                    UnaryOp::Frac => self.frac(x),
                    UnaryOp::PeriodicHint => self.periodic_hint(x),
                    UnaryOp::Sine { period } => {
                        let x = self.scale_by_period(x, period)?;
                        self.sine(x)
                    }
                    UnaryOp::Cosine { period } => {
                        let x = self.scale_by_period(x, period)?;
                        self.cosine(x)
                    }
                }
            }
            ExpressionKind::Binary { op, a, b } => {
                let a = self.required(*a, caption, " A")?;
                let b = self.required(*b, caption, " B")?;
                match op {
                    BinaryOp::Add => self.add(a, b),
                    BinaryOp::Sub => self.sub(a, b),
                    BinaryOp::Mul => self.mul(a, b),
                    BinaryOp::Div => self.div(a, b),
                    BinaryOp::Dot => self.dot(a, b),
                    BinaryOp::Cross => self.cross(a, b),
                }
            }
            ExpressionKind::Min { a, b } => {
                let a = self.required(*a, caption, " A")?;
                let b = self.required(*b, caption, " B")?;
                self.min(a, b)
            }
            ExpressionKind::Max { a, b } => {
                let a = self.required(*a, caption, " A")?;
                let b = self.required(*b, caption, " B")?;
                self.max(a, b)
            }
            ExpressionKind::Clamp { input, min, max } => {
                let x = self.required(*input, caption, "")?;
                match (*min, *max) {
                    (None, None) => Ok(x),
                    (None, Some(max)) => {
                        let max = self.compile_input(max)?;
                        self.min(x, max)
                    }
                    (Some(min), None) => {
                        let min = self.compile_input(min)?;
                        self.max(x, min)
                    }
                    (Some(min), Some(max)) => {
                        let min = self.compile_input(min)?;
                        let max = self.compile_input(max)?;
                        self.clamp(x, min, max)
                    }
                }
            }
            ExpressionKind::Lerp { a, b, alpha } => {
                let a = self.required(*a, caption, " A")?;
                let b = self.required(*b, caption, " B")?;
                let alpha = self.required(*alpha, caption, " Alpha")?;
                self.lerp(a, b, alpha)
            }
            ExpressionKind::AppendVector { a, b } => {
                let a = self.required(*a, caption, " A")?;
                let b = self.required(*b, caption, " B")?;
                self.append_vector(a, b)
            }
            ExpressionKind::ComponentMask { input, mask } => {
                let x = self.required(*input, caption, "")?;
                self.component_mask(x, *mask)
            }
        }
    }

    fn scale_by_period(&mut self, x: ChunkId, period: f32) -> CompileResult {
        if period > 0.0 {
            let scale = self.constant(TAU / period);
            self.mul(x, scale)
        } else {
            Ok(x)
        }
    }
}
