//! Expression Compiler
//!
//! Lowers a material's [`ShadingGraph`] into a table of typed code chunks and
//! a set of CPU-evaluable [`UserInput`]s.
//!
//! # Dual Code Path
//!
//! Every operation that has a CPU form first checks whether *all* of its
//! operands carry a user input. If so, the result is a new composite input
//! instead of plain code: a subtree of literals folds into one embeddable
//! expression, and a subtree touching parameters or time becomes a single
//! uniform evaluated at bind time. Otherwise the operation emits an ordinary
//! chunk whose operands are read through [`MaterialCompiler::parameter_code`].
//!
//! # Errors
//!
//! Operations return [`CompileResult`]. While an expression node is being
//! compiled its id sits on a guard stack; an error raised inside is prefixed
//! with the innermost node's name and then propagates unchanged. Each output
//! slot compiles in its own scope, so one broken slot does not hide the
//! errors of the others.
//!
//! [`ShadingGraph`]: crate::resources::ShadingGraph

use glam::Vec4;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::assets::{AssetStorage, TextureHandle};
use crate::resources::{ChannelMask, ExpressionId, Material, MaterialProperty, PixelFormat, Texture};

use super::code_chunk::{ChunkId, CodeChunk, CodeChunkTable};
use super::properties::slot_type;
use super::types::{ChunkFlags, CodeType};
use super::user_input::{FoldedOp, RoundingOp, UserInput, UserInputId, UserInputs};

/// A failure inside one compile pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Graph or typing error, already prefixed with the failing node's name.
    #[error("{0}")]
    Graph(String),
}

pub type CompileResult<T = ChunkId> = Result<T, CompileError>;

/// Output of a successful pass.
#[derive(Debug, Clone)]
pub struct CompiledMaterial {
    pub chunks: CodeChunkTable,
    pub user_inputs: UserInputs,
    /// Inputs read from `UserScalarInputs`, in slot order.
    pub scalar_inputs: Vec<UserInputId>,
    /// Inputs read from `UserVectorInputs`, in slot order.
    pub vector_inputs: Vec<UserInputId>,
    pub textures: Vec<TextureHandle>,
    pub num_tex_coords: u32,
    /// Generated code of every slot, indexed by [`MaterialProperty::index`].
    pub slot_code: [String; 10],
}

impl CompiledMaterial {
    #[must_use]
    pub fn slot(&self, property: MaterialProperty) -> &str {
        &self.slot_code[property.index()]
    }

    /// Registers needed for the packed scalar inputs.
    #[must_use]
    pub fn num_scalar_registers(&self) -> usize {
        self.scalar_inputs.len().div_ceil(4)
    }
}

fn add_unique<T: PartialEq + Copy>(list: &mut Vec<T>, item: T) -> usize {
    if let Some(index) = list.iter().position(|&x| x == item) {
        return index;
    }
    list.push(item);
    list.len() - 1
}

/// Compiles every slot of `material`.
///
/// On failure returns the errors of all failed slots, deduplicated, in the
/// order they were raised.
pub fn compile_material(
    material: &Material,
    textures: &AssetStorage<TextureHandle, Texture>,
) -> Result<CompiledMaterial, Vec<String>> {
    let mut compiler = MaterialCompiler::new(material, textures);
    let mut slot_code: [String; 10] = Default::default();
    for property in MaterialProperty::ALL {
        if let Some(chunk) = compiler.compile_slot(property) {
            slot_code[property.index()] = compiler.fixed_parameter_code(chunk).to_string();
        }
    }
    compiler.finish(slot_code)
}

/// State of one compile pass over one material.
pub struct MaterialCompiler<'a> {
    material: &'a Material,
    textures: &'a AssetStorage<TextureHandle, Texture>,

    chunks: CodeChunkTable,
    inputs: UserInputs,
    constants: Vec<(UserInputId, CodeType)>,
    scalar_inputs: Vec<UserInputId>,
    vector_inputs: Vec<UserInputId>,
    texture_list: Vec<TextureHandle>,
    num_tex_coords: u32,

    guards: Vec<ExpressionId>,
    memo: FxHashMap<ExpressionId, ChunkId>,
    errors: Vec<String>,
}

impl<'a> MaterialCompiler<'a> {
    #[must_use]
    pub fn new(material: &'a Material, textures: &'a AssetStorage<TextureHandle, Texture>) -> Self {
        Self {
            material,
            textures,
            chunks: CodeChunkTable::new(),
            inputs: UserInputs::new(),
            constants: Vec::new(),
            scalar_inputs: Vec::new(),
            vector_inputs: Vec::new(),
            texture_list: Vec::new(),
            num_tex_coords: 0,
            guards: Vec::new(),
            memo: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    #[inline]
    pub(super) fn material(&self) -> &'a Material {
        self.material
    }

    #[inline]
    pub fn chunks(&self) -> &CodeChunkTable {
        &self.chunks
    }

    #[inline]
    pub fn user_inputs(&self) -> &UserInputs {
        &self.inputs
    }

    #[inline]
    pub fn scalar_inputs(&self) -> &[UserInputId] {
        &self.scalar_inputs
    }

    #[inline]
    pub fn vector_inputs(&self) -> &[UserInputId] {
        &self.vector_inputs
    }

    #[inline]
    pub fn textures(&self) -> &[TextureHandle] {
        &self.texture_list
    }

    #[inline]
    pub fn num_tex_coords(&self) -> u32 {
        self.num_tex_coords
    }

    /// Errors recorded by failed slots so far.
    #[inline]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    // ─── Slots ───────────────────────────────────────────────────────────────

    /// Compiles one output slot and casts it to the slot's type.
    ///
    /// A failure is recorded and yields `None`; the pass can continue.
    pub fn compile_slot(&mut self, property: MaterialProperty) -> Option<ChunkId> {
        let result = self
            .compile_property(property)
            .and_then(|chunk| self.force_cast(chunk, slot_type(property)));
        match result {
            Ok(chunk) => Some(chunk),
            Err(CompileError::Graph(message)) => {
                add_unique_string(&mut self.errors, message);
                None
            }
        }
    }

    fn finish(self, slot_code: [String; 10]) -> Result<CompiledMaterial, Vec<String>> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        Ok(CompiledMaterial {
            chunks: self.chunks,
            user_inputs: self.inputs,
            scalar_inputs: self.scalar_inputs,
            vector_inputs: self.vector_inputs,
            textures: self.texture_list,
            num_tex_coords: self.num_tex_coords,
            slot_code,
        })
    }

    // ─── Errors & Guards ─────────────────────────────────────────────────────

    /// Raises a compile error, prefixed with the innermost guarded node.
    pub fn error<T>(&self, text: impl Into<String>) -> CompileResult<T> {
        let text = text.into();
        let message = match self.guards.last() {
            Some(&node) => format!("{}: {}", self.material.graph.node(node).name, text),
            None => text,
        };
        Err(CompileError::Graph(message))
    }

    /// Runs `f` with `node` on the guard stack.
    pub(super) fn guarded(
        &mut self,
        node: ExpressionId,
        f: impl FnOnce(&mut Self) -> CompileResult,
    ) -> CompileResult {
        if self.guards.contains(&node) {
            return self.error("Cyclic material expression detected.");
        }
        if let Some(&chunk) = self.memo.get(&node) {
            return Ok(chunk);
        }
        self.guards.push(node);
        let result = f(self);
        self.guards.pop();
        if let Ok(chunk) = result {
            self.memo.insert(node, chunk);
        }
        result
    }

    // ─── Chunk Table ─────────────────────────────────────────────────────────

    pub fn add_code_chunk(&mut self, ty: CodeType, flags: ChunkFlags, text: String) -> ChunkId {
        self.chunks.push(CodeChunk {
            text,
            ty,
            input: None,
            flags,
        })
    }

    pub fn add_user_input(&mut self, input: UserInput, ty: CodeType, text: String) -> ChunkId {
        let id = self.inputs.push(input);
        self.push_input_chunk(id, ty, text)
    }

    /// Like [`add_user_input`](Self::add_user_input), but constants of equal
    /// value and type share one input.
    pub fn add_user_constant(&mut self, value: Vec4, ty: CodeType, text: String) -> ChunkId {
        let inputs = &self.inputs;
        let existing = self
            .constants
            .iter()
            .find(|&&(id, constant_ty)| {
                constant_ty == ty
                    && matches!(inputs.get(id), UserInput::Constant { value: v } if *v == value)
            })
            .map(|&(id, _)| id);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.inputs.push(UserInput::Constant { value });
                self.constants.push((id, ty));
                id
            }
        };
        self.push_input_chunk(id, ty, text)
    }

    fn push_input_chunk(&mut self, input: UserInputId, ty: CodeType, text: String) -> ChunkId {
        self.chunks.push(CodeChunk {
            text,
            ty,
            input: Some(input),
            flags: ChunkFlags::empty(),
        })
    }

    /// Emits a read of the chunk's input from its uniform slot.
    pub fn access_user_input(&mut self, chunk: ChunkId) -> CompileResult {
        let CodeChunk { ty, input, .. } = *self.chunks.get(chunk);
        let Some(input) = input else {
            return self.error("Attempted to access a chunk without a user input");
        };

        let text = if ty == CodeType::Float {
            let index = add_unique(&mut self.scalar_inputs, input);
            format!("UserScalarInputs[{}][{}]", index / 4, index % 4)
        } else if ty.is_numeric() {
            let index = add_unique(&mut self.vector_inputs, input);
            let mask = match ty {
                CodeType::Float1 => ".x",
                CodeType::Float2 => ".xy",
                CodeType::Float3 => ".xyz",
                _ => "",
            };
            format!("UserVectorInputs[{index}]{mask}")
        } else {
            return self.error(format!("User input of unknown type: {ty}"));
        };
        Ok(self.add_code_chunk(ty, ChunkFlags::empty(), text))
    }

    #[inline]
    pub fn parameter_type(&self, chunk: ChunkId) -> CodeType {
        self.chunks.get(chunk).ty
    }

    #[inline]
    pub fn parameter_input(&self, chunk: ChunkId) -> Option<UserInputId> {
        self.chunks.get(chunk).input
    }

    fn is_uniform(&self, chunk: ChunkId) -> bool {
        self.parameter_input(chunk)
            .is_some_and(|input| !self.inputs.should_embed(input))
    }

    /// Code that reads a chunk: its text, or a uniform slot access.
    pub fn parameter_code(&mut self, chunk: ChunkId) -> CompileResult<String> {
        if self.is_uniform(chunk) {
            let accessed = self.access_user_input(chunk)?;
            return Ok(self.chunks.get(accessed).text.clone());
        }
        Ok(self.chunks.get(chunk).text.clone())
    }

    /// Text of a chunk that is known not to need a uniform access.
    ///
    /// **Panics** if the chunk is a uniform input.
    #[must_use]
    pub fn fixed_parameter_code(&self, chunk: ChunkId) -> &str {
        assert!(
            !self.is_uniform(chunk),
            "chunk {} must be accessed through a uniform slot",
            chunk.index()
        );
        &self.chunks.get(chunk).text
    }

    pub fn coerce_parameter(&mut self, chunk: ChunkId, ty: CodeType) -> CompileResult<String> {
        self.check_coercion(chunk, ty)?;
        self.parameter_code(chunk)
    }

    fn check_coercion(&self, chunk: ChunkId, ty: CodeType) -> CompileResult<()> {
        let src = self.chunks.get(chunk);
        if src.ty.is_compatible(ty) {
            Ok(())
        } else {
            self.error(format!("Coercion failed: {}: {} -> {}", src.text, src.ty, ty))
        }
    }

    /// Operand text for a composite input. Only used when the composite
    /// embeds, which implies the operand embeds too.
    fn input_operand(&self, chunk: ChunkId, ty: Option<CodeType>) -> CompileResult<String> {
        if let Some(ty) = ty {
            self.check_coercion(chunk, ty)?;
        }
        Ok(self.chunks.get(chunk).text.clone())
    }

    /// The inputs of all operands, or `None` if any operand is plain code.
    fn operand_inputs(&self, chunks: &[ChunkId]) -> Option<SmallVec<[UserInputId; 3]>> {
        chunks.iter().map(|&c| self.parameter_input(c)).collect()
    }

    // ─── Types ───────────────────────────────────────────────────────────────

    pub fn arithmetic_result_type(&self, a: ChunkId, b: ChunkId) -> CompileResult<CodeType> {
        let (ta, tb) = (self.parameter_type(a), self.parameter_type(b));
        if !ta.is_numeric() || !tb.is_numeric() {
            self.error(format!(
                "Attempting to perform arithmetic on non-numeric types: {ta} {tb}"
            ))
        } else if ta == tb {
            Ok(ta)
        } else if ta == CodeType::Float {
            Ok(tb)
        } else if tb == CodeType::Float {
            Ok(ta)
        } else {
            self.error(format!("Arithmetic between types {ta} and {tb} are undefined"))
        }
    }

    fn num_components(&self, ty: CodeType) -> CompileResult<u32> {
        match ty.num_components() {
            Some(n) => Ok(n),
            None => self.error(format!(
                "Attempting to get component count of non-numeric type {ty}"
            )),
        }
    }

    fn vector_type(&self, n: u32) -> CompileResult<CodeType> {
        match CodeType::vector(n) {
            Some(ty) => Ok(ty),
            None => self.error(format!("Requested {n} component vector type does not exist")),
        }
    }

    /// Converts a chunk to `ty`, masking or zero-padding numeric vectors.
    pub fn force_cast(&mut self, chunk: ChunkId, ty: CodeType) -> CompileResult {
        if self.is_uniform(chunk) {
            let accessed = self.access_user_input(chunk)?;
            return self.force_cast(accessed, ty);
        }

        let src = self.parameter_type(chunk);
        if src.is_compatible(ty) {
            return Ok(chunk);
        }
        if !src.is_numeric() || !ty.is_numeric() {
            return self.error("Cannot force a cast between non-numeric types.");
        }

        let from = self.num_components(src)?;
        let to = self.num_components(ty)?;
        let code = self.parameter_code(chunk)?;
        let text = if from > to {
            let mask = match to {
                1 => ".x",
                2 => ".xy",
                _ => ".xyz",
            };
            format!("{code}{mask}")
        } else if from < to {
            let padding = ",0".repeat((to - from) as usize);
            format!("{}({code}{padding})", ty.name())
        } else {
            return Ok(chunk);
        };
        Ok(self.add_code_chunk(ty, ChunkFlags::empty(), text))
    }

    // ─── Literals & Parameters ───────────────────────────────────────────────

    pub fn constant(&mut self, x: f32) -> ChunkId {
        self.add_user_constant(
            Vec4::new(x, 0.0, 0.0, 0.0),
            CodeType::Float,
            format!("({x:.8})"),
        )
    }

    pub fn constant2(&mut self, x: f32, y: f32) -> ChunkId {
        self.add_user_constant(
            Vec4::new(x, y, 0.0, 0.0),
            CodeType::Float2,
            format!("float2({x:.8},{y:.8})"),
        )
    }

    pub fn constant3(&mut self, x: f32, y: f32, z: f32) -> ChunkId {
        self.add_user_constant(
            Vec4::new(x, y, z, 0.0),
            CodeType::Float3,
            format!("float3({x:.8},{y:.8},{z:.8})"),
        )
    }

    pub fn constant4(&mut self, x: f32, y: f32, z: f32, w: f32) -> ChunkId {
        self.add_user_constant(
            Vec4::new(x, y, z, w),
            CodeType::Float4,
            format!("float4({x:.8},{y:.8},{z:.8},{w:.8})"),
        )
    }

    pub fn scalar_parameter(&mut self, name: &str) -> ChunkId {
        let input = UserInput::Parameter {
            name: name.to_string(),
            vector: false,
        };
        self.add_user_input(input, CodeType::Float, String::new())
    }

    pub fn vector_parameter(&mut self, name: &str) -> ChunkId {
        let input = UserInput::Parameter {
            name: name.to_string(),
            vector: true,
        };
        self.add_user_input(input, CodeType::Float4, String::new())
    }

    pub fn scene_time(&mut self) -> ChunkId {
        let input = UserInput::Time { absolute: true };
        self.add_user_input(input, CodeType::Float, "SceneTime".to_string())
    }

    pub fn object_time(&mut self) -> ChunkId {
        let input = UserInput::Time { absolute: false };
        self.add_user_input(input, CodeType::Float, "ObjectTime".to_string())
    }

    // ─── Textures & Interpolators ────────────────────────────────────────────

    pub fn texture(&mut self, handle: TextureHandle) -> CompileResult {
        let Some(texture) = self.textures.get(handle) else {
            return self.error("Missing texture asset");
        };
        let index = add_unique(&mut self.texture_list, handle);

        let mut flags = ChunkFlags::empty();
        if texture.rgbe {
            flags |= if texture.format == PixelFormat::A8R8G8B8 {
                ChunkFlags::RGBE_8BIT_EXPONENT
            } else {
                ChunkFlags::RGBE_4BIT_EXPONENT
            };
        }
        if texture.format.requires_gamma_correction() && texture.srgb {
            flags |= ChunkFlags::REQUIRES_GAMMA_CORRECTION;
        }

        Ok(self.add_code_chunk(
            CodeType::for_texture(texture.kind),
            flags,
            format!("UserTextures[{index}]"),
        ))
    }

    pub fn texture_sample(&mut self, texture: ChunkId, coordinates: ChunkId) -> CompileResult {
        let CodeChunk { ty, flags, .. } = *self.chunks.get(texture);
        let (sampler, coordinate_type) = match ty {
            CodeType::Texture2D => ("tex2D", CodeType::Float2),
            CodeType::TextureCube => ("texCUBE", CodeType::Float3),
            CodeType::Texture3D => ("tex3D", CodeType::Float3),
            other => return self.error(format!("Sampling unknown texture type: {other}")),
        };

        let texture_code = self.coerce_parameter(texture, ty)?;
        let uv = self.coerce_parameter(coordinates, coordinate_type)?;
        let mut code = format!("{sampler}({texture_code},{uv})");
        if flags.contains(ChunkFlags::RGBE_4BIT_EXPONENT) {
            code = format!("expandCompressedRGBE({code})");
        }
        if flags.contains(ChunkFlags::RGBE_8BIT_EXPONENT) {
            code = format!("expandRGBE({code})");
        }
        if flags.contains(ChunkFlags::REQUIRES_GAMMA_CORRECTION) {
            code = format!("gammaCorrect({code})");
        }
        Ok(self.add_code_chunk(CodeType::Float4, ChunkFlags::empty(), code))
    }

    pub fn texture_coordinate(&mut self, index: u32) -> ChunkId {
        self.num_tex_coords = self.num_tex_coords.max(index + 1);
        self.add_code_chunk(
            CodeType::Float2,
            ChunkFlags::empty(),
            format!("Input.UserTexCoords[{index}]"),
        )
    }

    pub fn vertex_color(&mut self) -> ChunkId {
        self.add_code_chunk(
            CodeType::Float4,
            ChunkFlags::empty(),
            "Input.UserVertexColor".to_string(),
        )
    }

    pub fn camera_vector(&mut self) -> ChunkId {
        self.add_code_chunk(
            CodeType::Float3,
            ChunkFlags::empty(),
            "Input.TangentCameraVector".to_string(),
        )
    }

    pub fn reflection_vector(&mut self) -> ChunkId {
        self.add_code_chunk(
            CodeType::Float3,
            ChunkFlags::empty(),
            "Input.TangentReflectionVector".to_string(),
        )
    }

    // ─── Arithmetic ──────────────────────────────────────────────────────────

    pub fn add(&mut self, a: ChunkId, b: ChunkId) -> CompileResult {
        self.folded(a, b, FoldedOp::Add, "+")
    }

    pub fn sub(&mut self, a: ChunkId, b: ChunkId) -> CompileResult {
        self.folded(a, b, FoldedOp::Sub, "-")
    }

    pub fn mul(&mut self, a: ChunkId, b: ChunkId) -> CompileResult {
        self.folded(a, b, FoldedOp::Mul, "*")
    }

    pub fn div(&mut self, a: ChunkId, b: ChunkId) -> CompileResult {
        self.folded(a, b, FoldedOp::Div, "/")
    }

    fn folded(&mut self, a: ChunkId, b: ChunkId, op: FoldedOp, symbol: &str) -> CompileResult {
        let ty = self.arithmetic_result_type(a, b)?;
        if let Some(inputs) = self.operand_inputs(&[a, b]) {
            let text = format!(
                "({} {symbol} {})",
                self.input_operand(a, None)?,
                self.input_operand(b, None)?
            );
            let input = UserInput::FoldedMath {
                a: inputs[0],
                b: inputs[1],
                op,
            };
            return Ok(self.add_user_input(input, ty, text));
        }
        let code_a = self.parameter_code(a)?;
        let code_b = self.parameter_code(b)?;
        Ok(self.add_code_chunk(
            ty,
            ChunkFlags::empty(),
            format!("({code_a} {symbol} {code_b})"),
        ))
    }

    pub fn dot(&mut self, a: ChunkId, b: ChunkId) -> CompileResult {
        let ty_a = self.parameter_type(a);
        if let Some(inputs) = self.operand_inputs(&[a, b]) {
            self.arithmetic_result_type(a, b)?;
            let text = format!(
                "dot({},{})",
                self.input_operand(a, None)?,
                self.input_operand(b, Some(ty_a))?
            );
            let input = UserInput::FoldedMath {
                a: inputs[0],
                b: inputs[1],
                op: FoldedOp::Dot,
            };
            return Ok(self.add_user_input(input, CodeType::Float, text));
        }
        let code_a = self.parameter_code(a)?;
        let code_b = self.coerce_parameter(b, ty_a)?;
        Ok(self.add_code_chunk(
            CodeType::Float,
            ChunkFlags::empty(),
            format!("dot({code_a},{code_b})"),
        ))
    }

    pub fn cross(&mut self, a: ChunkId, b: ChunkId) -> CompileResult {
        let code_a = self.coerce_parameter(a, CodeType::Float3)?;
        let code_b = self.coerce_parameter(b, CodeType::Float3)?;
        Ok(self.add_code_chunk(
            CodeType::Float3,
            ChunkFlags::empty(),
            format!("cross({code_a},{code_b})"),
        ))
    }

    pub fn square_root(&mut self, x: ChunkId) -> CompileResult {
        if let Some(input) = self.parameter_input(x) {
            let text = format!("sqrt({})", self.input_operand(x, Some(CodeType::Float1))?);
            return Ok(self.add_user_input(UserInput::SquareRoot { x: input }, CodeType::Float, text));
        }
        let code = self.coerce_parameter(x, CodeType::Float1)?;
        Ok(self.add_code_chunk(CodeType::Float, ChunkFlags::empty(), format!("sqrt({code})")))
    }

    pub fn sine(&mut self, x: ChunkId) -> CompileResult {
        self.trig(x, false)
    }

    pub fn cosine(&mut self, x: ChunkId) -> CompileResult {
        self.trig(x, true)
    }

    fn trig(&mut self, x: ChunkId, cosine: bool) -> CompileResult {
        let function = if cosine { "cos" } else { "sin" };
        if let Some(input) = self.parameter_input(x) {
            let text = format!("{function}({})", self.input_operand(x, Some(CodeType::Float))?);
            let input = UserInput::Sine { x: input, cosine };
            return Ok(self.add_user_input(input, CodeType::Float, text));
        }
        let code = self.coerce_parameter(x, CodeType::Float)?;
        Ok(self.add_code_chunk(
            CodeType::Float,
            ChunkFlags::empty(),
            format!("{function}({code})"),
        ))
    }

    pub fn floor(&mut self, x: ChunkId) -> CompileResult {
        self.rounding(x, RoundingOp::Floor, "floor")
    }

    pub fn ceil(&mut self, x: ChunkId) -> CompileResult {
        self.rounding(x, RoundingOp::Ceil, "ceil")
    }

    pub fn frac(&mut self, x: ChunkId) -> CompileResult {
        self.rounding(x, RoundingOp::Frac, "frac")
    }

    fn rounding(&mut self, x: ChunkId, op: RoundingOp, function: &str) -> CompileResult {
        let ty = self.parameter_type(x);
        if let Some(input) = self.parameter_input(x) {
            let text = format!("{function}({})", self.input_operand(x, None)?);
            return Ok(self.add_user_input(UserInput::Rounding { x: input, op }, ty, text));
        }
        let code = self.parameter_code(x)?;
        Ok(self.add_code_chunk(ty, ChunkFlags::empty(), format!("{function}({code})")))
    }

    /// Marks a value where only the fractional part matters, so a uniform
    /// input can be wrapped on the CPU before upload.
    pub fn periodic_hint(&mut self, x: ChunkId) -> CompileResult {
        match self.parameter_input(x) {
            Some(input) => {
                let ty = self.parameter_type(x);
                let text = self.input_operand(x, None)?;
                Ok(self.add_user_input(UserInput::Periodic { x: input }, ty, text))
            }
            None => Ok(x),
        }
    }

    // ─── Combinators ─────────────────────────────────────────────────────────

    pub fn lerp(&mut self, x: ChunkId, y: ChunkId, alpha: ChunkId) -> CompileResult {
        let ty = self.arithmetic_result_type(x, y)?;
        let code_x = self.parameter_code(x)?;
        let code_y = self.parameter_code(y)?;
        let code_alpha = self.coerce_parameter(alpha, CodeType::Float1)?;
        Ok(self.add_code_chunk(
            ty,
            ChunkFlags::empty(),
            format!("lerp({code_x},{code_y},{code_alpha})"),
        ))
    }

    pub fn min(&mut self, a: ChunkId, b: ChunkId) -> CompileResult {
        self.min_max(a, b, false)
    }

    pub fn max(&mut self, a: ChunkId, b: ChunkId) -> CompileResult {
        self.min_max(a, b, true)
    }

    fn min_max(&mut self, a: ChunkId, b: ChunkId, is_max: bool) -> CompileResult {
        let function = if is_max { "max" } else { "min" };
        let ty = self.parameter_type(a);
        if let Some(inputs) = self.operand_inputs(&[a, b]) {
            let text = format!(
                "{function}({},{})",
                self.input_operand(a, None)?,
                self.input_operand(b, Some(ty))?
            );
            let (a, b) = (inputs[0], inputs[1]);
            let input = if is_max {
                UserInput::Max { a, b }
            } else {
                UserInput::Min { a, b }
            };
            return Ok(self.add_user_input(input, ty, text));
        }
        let code_a = self.parameter_code(a)?;
        let code_b = self.coerce_parameter(b, ty)?;
        Ok(self.add_code_chunk(
            ty,
            ChunkFlags::empty(),
            format!("{function}({code_a},{code_b})"),
        ))
    }

    pub fn clamp(&mut self, x: ChunkId, min: ChunkId, max: ChunkId) -> CompileResult {
        let ty = self.parameter_type(x);
        if let Some(inputs) = self.operand_inputs(&[x, min, max]) {
            let text = format!(
                "clamp({},{},{})",
                self.input_operand(x, None)?,
                self.input_operand(min, Some(ty))?,
                self.input_operand(max, Some(ty))?
            );
            let input = UserInput::Clamp {
                x: inputs[0],
                min: inputs[1],
                max: inputs[2],
            };
            return Ok(self.add_user_input(input, ty, text));
        }
        let code_x = self.parameter_code(x)?;
        let code_min = self.coerce_parameter(min, ty)?;
        let code_max = self.coerce_parameter(max, ty)?;
        Ok(self.add_code_chunk(
            ty,
            ChunkFlags::empty(),
            format!("clamp({code_x},{code_min},{code_max})"),
        ))
    }

    pub fn append_vector(&mut self, a: ChunkId, b: ChunkId) -> CompileResult {
        let a_components = self.num_components(self.parameter_type(a))?;
        let b_components = self.num_components(self.parameter_type(b))?;
        let n = a_components + b_components;
        let ty = self.vector_type(n)?;

        if let Some(inputs) = self.operand_inputs(&[a, b]) {
            let text = format!(
                "float{n}({},{})",
                self.input_operand(a, None)?,
                self.input_operand(b, None)?
            );
            let input = UserInput::AppendVector {
                a: inputs[0],
                b: inputs[1],
                a_components,
            };
            return Ok(self.add_user_input(input, ty, text));
        }
        let code_a = self.parameter_code(a)?;
        let code_b = self.parameter_code(b)?;
        Ok(self.add_code_chunk(
            ty,
            ChunkFlags::empty(),
            format!("float{n}({code_a},{code_b})"),
        ))
    }

    pub fn component_mask(&mut self, vector: ChunkId, mask: ChannelMask) -> CompileResult {
        let ty = self.parameter_type(vector);
        let width = ty.bits() & CodeType::Float.bits();
        if (mask.a && width < CodeType::Float4.bits())
            || (mask.b && width < CodeType::Float3.bits())
            || (mask.g && width < CodeType::Float2.bits())
            || (mask.r && width < CodeType::Float1.bits())
        {
            let text = &self.chunks.get(vector).text;
            return self.error(format!(
                "Not enough components in ({text}: {ty}) for component mask {}",
                mask.digits()
            ));
        }

        let Some(result_type) = CodeType::vector(mask.count()) else {
            return self.error(format!(
                "Couldn't determine result type of component mask {}",
                mask.digits()
            ));
        };

        let letters: String = [(mask.r, 'r'), (mask.g, 'g'), (mask.b, 'b'), (mask.a, 'a')]
            .iter()
            .filter(|(selected, _)| *selected)
            .map(|(_, letter)| *letter)
            .collect();
        let code = self.parameter_code(vector)?;
        Ok(self.add_code_chunk(result_type, ChunkFlags::empty(), format!("{code}.{letters}")))
    }
}

fn add_unique_string(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Material, AssetStorage<TextureHandle, Texture>) {
        (Material::new("Test"), AssetStorage::new())
    }

    #[test]
    fn equal_constants_share_one_input() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let a = c.constant(0.5);
        let b = c.constant(0.5);
        let other = c.constant(0.25);

        assert_ne!(a, b);
        assert_eq!(c.parameter_input(a), c.parameter_input(b));
        assert_ne!(c.parameter_input(a), c.parameter_input(other));
        assert_eq!(c.user_inputs().len(), 2);
        assert_eq!(c.chunks().get(a).text, "(0.50000000)");
    }

    #[test]
    fn equal_values_of_different_types_stay_apart() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let scalar = c.constant(1.0);
        let pair = c.constant2(1.0, 0.0);
        let again = c.constant2(1.0, 0.0);

        assert_ne!(c.parameter_input(scalar), c.parameter_input(pair));
        assert_eq!(c.parameter_input(pair), c.parameter_input(again));
        assert_eq!(c.parameter_type(pair), CodeType::Float2);
        assert_eq!(c.user_inputs().len(), 2);
    }

    #[test]
    fn scalar_uniforms_pack_four_per_register() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let names = ["A", "B", "C", "D", "E"];
        let texts: Vec<String> = names
            .iter()
            .map(|name| {
                let chunk = c.scalar_parameter(name);
                c.parameter_code(chunk).unwrap()
            })
            .collect();

        assert_eq!(texts[0], "UserScalarInputs[0][0]");
        assert_eq!(texts[3], "UserScalarInputs[0][3]");
        assert_eq!(texts[4], "UserScalarInputs[1][0]");
    }

    #[test]
    fn accessing_twice_reuses_the_slot() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let tint = c.vector_parameter("Tint");
        let first = c.parameter_code(tint).unwrap();
        let second = c.parameter_code(tint).unwrap();
        assert_eq!(first, "UserVectorInputs[0]");
        assert_eq!(first, second);
        assert_eq!(c.vector_inputs().len(), 1);
    }

    #[test]
    fn literal_math_folds_into_an_embedded_input() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let a = c.constant(1.0);
        let b = c.constant3(0.5, 0.5, 0.5);
        let sum = c.add(a, b).unwrap();

        assert!(c.parameter_input(sum).is_some());
        assert_eq!(c.parameter_type(sum), CodeType::Float3);
        assert_eq!(
            c.parameter_code(sum).unwrap(),
            "((1.00000000) + float3(0.50000000,0.50000000,0.50000000))"
        );
        assert!(c.vector_inputs().is_empty());
    }

    #[test]
    fn parameter_math_becomes_one_uniform() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let tint = c.vector_parameter("Tint");
        let two = c.constant(2.0);
        let scaled = c.mul(tint, two).unwrap();

        assert_eq!(c.parameter_code(scaled).unwrap(), "UserVectorInputs[0]");
        assert_eq!(c.vector_inputs().len(), 1);
        assert_eq!(c.vector_inputs()[0], c.parameter_input(scaled).unwrap());
    }

    #[test]
    fn mixed_operands_emit_plain_code() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let uv = c.texture_coordinate(1);
        let gloss = c.scalar_parameter("Gloss");
        let product = c.mul(uv, gloss).unwrap();

        assert!(c.parameter_input(product).is_none());
        assert_eq!(c.parameter_type(product), CodeType::Float2);
        assert_eq!(
            c.chunks().get(product).text,
            "(Input.UserTexCoords[1] * UserScalarInputs[0][0])"
        );
        assert_eq!(c.num_tex_coords(), 2);
    }

    #[test]
    fn arithmetic_type_errors() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let v2 = c.constant2(1.0, 2.0);
        let v3 = c.constant3(1.0, 2.0, 3.0);
        assert_eq!(
            c.add(v2, v3),
            Err(CompileError::Graph(
                "Arithmetic between types float2 and float3 are undefined".to_string()
            ))
        );
    }

    #[test]
    fn force_cast_masks_and_pads() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let color = c.vertex_color();
        let narrowed = c.force_cast(color, CodeType::Float2).unwrap();
        assert_eq!(c.chunks().get(narrowed).text, "Input.UserVertexColor.xy");

        let widened = c.force_cast(narrowed, CodeType::Float4).unwrap();
        assert_eq!(
            c.chunks().get(widened).text,
            "float4(Input.UserVertexColor.xy,0,0)"
        );
        assert_eq!(c.parameter_type(widened), CodeType::Float4);
    }

    #[test]
    fn component_mask_checks_width() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let camera = c.camera_vector();
        let err = c
            .component_mask(camera, ChannelMask::RGBA)
            .unwrap_err()
            .to_string();
        assert_eq!(
            err,
            "Not enough components in (Input.TangentCameraVector: float3) for component mask 1111"
        );

        let none = c.component_mask(camera, ChannelMask::default());
        assert!(none.is_err());

        let rg = c.component_mask(camera, ChannelMask::RG).unwrap();
        assert_eq!(c.chunks().get(rg).text, "Input.TangentCameraVector.rg");
        assert_eq!(c.parameter_type(rg), CodeType::Float2);
    }

    #[test]
    fn append_rejects_oversized_vectors() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let color = c.vertex_color();
        let camera = c.camera_vector();
        assert_eq!(
            c.append_vector(color, camera).unwrap_err().to_string(),
            "Requested 7 component vector type does not exist"
        );
    }

    #[test]
    fn time_is_never_embedded() {
        let (material, textures) = setup();
        let mut c = MaterialCompiler::new(&material, &textures);
        let time = c.scene_time();
        let wave = c.sine(time).unwrap();
        assert_eq!(c.parameter_code(wave).unwrap(), "UserScalarInputs[0][0]");
    }
}
