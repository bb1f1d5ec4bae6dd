//! Shading Graph
//!
//! A material's expression graph is a small DAG stored as an arena of
//! [`ExpressionNode`]s. Edges are [`ExpressionInput`]s that name the producing
//! node by [`ExpressionId`], optionally followed by a channel mask applied to
//! its output.
//!
//! The graph is authored data: it may contain dangling inputs (reported as
//! compile errors) and even cycles (detected by the compiler's guard stack).
//!
//! ```rust,ignore
//! let mut graph = ShadingGraph::new();
//! let tex = graph.texture_sample(texture_handle, None);
//! let tint = graph.vector_parameter("Tint");
//! let tinted = graph.binary(BinaryOp::Mul, ExpressionInput::masked(tex, ChannelMask::RGB), tint);
//! ```

use glam::Vec4;

use crate::assets::TextureHandle;

/// Index of a node inside its [`ShadingGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpressionId(pub(crate) u32);

impl ExpressionId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Channel selection, as used by component masks and masked inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelMask {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub a: bool,
}

impl ChannelMask {
    pub const R: Self = Self::new(true, false, false, false);
    pub const RG: Self = Self::new(true, true, false, false);
    pub const RGB: Self = Self::new(true, true, true, false);
    pub const RGBA: Self = Self::new(true, true, true, true);

    #[must_use]
    pub const fn new(r: bool, g: bool, b: bool, a: bool) -> Self {
        Self { r, g, b, a }
    }

    /// Number of selected channels.
    #[must_use]
    pub fn count(self) -> u32 {
        u32::from(self.r) + u32::from(self.g) + u32::from(self.b) + u32::from(self.a)
    }

    /// The mask as four `0`/`1` digits, e.g. `1110`.
    #[must_use]
    pub fn digits(self) -> String {
        [self.r, self.g, self.b, self.a]
            .iter()
            .map(|&c| if c { '1' } else { '0' })
            .collect()
    }
}

/// An edge into a node input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpressionInput {
    pub node: ExpressionId,
    pub mask: Option<ChannelMask>,
}

impl ExpressionInput {
    #[must_use]
    pub fn masked(node: ExpressionId, mask: ChannelMask) -> Self {
        Self {
            node,
            mask: Some(mask),
        }
    }
}

impl From<ExpressionId> for ExpressionInput {
    fn from(node: ExpressionId) -> Self {
        Self { node, mask: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    SquareRoot,
    Floor,
    Ceil,
    Frac,
    /// Marks a value where only the fractional part matters.
    PeriodicHint,
    /// `sin(x)`; a positive period rescales the input by `2π / period`.
    Sine { period: f32 },
    Cosine { period: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Dot,
    Cross,
}

/// What a node computes.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Constant {
        value: Vec4,
        components: u8,
    },
    ScalarParameter {
        name: String,
    },
    VectorParameter {
        name: String,
    },
    Time {
        absolute: bool,
    },
    TextureSample {
        texture: Option<TextureHandle>,
        coordinates: Option<ExpressionInput>,
    },
    TextureCoordinate {
        index: u32,
        tiling: f32,
    },
    VertexColor,
    CameraVector,
    ReflectionVector,
    Unary {
        op: UnaryOp,
        input: Option<ExpressionInput>,
    },
    Binary {
        op: BinaryOp,
        a: Option<ExpressionInput>,
        b: Option<ExpressionInput>,
    },
    Min {
        a: Option<ExpressionInput>,
        b: Option<ExpressionInput>,
    },
    Max {
        a: Option<ExpressionInput>,
        b: Option<ExpressionInput>,
    },
    Clamp {
        input: Option<ExpressionInput>,
        min: Option<ExpressionInput>,
        max: Option<ExpressionInput>,
    },
    Lerp {
        a: Option<ExpressionInput>,
        b: Option<ExpressionInput>,
        alpha: Option<ExpressionInput>,
    },
    AppendVector {
        a: Option<ExpressionInput>,
        b: Option<ExpressionInput>,
    },
    ComponentMask {
        input: Option<ExpressionInput>,
        mask: ChannelMask,
    },
}

impl ExpressionKind {
    /// Default display name, used to prefix compile errors.
    #[must_use]
    pub fn caption(&self) -> &'static str {
        match self {
            Self::Constant { .. } => "Constant",
            Self::ScalarParameter { .. } => "ScalarParameter",
            Self::VectorParameter { .. } => "VectorParameter",
            Self::Time { .. } => "Time",
            Self::TextureSample { .. } => "TextureSample",
            Self::TextureCoordinate { .. } => "TextureCoordinate",
            Self::VertexColor => "VertexColor",
            Self::CameraVector => "CameraVector",
            Self::ReflectionVector => "ReflectionVector",
            Self::Unary { op, .. } => match op {
                UnaryOp::SquareRoot => "SquareRoot",
                UnaryOp::Floor => "Floor",
                UnaryOp::Ceil => "Ceil",
                UnaryOp::Frac => "Frac",
                UnaryOp::PeriodicHint => "PeriodicHint",
                UnaryOp::Sine { .. } => "Sine",
                UnaryOp::Cosine { .. } => "Cosine",
            },
            Self::Binary { op, .. } => match op {
                BinaryOp::Add => "Add",
                BinaryOp::Sub => "Subtract",
                BinaryOp::Mul => "Multiply",
                BinaryOp::Div => "Divide",
                BinaryOp::Dot => "DotProduct",
                BinaryOp::Cross => "CrossProduct",
            },
            Self::Min { .. } => "Min",
            Self::Max { .. } => "Max",
            Self::Clamp { .. } => "Clamp",
            Self::Lerp { .. } => "LinearInterpolate",
            Self::AppendVector { .. } => "AppendVector",
            Self::ComponentMask { .. } => "ComponentMask",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    pub name: String,
    pub kind: ExpressionKind,
}

/// Arena of expression nodes owned by a material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadingGraph {
    nodes: Vec<ExpressionNode>,
}

impl ShadingGraph {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Appends a node named after its kind.
    pub fn add(&mut self, kind: ExpressionKind) -> ExpressionId {
        let name = kind.caption().to_string();
        self.add_named(name, kind)
    }

    pub fn add_named(&mut self, name: impl Into<String>, kind: ExpressionKind) -> ExpressionId {
        let id = ExpressionId(self.nodes.len() as u32);
        self.nodes.push(ExpressionNode {
            name: name.into(),
            kind,
        });
        id
    }

    /// Replaces a node in place, keeping its id. Used by editors to rewire
    /// inputs after creation.
    pub fn replace(&mut self, id: ExpressionId, kind: ExpressionKind) {
        self.nodes[id.index()].kind = kind;
    }

    /// **Panics** if the id does not belong to this graph.
    #[inline]
    #[must_use]
    pub fn node(&self, id: ExpressionId) -> &ExpressionNode {
        &self.nodes[id.index()]
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ─── Builders ─────────────────────────────────────────────────────────────

    pub fn constant(&mut self, x: f32) -> ExpressionId {
        self.add(ExpressionKind::Constant {
            value: Vec4::new(x, 0.0, 0.0, 0.0),
            components: 1,
        })
    }

    pub fn constant2(&mut self, x: f32, y: f32) -> ExpressionId {
        self.add(ExpressionKind::Constant {
            value: Vec4::new(x, y, 0.0, 0.0),
            components: 2,
        })
    }

    pub fn constant3(&mut self, x: f32, y: f32, z: f32) -> ExpressionId {
        self.add(ExpressionKind::Constant {
            value: Vec4::new(x, y, z, 0.0),
            components: 3,
        })
    }

    pub fn constant4(&mut self, value: Vec4) -> ExpressionId {
        self.add(ExpressionKind::Constant {
            value,
            components: 4,
        })
    }

    pub fn scalar_parameter(&mut self, name: &str) -> ExpressionId {
        self.add(ExpressionKind::ScalarParameter {
            name: name.to_string(),
        })
    }

    pub fn vector_parameter(&mut self, name: &str) -> ExpressionId {
        self.add(ExpressionKind::VectorParameter {
            name: name.to_string(),
        })
    }

    pub fn time(&mut self, absolute: bool) -> ExpressionId {
        self.add(ExpressionKind::Time { absolute })
    }

    pub fn texture_sample(
        &mut self,
        texture: TextureHandle,
        coordinates: Option<ExpressionInput>,
    ) -> ExpressionId {
        self.add(ExpressionKind::TextureSample {
            texture: Some(texture),
            coordinates,
        })
    }

    pub fn texture_coordinate(&mut self, index: u32) -> ExpressionId {
        self.add(ExpressionKind::TextureCoordinate { index, tiling: 1.0 })
    }

    pub fn unary(&mut self, op: UnaryOp, input: impl Into<ExpressionInput>) -> ExpressionId {
        self.add(ExpressionKind::Unary {
            op,
            input: Some(input.into()),
        })
    }

    pub fn binary(
        &mut self,
        op: BinaryOp,
        a: impl Into<ExpressionInput>,
        b: impl Into<ExpressionInput>,
    ) -> ExpressionId {
        self.add(ExpressionKind::Binary {
            op,
            a: Some(a.into()),
            b: Some(b.into()),
        })
    }

    pub fn clamp(
        &mut self,
        input: impl Into<ExpressionInput>,
        min: Option<ExpressionInput>,
        max: Option<ExpressionInput>,
    ) -> ExpressionId {
        self.add(ExpressionKind::Clamp {
            input: Some(input.into()),
            min,
            max,
        })
    }

    pub fn append(
        &mut self,
        a: impl Into<ExpressionInput>,
        b: impl Into<ExpressionInput>,
    ) -> ExpressionId {
        self.add(ExpressionKind::AppendVector {
            a: Some(a.into()),
            b: Some(b.into()),
        })
    }

    pub fn component_mask(
        &mut self,
        input: impl Into<ExpressionInput>,
        mask: ChannelMask,
    ) -> ExpressionId {
        self.add(ExpressionKind::ComponentMask {
            input: Some(input.into()),
            mask,
        })
    }
}
