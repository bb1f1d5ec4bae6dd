//! CPU-Evaluable Inputs
//!
//! Every non-literal subexpression the compiler can fold on the CPU becomes a
//! [`UserInput`]. At bind time the shader object evaluates each uniform input
//! for the current instance and uploads the result; inputs that *embed* are
//! emitted inline as code instead and never occupy a uniform slot.
//!
//! Composites refer to children by [`UserInputId`]. Children are always
//! registered before their parent, so evaluation recursion is bounded by the
//! arena length.

use glam::Vec4;

use crate::resources::MaterialInstance;

/// Index of an input inside its [`UserInputs`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserInputId(pub(crate) u32);

impl UserInputId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoldedOp {
    Add,
    Sub,
    Mul,
    Div,
    Dot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundingOp {
    Floor,
    Ceil,
    Frac,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    Constant {
        value: Vec4,
    },
    Parameter {
        name: String,
        vector: bool,
    },
    Time {
        absolute: bool,
    },
    Sine {
        x: UserInputId,
        cosine: bool,
    },
    SquareRoot {
        x: UserInputId,
    },
    Rounding {
        x: UserInputId,
        op: RoundingOp,
    },
    Periodic {
        x: UserInputId,
    },
    FoldedMath {
        a: UserInputId,
        b: UserInputId,
        op: FoldedOp,
    },
    AppendVector {
        a: UserInputId,
        b: UserInputId,
        a_components: u32,
    },
    Min {
        a: UserInputId,
        b: UserInputId,
    },
    Max {
        a: UserInputId,
        b: UserInputId,
    },
    Clamp {
        x: UserInputId,
        min: UserInputId,
        max: UserInputId,
    },
}

/// Values an input reads while being evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'a> {
    pub instance: Option<&'a MaterialInstance>,
    pub object_time: f32,
    pub scene_time: f32,
}

fn splat_x(x: f32) -> Vec4 {
    Vec4::new(x, 0.0, 0.0, 0.0)
}

fn frac(v: Vec4) -> Vec4 {
    v - v.floor()
}

/// Arena of the inputs registered by one compile pass.
#[derive(Debug, Clone, Default)]
pub struct UserInputs {
    inputs: Vec<UserInput>,
}

impl UserInputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, input: UserInput) -> UserInputId {
        let id = UserInputId(self.inputs.len() as u32);
        self.inputs.push(input);
        id
    }

    /// **Panics** if `id` was not issued by this arena.
    #[inline]
    #[must_use]
    pub fn get(&self, id: UserInputId) -> &UserInput {
        &self.inputs[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Whether the input can be emitted inline as code.
    #[must_use]
    pub fn should_embed(&self, id: UserInputId) -> bool {
        match self.get(id) {
            UserInput::Constant { .. } => true,
            UserInput::Parameter { .. } | UserInput::Time { .. } | UserInput::Periodic { .. } => {
                false
            }
            UserInput::Sine { x, .. }
            | UserInput::SquareRoot { x }
            | UserInput::Rounding { x, .. } => self.should_embed(*x),
            UserInput::FoldedMath { a, b, .. }
            | UserInput::AppendVector { a, b, .. }
            | UserInput::Min { a, b }
            | UserInput::Max { a, b } => self.should_embed(*a) && self.should_embed(*b),
            UserInput::Clamp { x, min, max } => {
                self.should_embed(*x) && self.should_embed(*min) && self.should_embed(*max)
            }
        }
    }

    /// The input's value as a linear colour.
    #[must_use]
    pub fn evaluate(&self, id: UserInputId, ctx: &EvalContext<'_>) -> Vec4 {
        match self.get(id) {
            UserInput::Constant { value } => *value,
            UserInput::Parameter { name, vector } => {
                let instance = ctx.instance;
                if *vector {
                    instance.and_then(|i| i.vector(name)).unwrap_or(Vec4::ZERO)
                } else {
                    instance
                        .and_then(|i| i.scalar(name))
                        .map_or(Vec4::ZERO, splat_x)
                }
            }
            UserInput::Time { absolute } => {
                splat_x(if *absolute {
                    ctx.scene_time
                } else {
                    ctx.object_time
                })
            }
            UserInput::Sine { x, cosine } => {
                let x = self.evaluate(*x, ctx).x;
                splat_x(if *cosine { x.cos() } else { x.sin() })
            }
            UserInput::SquareRoot { x } => splat_x(self.evaluate(*x, ctx).x.sqrt()),
            UserInput::Rounding { x, op } => {
                let v = self.evaluate(*x, ctx);
                match op {
                    RoundingOp::Floor => v.floor(),
                    RoundingOp::Ceil => v.ceil(),
                    RoundingOp::Frac => frac(v),
                }
            }
            UserInput::Periodic { x } => frac(self.evaluate(*x, ctx)),
            UserInput::FoldedMath { a, b, op } => {
                let a = self.evaluate(*a, ctx);
                let b = self.evaluate(*b, ctx);
                match op {
                    FoldedOp::Add => a + b,
                    FoldedOp::Sub => a - b,
                    FoldedOp::Mul => a * b,
                    FoldedOp::Div => a / b,
                    FoldedOp::Dot => splat_x(a.dot(b)),
                }
            }
            UserInput::AppendVector { a, b, a_components } => {
                let a = self.evaluate(*a, ctx).to_array();
                let b = self.evaluate(*b, ctx).to_array();
                let n = (*a_components as usize).min(4);
                let mut out = [0.0_f32; 4];
                for (i, slot) in out.iter_mut().enumerate() {
                    *slot = if i < n { a[i] } else { b[i - n] };
                }
                Vec4::from_array(out)
            }
            UserInput::Min { a, b } => self.evaluate(*a, ctx).min(self.evaluate(*b, ctx)),
            UserInput::Max { a, b } => self.evaluate(*a, ctx).max(self.evaluate(*b, ctx)),
            UserInput::Clamp { x, min, max } => {
                let x = self.evaluate(*x, ctx);
                x.max(self.evaluate(*min, ctx)).min(self.evaluate(*max, ctx))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(inputs: &mut UserInputs, x: f32, y: f32, z: f32, w: f32) -> UserInputId {
        inputs.push(UserInput::Constant {
            value: Vec4::new(x, y, z, w),
        })
    }

    #[test]
    fn parameters_read_the_instance_or_black() {
        let mut inputs = UserInputs::new();
        let tint = inputs.push(UserInput::Parameter {
            name: "Tint".to_string(),
            vector: true,
        });
        let gloss = inputs.push(UserInput::Parameter {
            name: "Gloss".to_string(),
            vector: false,
        });

        let mut instance = MaterialInstance::new();
        instance.set_scalar("Gloss", 0.5);
        let ctx = EvalContext {
            instance: Some(&instance),
            ..EvalContext::default()
        };

        assert_eq!(inputs.evaluate(tint, &ctx), Vec4::ZERO);
        assert_eq!(inputs.evaluate(gloss, &ctx), Vec4::new(0.5, 0.0, 0.0, 0.0));
        assert!(!inputs.should_embed(tint));
    }

    #[test]
    fn dot_sums_all_four_components() {
        let mut inputs = UserInputs::new();
        let a = constant(&mut inputs, 1.0, 2.0, 3.0, 4.0);
        let b = constant(&mut inputs, 1.0, 1.0, 1.0, 1.0);
        let dot = inputs.push(UserInput::FoldedMath {
            a,
            b,
            op: FoldedOp::Dot,
        });

        let value = inputs.evaluate(dot, &EvalContext::default());
        assert_eq!(value, Vec4::new(10.0, 0.0, 0.0, 0.0));
        assert!(inputs.should_embed(dot));
    }

    #[test]
    fn append_takes_leading_components_of_each_side() {
        let mut inputs = UserInputs::new();
        let a = constant(&mut inputs, 1.0, 2.0, 9.0, 9.0);
        let b = constant(&mut inputs, 3.0, 4.0, 9.0, 9.0);
        let append = inputs.push(UserInput::AppendVector {
            a,
            b,
            a_components: 2,
        });
        assert_eq!(
            inputs.evaluate(append, &EvalContext::default()),
            Vec4::new(1.0, 2.0, 3.0, 4.0)
        );
    }

    #[test]
    fn time_and_periodic_never_embed() {
        let mut inputs = UserInputs::new();
        let time = inputs.push(UserInput::Time { absolute: false });
        let periodic = inputs.push(UserInput::Periodic { x: time });
        let c = constant(&mut inputs, 2.0, 0.0, 0.0, 0.0);
        let scaled = inputs.push(UserInput::FoldedMath {
            a: time,
            b: c,
            op: FoldedOp::Mul,
        });

        let ctx = EvalContext {
            instance: None,
            object_time: 1.25,
            scene_time: 100.0,
        };
        assert_eq!(inputs.evaluate(periodic, &ctx).x, 0.25);
        assert_eq!(inputs.evaluate(scaled, &ctx).x, 2.5);
        assert!(!inputs.should_embed(periodic));
        assert!(!inputs.should_embed(scaled));
    }
}
