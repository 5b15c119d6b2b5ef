//! [`Scalar`] trait: abstraction over plain numbers and tape-tracked [`Real`]s
//! that lets a density kernel be written once and asked, per argument, whether
//! derivatives are wanted.

use crate::tape::Var;

/// An element a density kernel can read.
///
/// Plain numeric types are constants; [`Real`] is a differentiable leaf
/// recorded on a [`Tape`](crate::tape::Tape).
pub trait Scalar: Copy {
    /// Whether partial derivatives with respect to this element are tracked.
    const IS_VAR: bool;

    /// Extract the primal value.
    fn value(self) -> f64;

    /// Tape node carrying the derivative, `None` for constants.
    fn node(self) -> Option<Var>;
}

macro_rules! impl_constant_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl Scalar for $t {
                const IS_VAR: bool = false;

                #[inline]
                fn value(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn node(self) -> Option<Var> {
                    None
                }
            }
        )*
    };
}

impl_constant_scalar!(f64, f32, i32, i64, u32, u64, usize);

/// A real number recorded on a tape: node handle plus primal value.
///
/// Created by [`Tape::real`](crate::tape::Tape::real).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Real {
    pub(crate) var: Var,
    pub(crate) val: f64,
}

impl Real {
    /// Tape node of this value.
    #[inline]
    pub fn var(&self) -> Var {
        self.var
    }
}

impl Scalar for Real {
    const IS_VAR: bool = true;

    #[inline]
    fn value(self) -> f64 {
        self.val
    }

    #[inline]
    fn node(self) -> Option<Var> {
        Some(self.var)
    }
}
