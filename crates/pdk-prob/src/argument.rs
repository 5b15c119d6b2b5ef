//! Scalar-or-sequence kernel arguments and their broadcast views.
//!
//! Any [`Scalar`] (plain number or tape-tracked [`Real`](pdk_ad::Real)) is an
//! argument of size 1; slices, arrays and `Vec`s of scalars are sequences.
//! References to arguments are arguments too, so callers can lend data:
//!
//! ```
//! use pdk_prob::argument::{Argument, Broadcast};
//!
//! let phi = vec![1.0, 2.0, 3.0];
//! assert_eq!((&phi).size(), 3);
//!
//! let eta = Broadcast::new(&0.5f64);
//! assert_eq!(eta.value(2), 0.5);
//! ```

use pdk_ad::Scalar;

/// A kernel argument: one scalar, or a sequence of them.
pub trait Argument {
    /// Element type.
    type Elem: Scalar;

    /// Number of elements (1 for scalars).
    fn size(&self) -> usize;

    /// Element `i`, `i < size()`.
    fn at(&self, i: usize) -> Self::Elem;

    /// Whether derivatives with respect to this argument are tracked.
    #[inline]
    fn is_differentiable(&self) -> bool {
        <Self::Elem as Scalar>::IS_VAR
    }

    /// Iterate the primal values.
    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.size()).map(move |i| self.at(i).value())
    }
}

macro_rules! impl_scalar_argument {
    ($($t:ty),* $(,)?) => {
        $(
            impl Argument for $t {
                type Elem = $t;

                #[inline]
                fn size(&self) -> usize {
                    1
                }

                #[inline]
                fn at(&self, _i: usize) -> $t {
                    *self
                }
            }
        )*
    };
}

impl_scalar_argument!(f64, f32, i32, i64, u32, u64, usize, pdk_ad::Real);

impl<T: Scalar> Argument for [T] {
    type Elem = T;

    #[inline]
    fn size(&self) -> usize {
        self.len()
    }

    #[inline]
    fn at(&self, i: usize) -> T {
        self[i]
    }
}

impl<T: Scalar, const N: usize> Argument for [T; N] {
    type Elem = T;

    #[inline]
    fn size(&self) -> usize {
        N
    }

    #[inline]
    fn at(&self, i: usize) -> T {
        self[i]
    }
}

impl<T: Scalar> Argument for Vec<T> {
    type Elem = T;

    #[inline]
    fn size(&self) -> usize {
        self.len()
    }

    #[inline]
    fn at(&self, i: usize) -> T {
        self[i]
    }
}

impl<A: Argument + ?Sized> Argument for &A {
    type Elem = A::Elem;

    #[inline]
    fn size(&self) -> usize {
        (**self).size()
    }

    #[inline]
    fn at(&self, i: usize) -> A::Elem {
        (**self).at(i)
    }
}

/// Read-only view of an argument broadcast to the reconciled output size.
///
/// Index `i` maps to element 0 for size-1 arguments and to element `i`
/// otherwise. Sizes are not re-checked here; see
/// [`check_consistent_sizes`](crate::sizes::check_consistent_sizes).
pub struct Broadcast<'a, A: Argument + ?Sized> {
    arg: &'a A,
    /// 0 for a size-1 argument, 1 otherwise.
    stride: usize,
}

impl<'a, A: Argument + ?Sized> Broadcast<'a, A> {
    /// Wrap `arg`.
    pub fn new(arg: &'a A) -> Self {
        let stride = usize::from(arg.size() != 1);
        Self { arg, stride }
    }

    /// Broadcast element `i`.
    #[inline]
    pub fn get(&self, i: usize) -> A::Elem {
        self.arg.at(i * self.stride)
    }

    /// Primal value of broadcast element `i`.
    #[inline]
    pub fn value(&self, i: usize) -> f64 {
        self.get(i).value()
    }

    /// Whether the underlying argument has more than one element.
    pub fn is_sequence(&self) -> bool {
        self.stride == 1
    }
}
