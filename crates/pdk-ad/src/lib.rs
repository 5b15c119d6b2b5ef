//! # pdk-ad
//!
//! Reverse-mode automatic differentiation (AD) for the density kernels.
//!
//! Provides:
//! - **Reverse-mode AD** via a computation [`tape::Tape`], including
//!   precomputed nodes for kernels with closed-form partials
//! - [`Scalar`] trait for writing kernels once over constants and tracked [`Real`]s

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod scalar;
pub mod tape;

pub use scalar::{Real, Scalar};
pub use tape::{Tape, Var};
