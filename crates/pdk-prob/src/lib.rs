//! Probability kernels with analytic partials.
//!
//! This crate hosts the generic machinery every density kernel is built from:
//! - scalar-or-sequence arguments and broadcast views ([`argument`])
//! - size reconciliation and domain checks ([`sizes`], [`check`])
//! - lazily computed intermediates ([`cache`])
//! - partial derivative accumulation and tape registration ([`partials`])
//! - small numeric helpers (stable log/exp/sigmoid, log-beta, digamma differences)
//!
//! and the kernels themselves (currently [`neg_binomial`]).

pub mod argument;
pub mod cache;
pub mod check;
pub mod math;
pub mod neg_binomial;
pub mod partials;
pub mod sizes;

pub use argument::{Argument, Broadcast};
pub use partials::{Edge, LogDensity, Partials};
