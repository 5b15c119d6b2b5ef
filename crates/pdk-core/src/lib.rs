//! # pdk-core
//!
//! Shared error and result types for the density kernels.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{EdgePartials, Evaluation};
