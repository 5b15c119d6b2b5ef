//! Domain checks run before any kernel work.
//!
//! Each check walks every element of the argument and fails on the first
//! offending one, naming the function and argument passed in by the caller.

use pdk_core::{Error, Result};

use crate::argument::Argument;

fn check_all<A: Argument + ?Sized>(
    function: &'static str,
    name: &'static str,
    arg: &A,
    condition: &'static str,
    ok: impl Fn(f64) -> bool,
) -> Result<()> {
    match arg.values().find(|&v| !ok(v)) {
        Some(v) => Err(Error::domain(function, name, condition, v)),
        None => Ok(()),
    }
}

/// Every element finite and `>= 0`.
pub fn check_nonnegative_finite<A: Argument + ?Sized>(
    function: &'static str,
    name: &'static str,
    arg: &A,
) -> Result<()> {
    check_all(function, name, arg, "finite and >= 0", |v| v.is_finite() && v >= 0.0)
}

/// Every element finite.
pub fn check_finite<A: Argument + ?Sized>(
    function: &'static str,
    name: &'static str,
    arg: &A,
) -> Result<()> {
    check_all(function, name, arg, "finite", f64::is_finite)
}

/// Every element finite and `> 0`.
pub fn check_positive_finite<A: Argument + ?Sized>(
    function: &'static str,
    name: &'static str,
    arg: &A,
) -> Result<()> {
    check_all(function, name, arg, "finite and > 0", |v| v.is_finite() && v > 0.0)
}
