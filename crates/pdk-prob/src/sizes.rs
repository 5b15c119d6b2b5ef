//! Size reconciliation across kernel arguments.

use pdk_core::{Error, Result};

/// Largest of `sizes` (0 when empty).
#[inline]
pub fn max_size(sizes: &[usize]) -> usize {
    sizes.iter().copied().max().unwrap_or(0)
}

/// Whether any size is zero.
#[inline]
pub fn any_empty(sizes: &[usize]) -> bool {
    sizes.contains(&0)
}

/// Reconcile `(name, size)` pairs into the common output size `N`.
///
/// `N` is the largest size; every argument must have size 1 or `N`. The first
/// argument violating that is reported as [`Error::SizeMismatch`].
pub fn check_consistent_sizes(
    function: &'static str,
    args: &[(&'static str, usize)],
) -> Result<usize> {
    let expected = args.iter().map(|&(_, size)| size).max().unwrap_or(0);
    for &(argument, size) in args {
        if size != 1 && size != expected {
            return Err(Error::SizeMismatch { function, argument, size, expected });
        }
    }
    Ok(expected)
}
