//! Lazily-populated buffers of intermediate values.
//!
//! A kernel decides once per call which intermediates it needs (from the
//! differentiability of its arguments and the `propto` flag), then builds one
//! [`Cached`] per quantity. Unneeded quantities allocate nothing.

/// Intermediate values for one quantity, sized to its own broadcast length.
#[derive(Debug, Clone, Default)]
pub struct Cached {
    values: Vec<f64>,
    /// 0 for a size-1 quantity, 1 otherwise.
    stride: usize,
}

impl Cached {
    /// Compute `f(i)` for `i in 0..size`.
    pub fn compute(size: usize, f: impl FnMut(usize) -> f64) -> Self {
        let values: Vec<f64> = (0..size).map(f).collect();
        Self { values, stride: usize::from(size != 1) }
    }

    /// Like [`compute`](Cached::compute) when `needed`, otherwise an empty slot.
    pub fn compute_if(needed: bool, size: usize, f: impl FnMut(usize) -> f64) -> Self {
        if needed { Self::compute(size, f) } else { Self::default() }
    }

    /// Whether values were computed.
    pub fn is_computed(&self) -> bool {
        !self.values.is_empty()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for output element `i`, broadcasting a size-1 quantity.
    ///
    /// # Panics
    ///
    /// Reading a slot that was not computed is a kernel bug and panics.
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        debug_assert!(self.is_computed(), "read of an uncomputed cache slot");
        self.values[i * self.stride]
    }
}
