//! Tape-based reverse-mode automatic differentiation.
//!
//! Records a computation graph (forward pass), then computes **all** gradients
//! in a single backward sweep.
//!
//! Density kernels know their partials in closed form, so instead of recording
//! every elementary operation they push one *precomputed* node: the value plus
//! `(operand, partial)` pairs. Elementary nodes remain available for composing
//! kernel outputs (sums, scaling, transforms).
//!
//! # Example
//! ```
//! use pdk_ad::tape::Tape;
//!
//! let mut tape = Tape::new();
//! let x = tape.var(3.0);
//! let y = tape.var(5.0);
//! // f = x * y with known partials (y, x)
//! let f = tape.precomputed(15.0, [(x, 5.0), (y, 3.0)]);
//! let g = tape.add(f, x);       // g = f + x = 18
//! tape.backward(g);
//! assert_eq!(tape.adjoint(x), 6.0);  // dg/dx = y + 1 = 6
//! assert_eq!(tape.adjoint(y), 3.0);  // dg/dy = x = 3
//! ```

use crate::scalar::Real;

/// Handle to a node on the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Var(pub(crate) usize);

/// Operation recorded on the tape.
#[derive(Debug, Clone, Copy)]
enum Op {
    /// Input variable (leaf).
    Input,
    /// Constant (adjoint never propagated).
    Const,
    Add(usize, usize),
    Mul(usize, usize),
    Ln(usize),
    Exp(usize),
    /// Externally supplied partials: `operands[start..start + len]`.
    Precomputed(usize, usize),
}

/// Node on the tape: value + operation that produced it.
#[derive(Debug, Clone)]
struct Node {
    val: f64,
    op: Op,
}

/// Reverse-mode AD tape.
///
/// Build a computation graph by calling methods (var, precomputed, add, …),
/// then call [`backward`](Tape::backward) and read gradients with [`adjoint`](Tape::adjoint).
#[derive(Debug, Default)]
pub struct Tape {
    nodes: Vec<Node>,
    adjoints: Vec<f64>,
    /// `(operand node, partial)` pairs referenced by precomputed nodes.
    operands: Vec<(usize, f64)>,
}

impl Tape {
    /// Create an empty tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tape pre-allocated for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            adjoints: Vec::with_capacity(capacity),
            operands: Vec::with_capacity(capacity),
        }
    }

    /// Number of nodes on the tape.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tape is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Clear the tape for reuse (avoids reallocation).
    #[inline]
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.adjoints.clear();
        self.operands.clear();
    }

    #[inline]
    fn push(&mut self, val: f64, op: Op) -> Var {
        let idx = self.nodes.len();
        self.nodes.push(Node { val, op });
        Var(idx)
    }

    // --- Leaf constructors ---

    /// Record an input variable.
    #[inline]
    pub fn var(&mut self, val: f64) -> Var {
        self.push(val, Op::Input)
    }

    /// Record an input variable and return it together with its value.
    #[inline]
    pub fn real(&mut self, val: f64) -> Real {
        Real { var: self.var(val), val }
    }

    /// Record a constant (gradient never flows through it).
    #[inline]
    pub fn constant(&mut self, val: f64) -> Var {
        self.push(val, Op::Const)
    }

    /// Record a node whose partials with respect to earlier nodes are known.
    ///
    /// During [`backward`](Tape::backward) each `(operand, partial)` pair
    /// receives `partial * adjoint(result)`. Repeated operands accumulate.
    pub fn precomputed<I>(&mut self, val: f64, partials: I) -> Var
    where
        I: IntoIterator<Item = (Var, f64)>,
    {
        let start = self.operands.len();
        self.operands.extend(partials.into_iter().map(|(v, d)| (v.0, d)));
        let len = self.operands.len() - start;
        self.push(val, Op::Precomputed(start, len))
    }

    // --- Value access ---

    /// Get the primal value of a node.
    #[inline]
    pub fn val(&self, v: Var) -> f64 {
        self.nodes[v.0].val
    }

    /// Wrap an existing node as a [`Real`].
    #[inline]
    pub fn tracked(&self, v: Var) -> Real {
        Real { var: v, val: self.val(v) }
    }

    // --- Elementary operations ---

    /// `a + b`
    #[inline]
    pub fn add(&mut self, a: Var, b: Var) -> Var {
        let val = self.val(a) + self.val(b);
        self.push(val, Op::Add(a.0, b.0))
    }

    /// `a * b`
    #[inline]
    pub fn mul(&mut self, a: Var, b: Var) -> Var {
        let val = self.val(a) * self.val(b);
        self.push(val, Op::Mul(a.0, b.0))
    }

    /// `ln(a)`
    #[inline]
    pub fn ln(&mut self, a: Var) -> Var {
        let val = self.val(a).ln();
        self.push(val, Op::Ln(a.0))
    }

    /// `exp(a)`
    #[inline]
    pub fn exp(&mut self, a: Var) -> Var {
        let val = self.val(a).exp();
        self.push(val, Op::Exp(a.0))
    }

    /// `a * scalar`
    #[inline]
    pub fn mul_f64(&mut self, a: Var, s: f64) -> Var {
        let c = self.constant(s);
        self.mul(a, c)
    }

    /// Sum of `vars` (a constant 0 when empty).
    pub fn sum(&mut self, vars: &[Var]) -> Var {
        let val = vars.iter().map(|&v| self.val(v)).sum();
        self.precomputed(val, vars.iter().map(|&v| (v, 1.0)))
    }

    // --- Backward pass ---

    /// Run reverse-mode AD from output node `out`.
    ///
    /// After calling this, use [`adjoint`](Tape::adjoint) to read ∂out/∂x
    /// for any input `x`.
    pub fn backward(&mut self, out: Var) {
        let n = self.nodes.len();
        self.adjoints.resize(n, 0.0);
        self.adjoints.fill(0.0);
        self.adjoints[out.0] = 1.0;

        for i in (0..n).rev() {
            let adj = self.adjoints[i];
            if adj == 0.0 {
                continue;
            }

            match self.nodes[i].op {
                Op::Input | Op::Const => {}
                Op::Add(a, b) => {
                    self.adjoints[a] += adj;
                    self.adjoints[b] += adj;
                }
                Op::Mul(a, b) => {
                    let va = self.nodes[a].val;
                    let vb = self.nodes[b].val;
                    self.adjoints[a] += adj * vb;
                    self.adjoints[b] += adj * va;
                }
                Op::Ln(a) => {
                    self.adjoints[a] += adj / self.nodes[a].val;
                }
                Op::Exp(a) => {
                    self.adjoints[a] += adj * self.nodes[i].val;
                }
                Op::Precomputed(start, len) => {
                    for &(a, d) in &self.operands[start..start + len] {
                        self.adjoints[a] += adj * d;
                    }
                }
            }
        }
    }

    /// Read ∂output/∂v after calling [`backward`](Tape::backward).
    #[inline]
    pub fn adjoint(&self, v: Var) -> f64 {
        self.adjoints.get(v.0).copied().unwrap_or(0.0)
    }
}
