//! Partial derivative accumulation for density kernels.
//!
//! A kernel with `K` parameter arguments builds a [`Partials<K>`] holding one
//! [`Edge`] per *differentiable* argument (constant arguments get `None` and
//! allocate nothing). In its per-element loop it adds the closed-form partial
//! of element `i` into the edge buffer, then consumes the accumulator with
//! [`Partials::build`] into a [`LogDensity`].
//!
//! ```
//! use pdk_ad::Tape;
//! use pdk_prob::partials::{Edge, Partials};
//!
//! let mut tape = Tape::new();
//! let x = tape.real(3.0);
//!
//! // f(x, c) = c * x^2 with constant c = 0.5
//! let mut ops = Partials::new([Edge::of("x", &x, 1), Edge::of("c", &0.5f64, 1)]);
//! ops.add(0, 0, 0.5 * 2.0 * 3.0);
//! let lp = ops.build(0.5 * 9.0);
//!
//! let f = lp.record(&mut tape);
//! tape.backward(f.var());
//! assert_eq!(tape.adjoint(x.var()), 3.0);
//! ```

use pdk_ad::{Real, Scalar, Tape, Var};
use pdk_core::{EdgePartials, Evaluation};

use crate::argument::Argument;

/// Derivative buffer of one differentiable argument.
#[derive(Debug, Clone)]
pub struct Edge {
    name: &'static str,
    /// Tape nodes of the source, one per source element (1 or `N`).
    nodes: Vec<Var>,
    /// One entry per output element.
    partials: Vec<f64>,
}

impl Edge {
    /// Edge for `source` broadcast to `size` output elements.
    ///
    /// Returns `None` without allocating when `source` is constant.
    pub fn of<A: Argument + ?Sized>(name: &'static str, source: &A, size: usize) -> Option<Self> {
        if !source.is_differentiable() {
            return None;
        }
        let nodes = (0..source.size()).filter_map(|i| source.at(i).node()).collect();
        Some(Self { name, nodes, partials: vec![0.0; size] })
    }

    /// Argument name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Accumulated partials, one per output element.
    pub fn partials(&self) -> &[f64] {
        &self.partials
    }

    /// Sum of all partials (the derivative for a broadcast scalar source).
    pub fn total(&self) -> f64 {
        self.partials.iter().sum()
    }

    /// `(source node, partial)` pairs to register on a tape.
    ///
    /// A scalar source broadcast over the output yields a single pair carrying
    /// the summed partial.
    pub fn terms(&self) -> Vec<(Var, f64)> {
        if let [node] = self.nodes.as_slice() {
            return vec![(*node, self.total())];
        }
        self.nodes.iter().copied().zip(self.partials.iter().copied()).collect()
    }
}

/// Accumulator for `K` parameter arguments.
#[derive(Debug)]
pub struct Partials<const K: usize> {
    edges: [Option<Edge>; K],
}

impl<const K: usize> Partials<K> {
    /// Build from per-argument edges, see [`Edge::of`].
    pub fn new(edges: [Option<Edge>; K]) -> Self {
        Self { edges }
    }

    /// Add `d` into element `i` of edge `k`; a no-op for constant arguments.
    #[inline]
    pub fn add(&mut self, k: usize, i: usize, d: f64) {
        if let Some(edge) = &mut self.edges[k] {
            edge.partials[i] += d;
        }
    }

    /// Finalize with the kernel's value.
    pub fn build(self, value: f64) -> LogDensity {
        let edges: Vec<Edge> = self.edges.into_iter().flatten().collect();
        if edges.is_empty() {
            LogDensity::Value(value)
        } else {
            LogDensity::Gradient { value, edges }
        }
    }
}

/// Result of a density kernel.
#[derive(Debug, Clone)]
pub enum LogDensity {
    /// No argument was differentiable.
    Value(f64),
    /// Value plus filled partial buffers of every differentiable argument.
    Gradient {
        /// Log-density value
        value: f64,
        /// Non-empty, in argument order
        edges: Vec<Edge>,
    },
}

impl LogDensity {
    /// Log-density value.
    pub fn value(&self) -> f64 {
        match self {
            Self::Value(v) | Self::Gradient { value: v, .. } => *v,
        }
    }

    /// Edges of the differentiable arguments (empty for [`LogDensity::Value`]).
    pub fn edges(&self) -> &[Edge] {
        match self {
            Self::Value(_) => &[],
            Self::Gradient { edges, .. } => edges,
        }
    }

    /// Edge of argument `name`, if it was differentiable.
    pub fn edge(&self, name: &str) -> Option<&Edge> {
        self.edges().iter().find(|e| e.name == name)
    }

    /// Whether no argument was differentiable.
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Register the result on `tape`.
    ///
    /// A backward pass through the returned node adds
    /// `partial[i] * adjoint` into the source node of every edge element.
    pub fn record(self, tape: &mut Tape) -> Real {
        let var = match &self {
            Self::Value(v) => tape.constant(*v),
            Self::Gradient { value, edges } => {
                tape.precomputed(*value, edges.iter().flat_map(Edge::terms))
            }
        };
        tape.tracked(var)
    }

    /// Serializable snapshot of the value and partial buffers.
    pub fn evaluation(&self) -> Evaluation {
        Evaluation {
            value: self.value(),
            edges: self
                .edges()
                .iter()
                .map(|e| EdgePartials {
                    argument: e.name.to_string(),
                    partials: e.partials.clone(),
                })
                .collect(),
        }
    }
}
