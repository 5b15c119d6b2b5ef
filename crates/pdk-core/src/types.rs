//! Serializable snapshots of kernel results

use serde::{Deserialize, Serialize};

use crate::Result;

/// Partial derivatives accumulated for one differentiable argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgePartials {
    /// Argument name, as passed to the kernel
    pub argument: String,

    /// One entry per output element
    pub partials: Vec<f64>,
}

impl EdgePartials {
    /// Total derivative with respect to a broadcast (scalar) argument.
    pub fn total(&self) -> f64 {
        self.partials.iter().sum()
    }
}

/// Value of a log-density plus the partials of every differentiable argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Log-density value
    pub value: f64,

    /// Empty when no argument was differentiable
    pub edges: Vec<EdgePartials>,
}

impl Evaluation {
    /// Partials recorded for `argument`, if it was differentiable.
    pub fn partials(&self, argument: &str) -> Option<&[f64]> {
        self.edges.iter().find(|e| e.argument == argument).map(|e| e.partials.as_slice())
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
