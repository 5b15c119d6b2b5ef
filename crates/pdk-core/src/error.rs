//! Error types for density kernels

use thiserror::Error;

/// Kernel error type
#[derive(Error, Debug)]
pub enum Error {
    /// Argument outside its valid domain
    #[error("{function}: {argument} must be {condition}, got {value}")]
    Domain {
        /// Function that rejected the argument
        function: &'static str,
        /// Offending argument
        argument: &'static str,
        /// Violated condition, e.g. "finite and > 0"
        condition: &'static str,
        /// Offending value
        value: f64,
    },

    /// Broadcast length conflict between arguments
    #[error("{function}: {argument} has size {size}, expected 1 or {expected}")]
    SizeMismatch {
        /// Function that reconciled the sizes
        function: &'static str,
        /// Argument whose length disagrees
        argument: &'static str,
        /// Its length
        size: usize,
        /// Reconciled (maximum) length
        expected: usize,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::Domain`].
    pub fn domain(
        function: &'static str,
        argument: &'static str,
        condition: &'static str,
        value: f64,
    ) -> Self {
        Self::Domain { function, argument, condition, value }
    }

    /// Argument named by a domain or size error.
    pub fn argument(&self) -> Option<&'static str> {
        match self {
            Self::Domain { argument, .. } | Self::SizeMismatch { argument, .. } => Some(*argument),
            Self::Json(_) => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
