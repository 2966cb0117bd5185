//! Error types for the quantized engine.
//!
//! Core operations (linear algebra, layers, brains, populations) return
//! [`BrainError`]. I/O boundaries (model store, dataset readers, settings)
//! use `anyhow` and wrap these where needed.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, BrainError>;

/// Errors raised by the quantized engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrainError {
    /// A vector length matches neither dimension a consumer expects.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: String,
        actual: usize,
        context: String,
    },

    /// A best entry was requested from an empty population.
    #[error("population is empty")]
    EmptyPopulation,

    /// An input kind that no predictor in the pipeline can handle.
    #[error("unsupported element type: {0}")]
    UnsupportedElementType(String),

    /// A configuration value outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BrainError {
    pub(crate) fn shape(context: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        BrainError::ShapeMismatch {
            expected: expected.into(),
            actual,
            context: context.into(),
        }
    }
}
