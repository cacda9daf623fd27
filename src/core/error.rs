//! Error types for RVM training

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RvmError {
    #[error("Invalid algorithm: {0} (expected Figueiredo, Sequential or SequentialInMemory)")]
    InvalidAlgorithm(String),

    #[error("Non-binary input: {0}")]
    NonBinaryInput(String),

    #[error("Numerical breakdown: {0}")]
    NumericalBreakdown(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,
}

pub type Result<T> = std::result::Result<T, RvmError>;
