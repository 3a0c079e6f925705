//! Error type shared by the store, the builder and the kernels.
//!
//! Every variant is a contract violation or resource failure: the caller
//! passed something the operation cannot work with, or storage could not be
//! reserved. A numerical disagreement between two result vectors is not an
//! error; the verifier reports it as a value.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpmvError {
    #[error("density must lie in [0, 1], got {density}")]
    InvalidDensity { density: f64 },

    #[error("matrix shape must be non-empty, got {nrows}x{ncols}")]
    EmptyShape { nrows: usize, ncols: usize },

    #[error("x length must equal ncols: matrix is {nrows}x{ncols}, x has {len} entries")]
    DimensionMismatch { nrows: usize, ncols: usize, len: usize },

    #[error("vectors must have equal length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("thread count must be at least 1")]
    InvalidThreadCount,

    #[error("invalid CSR structure: {0}")]
    InvalidStructure(String),

    #[error("could not reserve storage for {requested} entries")]
    Allocation { requested: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("unknown schedule {0:?}, expected one of sequential, static, dynamic")]
    UnknownSchedule(String),
}

pub type SpmvResult<T> = Result<T, SpmvError>;

impl SpmvError {
    pub(crate) fn structure(msg: &str) -> Self {
        Self::InvalidStructure(msg.to_owned())
    }
}
