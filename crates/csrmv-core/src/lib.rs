//! Core data structures for csrmv: the CSR store, its random builder and
//! the shared error type.

pub mod builder;
pub mod csr;
pub mod error;

pub use builder::{build_matrix, build_matrix_with_rng, default_rng, DEFAULT_SEED, VALUE_SCALE};
pub use csr::{i64_to_usize, Csr, CsrPreview, PREVIEW_LIMIT};
pub use error::{SpmvError, SpmvResult};
