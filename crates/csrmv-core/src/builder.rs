//! Reproducible random CSR construction.
//!
//! Cells are visited row-major. Each cell is kept with probability `density`
//! and, when kept, receives a value drawn uniformly from `[0, VALUE_SCALE)`.
//! Because columns are visited in ascending order within a row, the emitted
//! column indices are already sorted and no post-pass is needed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::csr::Csr;
use crate::error::{SpmvError, SpmvResult};

/// Seed used by [`build_matrix`].
pub const DEFAULT_SEED: u64 = 42;
/// Upper bound (exclusive) of generated values.
pub const VALUE_SCALE: f64 = 10.0;

/// Generator used by [`build_matrix`], seeded with [`DEFAULT_SEED`].
#[must_use]
pub fn default_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(DEFAULT_SEED)
}

/// Build a random `nrows x ncols` matrix with the fixed default seed.
pub fn build_matrix(nrows: usize, ncols: usize, density: f64) -> SpmvResult<Csr<f64, i64>> {
    build_matrix_with_rng(nrows, ncols, density, &mut default_rng())
}

/// Build a random `nrows x ncols` matrix drawing from `rng`.
///
/// Two draws are taken per kept cell (inclusion, then value) and one per
/// skipped cell, so the matrix depends only on the stream and the shape.
#[tracing::instrument(skip(rng), level = "debug")]
pub fn build_matrix_with_rng<R: Rng>(
    nrows: usize,
    ncols: usize,
    density: f64,
    rng: &mut R,
) -> SpmvResult<Csr<f64, i64>> {
    if !(0.0..=1.0).contains(&density) {
        return Err(SpmvError::InvalidDensity { density });
    }
    if nrows == 0 || ncols == 0 {
        return Err(SpmvError::EmptyShape { nrows, ncols });
    }
    if i64::try_from(nrows.saturating_mul(ncols)).is_err() {
        return Err(SpmvError::Allocation {
            requested: nrows.saturating_mul(ncols),
        });
    }

    let estimate = estimated_nnz(nrows, ncols, density);
    let mut indices: Vec<i64> = Vec::new();
    let mut data: Vec<f64> = Vec::new();
    reserve(&mut indices, estimate)?;
    reserve(&mut data, estimate)?;
    let mut indptr: Vec<i64> = Vec::new();
    reserve(&mut indptr, nrows + 1)?;

    indptr.push(0);
    for _ in 0..nrows {
        for j in 0..ncols {
            let keep: f64 = rng.gen();
            if keep < density {
                let v: f64 = rng.gen();
                data.push(v * VALUE_SCALE);
                indices.push(usize_to_i64(j));
            }
        }
        indptr.push(usize_to_i64(data.len()));
    }

    if data.len() > estimate {
        tracing::trace!(estimate, nnz = data.len(), "nnz estimate exceeded, buffers grew");
    }
    indices.shrink_to_fit();
    data.shrink_to_fit();
    tracing::debug!(nrows, ncols, nnz = data.len(), "built random CSR matrix");
    Ok(Csr::from_parts_unchecked(nrows, ncols, indptr, indices, data))
}

/// `nrows * ncols * density`, used only as a capacity hint.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]
fn estimated_nnz(nrows: usize, ncols: usize, density: f64) -> usize {
    (nrows as f64 * ncols as f64 * density) as usize
}

fn reserve<T>(buf: &mut Vec<T>, additional: usize) -> SpmvResult<()> {
    buf.try_reserve_exact(additional)
        .map_err(|_| SpmvError::Allocation {
            requested: additional,
        })
}

#[inline]
fn usize_to_i64(x: usize) -> i64 {
    debug_assert!(i64::try_from(x).is_ok(), "value must fit in i64");
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    {
        x as i64
    }
}
