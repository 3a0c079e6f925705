//! Row kernel and the sequential reference SpMV.
//!
//! Every strategy evaluates a row with [`row_dot`], accumulating in
//! ascending entry order, so parallel results match the sequential ones bit
//! for bit regardless of how rows are distributed.

use csrmv_core::{i64_to_usize, Csr, SpmvError, SpmvResult};
use std::ops::Range;

/// `sum(data[k] * x[indices[k]])` over row `r`, in ascending `k`.
#[inline]
#[must_use]
pub fn row_dot(a: &Csr<f64, i64>, x: &[f64], r: usize) -> f64 {
    let (cols, vals) = a.row(r);
    let mut sum = 0.0f64;
    for (&j, &v) in cols.iter().zip(vals) {
        sum += v * x[i64_to_usize(j)];
    }
    sum
}

/// Evaluate `rows` into `out`, where `out[0]` is row `rows.start`.
#[inline]
pub(crate) fn fill_rows(a: &Csr<f64, i64>, x: &[f64], rows: Range<usize>, out: &mut [f64]) {
    debug_assert_eq!(rows.len(), out.len());
    for (yi, r) in out.iter_mut().zip(rows) {
        *yi = row_dot(a, x, r);
    }
}

pub(crate) fn check_dims(a: &Csr<f64, i64>, x: &[f64]) -> SpmvResult<()> {
    if x.len() != a.ncols() {
        return Err(SpmvError::DimensionMismatch {
            nrows: a.nrows(),
            ncols: a.ncols(),
            len: x.len(),
        });
    }
    Ok(())
}

/// y = A @ x, one row after another on the calling thread.
#[tracing::instrument(skip_all, fields(nrows = a.nrows(), nnz = a.nnz()))]
pub fn spmv_sequential(a: &Csr<f64, i64>, x: &[f64]) -> SpmvResult<Vec<f64>> {
    check_dims(a, x)?;
    let nrows = a.nrows();
    let mut y = vec![0.0f64; nrows];
    fill_rows(a, x, 0..nrows, &mut y);
    Ok(y)
}
