//! Element-wise comparison of two result vectors within an absolute tolerance

use crate::config::MAX_REPORTED_MISMATCHES;
use csrmv_core::{SpmvError, SpmvResult};
use wide::{f64x4, CmpEq, CmpLe};

/// One slot where the two vectors disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub index: usize,
    pub expected: f64,
    pub actual: f64,
}

/// Outcome of [`verify`]. A failed comparison is reported here, never as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub passed: bool,
    pub mismatch_count: usize,
    /// The first [`MAX_REPORTED_MISMATCHES`] mismatches, in index order.
    pub first_mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    /// `(passed, mismatch_count)`
    #[inline]
    #[must_use]
    pub const fn summary(&self) -> (bool, usize) {
        (self.passed, self.mismatch_count)
    }
}

/// Equal values (including matching infinities) never differ; NaN always does.
#[inline]
#[allow(clippy::neg_cmp_op_on_partial_ord, reason = "NaN must fail the comparison")]
fn differs(a: f64, b: f64, tolerance: f64) -> bool {
    a != b && !((a - b).abs() <= tolerance)
}

/// One pass over both vectors: the mismatch count plus the first
/// [`MAX_REPORTED_MISMATCHES`] mismatching slots.
fn scan(expected: &[f64], actual: &[f64], tolerance: f64) -> (usize, Vec<Mismatch>) {
    let mut count = 0usize;
    let mut first = Vec::new();
    let mut record = |index: usize| {
        count += 1;
        if first.len() < MAX_REPORTED_MISMATCHES {
            first.push(Mismatch {
                index,
                expected: expected[index],
                actual: actual[index],
            });
        }
    };

    let tol = f64x4::splat(tolerance);
    let lanes_e = expected.chunks_exact(4);
    let lanes_a = actual.chunks_exact(4);
    let tail = lanes_e.len() * 4;
    for (c, (e, a)) in lanes_e.zip(lanes_a).enumerate() {
        let ve = f64x4::from([e[0], e[1], e[2], e[3]]);
        let va = f64x4::from([a[0], a[1], a[2], a[3]]);
        let close = (ve - va).abs().cmp_le(tol) | ve.cmp_eq(va);
        let bad = !close.move_mask() & 0b1111;
        if bad == 0 {
            continue;
        }
        for k in (0..4usize).filter(|&k| bad & (1 << k) != 0) {
            record(c * 4 + k);
        }
    }
    for i in tail..expected.len() {
        if differs(expected[i], actual[i], tolerance) {
            record(i);
        }
    }
    (count, first)
}

/// Compare `actual` against `expected` slot by slot.
///
/// A slot mismatches when `|expected - actual| > tolerance` or when either
/// side is NaN, so a NaN in the output never passes. The first few
/// mismatches are kept in the report and logged at `warn`.
pub fn verify(expected: &[f64], actual: &[f64], tolerance: f64) -> SpmvResult<VerifyReport> {
    if expected.len() != actual.len() {
        return Err(SpmvError::LengthMismatch {
            left: expected.len(),
            right: actual.len(),
        });
    }
    let (mismatch_count, first_mismatches) = scan(expected, actual, tolerance);

    for m in &first_mismatches {
        tracing::warn!(index = m.index, expected = m.expected, actual = m.actual, "result mismatch");
    }
    if mismatch_count > first_mismatches.len() {
        tracing::warn!(
            remaining = mismatch_count - first_mismatches.len(),
            "further mismatches not listed"
        );
    }

    Ok(VerifyReport {
        passed: mismatch_count == 0,
        mismatch_count,
        first_mismatches,
    })
}
