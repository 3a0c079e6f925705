//! Row partitioning and the disjoint output sink used by the parallel
//! kernels.

use std::marker::PhantomData;
use std::ops::Range;

/// Split `0..nrows` into `parts` contiguous ranges whose lengths differ by
/// at most one. The first `nrows % parts` ranges carry the extra row.
/// Ranges may be empty when `parts > nrows`.
#[must_use]
pub fn partition_rows(nrows: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let base = nrows / parts;
    let extra = nrows % parts;
    let mut out = Vec::with_capacity(parts);
    let mut start = 0usize;
    for p in 0..parts {
        let len = base + usize::from(p < extra);
        out.push(start..start + len);
        start += len;
    }
    debug_assert_eq!(start, nrows);
    out
}

/// Output vector shared by workers that each write their own row ranges.
///
/// Handing out ranges is the caller's job; the sink only checks bounds.
pub(crate) struct RowSink<'a> {
    ptr: *mut f64,
    len: usize,
    _marker: PhantomData<&'a mut [f64]>,
}

// SAFETY: the sink is only reachable through `rows_mut`, whose contract
// forbids overlapping ranges, so concurrent use never aliases a slot.
unsafe impl Send for RowSink<'_> {}
unsafe impl Sync for RowSink<'_> {}

impl<'a> RowSink<'a> {
    pub(crate) fn new(y: &'a mut [f64]) -> Self {
        Self {
            ptr: y.as_mut_ptr(),
            len: y.len(),
            _marker: PhantomData,
        }
    }

    /// Mutable view of `rows`.
    ///
    /// # Safety
    ///
    /// Each row may be covered by at most one live slice returned from this
    /// sink.
    #[allow(
        clippy::mut_from_ref,
        reason = "Disjointness of the returned ranges is the caller's contract"
    )]
    pub(crate) unsafe fn rows_mut(&self, rows: Range<usize>) -> &mut [f64] {
        assert!(
            rows.start <= rows.end && rows.end <= self.len,
            "row range {rows:?} outside output of length {}",
            self.len
        );
        std::slice::from_raw_parts_mut(self.ptr.add(rows.start), rows.end - rows.start)
    }
}
