//! CSR format definition, validated constructor and read-only accessors

use std::fmt;
use std::ops::Range;

use crate::error::{SpmvError, SpmvResult};

/// Entries shown per array by [`CsrPreview`].
pub const PREVIEW_LIMIT: usize = 20;

/// Compressed sparse row matrix.
///
/// Row `r` owns the entries `indptr[r]..indptr[r + 1]` of `indices` and
/// `data`. Fields are private so a built matrix cannot be mutated; share it
/// by reference across workers.
#[derive(Debug, Clone, PartialEq)]
pub struct Csr<T, I> {
    nrows: usize,
    ncols: usize,
    indptr: Vec<I>,
    indices: Vec<I>,
    data: Vec<T>,
}

impl<T, I> Csr<T, I> {
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    #[inline]
    #[must_use]
    pub const fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    #[must_use]
    pub const fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn indptr(&self) -> &[I] {
        &self.indptr
    }

    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[I] {
        &self.indices
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Fraction of cells that are stored.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn density(&self) -> f64 {
        let cells = self.nrows as f64 * self.ncols as f64;
        if cells == 0.0 {
            return 0.0;
        }
        self.nnz() as f64 / cells
    }

    /// Floating point operations of one `A @ x` (one multiply and one add per entry).
    #[inline]
    #[must_use]
    pub fn flops(&self) -> usize {
        2 * self.nnz()
    }

    /// Bytes held by the three CSR arrays.
    #[must_use]
    pub fn storage_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
            + (self.indices.len() + self.indptr.len()) * std::mem::size_of::<I>()
    }

    /// Bytes a dense row-major matrix of the same shape would need.
    #[must_use]
    pub fn dense_bytes(&self) -> usize {
        self.nrows
            .saturating_mul(self.ncols)
            .saturating_mul(std::mem::size_of::<T>())
    }
}

/// Convert a stored i64 index or offset to usize, asserting non-negativity.
#[inline]
#[must_use]
pub fn i64_to_usize(x: i64) -> usize {
    debug_assert!(x >= 0, "value must be non-negative");
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    {
        x as usize
    }
}

impl Csr<f64, i64> {
    /// Build from raw arrays, validating every invariant.
    ///
    /// `indptr` must hold `nrows + 1` non-decreasing offsets from 0 to nnz,
    /// and column indices must be in bounds and strictly increasing within
    /// each row. A matrix returned here is safe to hand to any kernel.
    pub fn from_parts(
        nrows: usize,
        ncols: usize,
        indptr: Vec<i64>,
        indices: Vec<i64>,
        data: Vec<f64>,
    ) -> SpmvResult<Self> {
        if indptr.len() != nrows + 1 {
            return Err(SpmvError::structure("indptr length must be nrows + 1"));
        }
        if indices.len() != data.len() {
            return Err(SpmvError::structure("indices and data must have equal length"));
        }
        let nnz = indices.len();
        if indptr.first().copied().unwrap_or(0) != 0 {
            return Err(SpmvError::structure("indptr first element must be 0"));
        }
        if usize::try_from(indptr.last().copied().unwrap_or(0)).ok() != Some(nnz) {
            return Err(SpmvError::structure("indptr last element must equal nnz"));
        }
        // Starting at 0 and never decreasing keeps every offset in 0..=nnz.
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(SpmvError::structure("indptr must be non-decreasing"));
        }
        for w in indptr.windows(2) {
            let mut prev_col = -1i64;
            for &j in &indices[i64_to_usize(w[0])..i64_to_usize(w[1])] {
                if j < 0 || i64_to_usize(j) >= ncols {
                    return Err(SpmvError::structure("column index out of bounds"));
                }
                if j <= prev_col {
                    return Err(SpmvError::structure(
                        "column indices must be strictly increasing within each row",
                    ));
                }
                prev_col = j;
            }
        }
        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        })
    }

    #[inline]
    #[must_use]
    pub(crate) const fn from_parts_unchecked(
        nrows: usize,
        ncols: usize,
        indptr: Vec<i64>,
        indices: Vec<i64>,
        data: Vec<f64>,
    ) -> Self {
        Self {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        }
    }

    /// Entry range of row `r` in `indices`/`data`.
    #[inline]
    #[must_use]
    pub fn row_range(&self, r: usize) -> Range<usize> {
        i64_to_usize(self.indptr[r])..i64_to_usize(self.indptr[r + 1])
    }

    /// Column indices and values of row `r`.
    #[inline]
    #[must_use]
    pub fn row(&self, r: usize) -> (&[i64], &[f64]) {
        let range = self.row_range(r);
        (&self.indices[range.clone()], &self.data[range])
    }

    /// Stored entries in rows `rows.start..rows.end`.
    #[inline]
    #[must_use]
    pub fn nnz_in_rows(&self, rows: Range<usize>) -> usize {
        if rows.is_empty() {
            return 0;
        }
        i64_to_usize(self.indptr[rows.end]) - i64_to_usize(self.indptr[rows.start])
    }

    /// Dense row-major copy. Intended for small matrices in tests and previews.
    #[must_use]
    pub fn to_dense(&self) -> Vec<f64> {
        let mut out = vec![0.0f64; self.nrows * self.ncols];
        for r in 0..self.nrows {
            let (cols, vals) = self.row(r);
            for (&j, &v) in cols.iter().zip(vals) {
                out[r * self.ncols + i64_to_usize(j)] = v;
            }
        }
        out
    }

    /// Bracketed-list rendering of the three arrays, truncated to
    /// [`PREVIEW_LIMIT`] entries each.
    #[must_use]
    pub const fn preview(&self) -> CsrPreview<'_> {
        CsrPreview { csr: self }
    }
}

pub struct CsrPreview<'a> {
    csr: &'a Csr<f64, i64>,
}

fn write_list<V>(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    items: &[V],
    each: impl Fn(&mut fmt::Formatter<'_>, &V) -> fmt::Result,
) -> fmt::Result {
    write!(f, "{label:<13}[")?;
    for (k, item) in items.iter().take(PREVIEW_LIMIT).enumerate() {
        if k > 0 {
            f.write_str(", ")?;
        }
        each(f, item)?;
    }
    if items.len() > PREVIEW_LIMIT {
        f.write_str(", ...")?;
    }
    writeln!(f, "]")
}

impl fmt::Display for CsrPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, "values:", self.csr.data(), |f, v| write!(f, "{v:.1}"))?;
        write_list(f, "col_indices:", self.csr.indices(), |f, j| write!(f, "{j}"))?;
        write_list(f, "row_ptr:", self.csr.indptr(), |f, p| write!(f, "{p}"))
    }
}
