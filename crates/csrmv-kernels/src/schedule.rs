//! Parallel SpMV with static and dynamic row scheduling.
//!
//! Both kernels build a fresh pool of exactly `threads` workers for the call
//! and join every worker thread before returning. Rows are owned by exactly one worker, so `y`
//! is never locked: the static kernel hands each worker a contiguous slice up
//! front, and the dynamic kernel lets workers claim chunks of rows from an
//! atomic cursor, which is the only synchronised state in either kernel.

use crate::config::{CHUNKS_PER_THREAD, MAX_CHUNK_ROWS, MIN_CHUNK_ROWS};
use crate::spmv::{check_dims, fill_rows, spmv_sequential};
use crate::util::{partition_rows, RowSink};
use csrmv_core::{Csr, SpmvError, SpmvResult};
use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, Range};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use thread_local::ThreadLocal;

/// Rows per dynamic chunk: about [`CHUNKS_PER_THREAD`] chunks per worker,
/// clamped to `[MIN_CHUNK_ROWS, MAX_CHUNK_ROWS]`.
#[inline]
#[must_use]
pub fn dynamic_chunk_size(nrows: usize, threads: usize) -> usize {
    let per_round = threads.max(1).saturating_mul(CHUNKS_PER_THREAD);
    (nrows / per_round).clamp(MIN_CHUNK_ROWS, MAX_CHUNK_ROWS)
}

/// Rayon pool owned by a single kernel call.
///
/// Dropping a `rayon::ThreadPool` only tells its workers to stop, so the
/// threads are spawned here and joined when the pool goes away.
struct WorkerPool {
    // Declared first so it drops first and releases the workers being joined.
    pool: rayon::ThreadPool,
    workers: JoinOnDrop,
}

struct JoinOnDrop(Vec<JoinHandle<()>>);

impl Drop for JoinOnDrop {
    fn drop(&mut self) {
        for worker in self.0.drain(..) {
            let _ = worker.join();
        }
    }
}

impl WorkerPool {
    fn new(threads: usize) -> SpmvResult<Self> {
        if threads == 0 {
            return Err(SpmvError::InvalidThreadCount);
        }
        let mut handles = Vec::with_capacity(threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("csrmv-worker-{i}"))
            .spawn_handler(|worker| {
                let mut builder = std::thread::Builder::new();
                if let Some(name) = worker.name() {
                    builder = builder.name(name.to_owned());
                }
                if let Some(size) = worker.stack_size() {
                    builder = builder.stack_size(size);
                }
                handles.push(builder.spawn(move || worker.run())?);
                Ok(())
            })
            .build()
            .map_err(|e| SpmvError::ThreadPool(e.to_string()))?;
        Ok(Self {
            pool,
            workers: JoinOnDrop(handles),
        })
    }

    #[cfg(test)]
    fn num_workers(&self) -> usize {
        self.workers.0.len()
    }
}

impl Deref for WorkerPool {
    type Target = rayon::ThreadPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

/// y = A @ x with rows split into `threads` contiguous, near-equal ranges.
///
/// Ranges are sized by row count, not by nnz, so a matrix whose heavy rows
/// cluster together leaves one worker with most of the work.
#[tracing::instrument(skip(a, x), fields(nrows = a.nrows(), nnz = a.nnz()))]
pub fn spmv_static(a: &Csr<f64, i64>, x: &[f64], threads: usize) -> SpmvResult<Vec<f64>> {
    check_dims(a, x)?;
    let pool = WorkerPool::new(threads)?;
    let ranges = partition_rows(a.nrows(), threads);
    log_static_balance(a, &ranges);

    let mut y = vec![0.0f64; a.nrows()];
    pool.scope(|s| {
        let mut rest: &mut [f64] = &mut y;
        for rows in ranges {
            let (mine, tail) = std::mem::take(&mut rest).split_at_mut(rows.len());
            rest = tail;
            s.spawn(move |_| fill_rows(a, x, rows, mine));
        }
    });
    Ok(y)
}

#[allow(clippy::cast_precision_loss)]
fn log_static_balance(a: &Csr<f64, i64>, ranges: &[Range<usize>]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let loads: Vec<usize> = ranges.iter().map(|r| a.nnz_in_rows(r.clone())).collect();
    let max = loads.iter().copied().max().unwrap_or(0);
    let mean = a.nnz() as f64 / ranges.len().max(1) as f64;
    let imbalance = if mean > 0.0 { max as f64 / mean } else { 1.0 };
    tracing::debug!(?loads, imbalance, "static partition nnz per worker");
}

/// Shared work pool of the dynamic kernel.
///
/// Chunk `i` covers rows `i * chunk .. min((i + 1) * chunk, nrows)`. Each
/// call to [`claim`](Self::claim) takes the next index with one atomic
/// increment, so every chunk is handed out exactly once.
#[derive(Debug)]
pub struct ChunkCursor {
    next: AtomicUsize,
    nrows: usize,
    chunk: usize,
}

impl ChunkCursor {
    #[must_use]
    pub fn new(nrows: usize, chunk: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            nrows,
            chunk: chunk.max(1),
        }
    }

    /// Next unclaimed row range, or `None` once every chunk is out.
    pub fn claim(&self) -> Option<Range<usize>> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        let start = idx.checked_mul(self.chunk)?;
        if start >= self.nrows {
            return None;
        }
        Some(start..(start + self.chunk).min(self.nrows))
    }

    #[inline]
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk
    }

    #[inline]
    #[must_use]
    pub const fn num_chunks(&self) -> usize {
        self.nrows.div_ceil(self.chunk)
    }
}

/// Work done by one worker thread during a dynamic call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerLoad {
    pub chunks: usize,
    pub rows: usize,
    pub nnz: usize,
}

/// Scheduling record of one dynamic call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicStats {
    pub chunk_size: usize,
    pub num_chunks: usize,
    /// One entry per worker thread that ran, in no particular order.
    pub workers: Vec<WorkerLoad>,
}

impl DynamicStats {
    #[must_use]
    pub fn chunks_claimed(&self) -> usize {
        self.workers.iter().map(|w| w.chunks).sum()
    }

    #[must_use]
    pub fn rows_processed(&self) -> usize {
        self.workers.iter().map(|w| w.rows).sum()
    }
}

/// y = A @ x with chunks of rows claimed at runtime by idle workers.
pub fn spmv_dynamic(a: &Csr<f64, i64>, x: &[f64], threads: usize) -> SpmvResult<Vec<f64>> {
    spmv_dynamic_with_stats(a, x, threads).map(|(y, _)| y)
}

/// [`spmv_dynamic`], also returning how the chunks were spread over workers.
#[tracing::instrument(skip(a, x), fields(nrows = a.nrows(), nnz = a.nnz()))]
pub fn spmv_dynamic_with_stats(
    a: &Csr<f64, i64>,
    x: &[f64],
    threads: usize,
) -> SpmvResult<(Vec<f64>, DynamicStats)> {
    check_dims(a, x)?;
    let pool = WorkerPool::new(threads)?;
    let nrows = a.nrows();
    let cursor = ChunkCursor::new(nrows, dynamic_chunk_size(nrows, threads));
    tracing::debug!(
        chunk = cursor.chunk_size(),
        chunks = cursor.num_chunks(),
        "dynamic schedule"
    );

    let mut y = vec![0.0f64; nrows];
    let tls: ThreadLocal<RefCell<WorkerLoad>> = ThreadLocal::new();
    {
        let sink = RowSink::new(&mut y);
        let (sink, tls, cursor) = (&sink, &tls, &cursor);
        pool.scope(|s| {
            for _ in 0..threads {
                s.spawn(move |_| {
                    let cell = tls.get_or(|| RefCell::new(WorkerLoad::default()));
                    let mut load = cell.borrow_mut();
                    while let Some(rows) = cursor.claim() {
                        // SAFETY: the cursor yields each chunk once and chunks do not overlap.
                        let out = unsafe { sink.rows_mut(rows.clone()) };
                        load.chunks += 1;
                        load.rows += rows.len();
                        load.nnz += a.nnz_in_rows(rows.clone());
                        fill_rows(a, x, rows, out);
                    }
                });
            }
        });
    }

    let stats = DynamicStats {
        chunk_size: cursor.chunk_size(),
        num_chunks: cursor.num_chunks(),
        workers: tls.into_iter().map(RefCell::into_inner).collect(),
    };
    tracing::debug!(workers = ?stats.workers, "dynamic loads");
    Ok((y, stats))
}

/// Row scheduling strategy, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schedule {
    Sequential,
    Static,
    Dynamic,
}

impl Schedule {
    pub const ALL: [Self; 3] = [Self::Sequential, Self::Static, Self::Dynamic];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Schedule {
    type Err = SpmvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Self::Sequential),
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            _ => Err(SpmvError::UnknownSchedule(s.to_owned())),
        }
    }
}

/// y = A @ x using `schedule`. `threads` is ignored for [`Schedule::Sequential`].
pub fn spmv(
    a: &Csr<f64, i64>,
    x: &[f64],
    schedule: Schedule,
    threads: usize,
) -> SpmvResult<Vec<f64>> {
    match schedule {
        Schedule::Sequential => spmv_sequential(a, x),
        Schedule::Static => spmv_static(a, x, threads),
        Schedule::Dynamic => spmv_dynamic(a, x, threads),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_hands_out_every_chunk_once() {
        let cursor = ChunkCursor::new(25, 10);
        assert_eq!(cursor.num_chunks(), 3);
        assert_eq!(cursor.claim(), Some(0..10));
        assert_eq!(cursor.claim(), Some(10..20));
        assert_eq!(cursor.claim(), Some(20..25));
        assert_eq!(cursor.claim(), None);
        assert_eq!(cursor.claim(), None);
    }

    #[test]
    fn cursor_on_empty_matrix_is_exhausted() {
        let cursor = ChunkCursor::new(0, 10);
        assert_eq!(cursor.num_chunks(), 0);
        assert_eq!(cursor.claim(), None);
    }

    #[test]
    fn chunk_size_targets_hundred_chunks_per_thread() {
        assert_eq!(dynamic_chunk_size(50_000, 2), 250);
        assert_eq!(dynamic_chunk_size(50_000, 8), 62);
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(SpmvError::InvalidThreadCount)));
    }

    #[test]
    fn pool_owns_one_handle_per_worker() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(pool.num_workers(), 3);
        assert_eq!(pool.current_num_threads(), 3);
        let names = std::sync::Mutex::new(Vec::new());
        pool.scope(|s| {
            for _ in 0..3 {
                s.spawn(|_| {
                    let name = std::thread::current().name().map(str::to_owned);
                    names.lock().unwrap().push(name);
                });
            }
        });
        drop(pool);
        let names = names.into_inner().unwrap();
        assert_eq!(names.len(), 3);
        assert!(names
            .iter()
            .all(|n| n.as_deref().is_some_and(|n| n.starts_with("csrmv-worker-"))));
    }

    #[test]
    fn schedule_names_round_trip() {
        for s in Schedule::ALL {
            assert_eq!(s.to_string().parse::<Schedule>().unwrap(), s);
        }
        assert_eq!(" Dynamic ".parse::<Schedule>().unwrap(), Schedule::Dynamic);
        assert!(matches!(
            "guided".parse::<Schedule>(),
            Err(SpmvError::UnknownSchedule(_))
        ));
    }
}
