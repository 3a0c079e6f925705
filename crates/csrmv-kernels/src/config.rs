//! Tuning constants and worker-count defaults

/// Target number of dynamic chunks handed to each worker.
pub const CHUNKS_PER_THREAD: usize = 100;
/// Smallest dynamic chunk, in rows.
pub const MIN_CHUNK_ROWS: usize = 10;
/// Largest dynamic chunk, in rows.
pub const MAX_CHUNK_ROWS: usize = 1000;

/// Absolute tolerance used when comparing kernel outputs.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;
/// Mismatches kept (and logged) by the verifier.
pub const MAX_REPORTED_MISMATCHES: usize = 5;

/// Environment variable that overrides the default worker count.
pub const THREADS_ENV: &str = "RAYON_NUM_THREADS";

/// Worker count used when the caller has no preference.
///
/// A positive integer in `RAYON_NUM_THREADS` wins; otherwise the hardware
/// concurrency, or 1 if it cannot be detected. No thread pool is started.
#[must_use]
pub fn available_threads() -> usize {
    threads_from_env(std::env::var(THREADS_ENV).ok().as_deref()).unwrap_or_else(|| {
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    })
}

fn threads_from_env(value: Option<&str>) -> Option<usize> {
    value?.trim().parse::<usize>().ok().filter(|&n| n > 0)
}
